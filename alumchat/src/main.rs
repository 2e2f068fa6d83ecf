//! alumchat — headless client for the alumni network messaging endpoint.
//!
//! Connects the messaging core to a live endpoint and drives it from a
//! line-oriented command loop. Useful for exercising the core without the
//! application's UI.
//!
//! ```bash
//! cargo run --bin alumchat -- --endpoint ws://127.0.0.1:9000/ws \
//!     --user-id ada@alum.example
//!
//! # Or via environment variables
//! ALUMCHAT_ENDPOINT=ws://127.0.0.1:9000/ws ALUMCHAT_USER_ID=ada@alum.example cargo run
//! ```
//!
//! Commands: `/select <email>`, `/delete <email>`, `/contacts`,
//! `/image <data>`, `/quit`; any other line is sent as a message to the
//! selected contact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use alumchat::config::{CliArgs, ClientConfig};
use alumchat::presence::PresenceTracker;
use alumchat::roster::Contact;
use alumchat::session::{ChatSession, SessionEvent};
use alumchat::store::backend::JsonFileStorage;
use alumchat::transport::Channel;
use alumchat::transport::socket::SocketChannel;
use alumchat_proto::event::{UserProfile, WireEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("alumchat starting");

    let Some(endpoint) = config.endpoint.clone() else {
        eprintln!("No endpoint configured; pass --endpoint or set ALUMCHAT_ENDPOINT");
        return Ok(());
    };
    let Some(user_id) = config.user_id.clone() else {
        eprintln!("No identity configured; pass --user-id or set ALUMCHAT_USER_ID");
        return Ok(());
    };

    let storage = Arc::new(JsonFileStorage::open(data_dir(&config))?);
    let channel = Arc::new(SocketChannel::new(&endpoint, config.reconnect_delay)?);
    channel.connect(&user_id);

    let presence = Arc::new(PresenceTracker::with_quiet_period(
        config.typing_quiet_period,
    ));

    let me = UserProfile {
        email: user_id,
        first_name: config.first_name.clone(),
        last_name: config.last_name.clone(),
        avatar: config.avatar.clone(),
    };

    let (mut session, mut session_events) = ChatSession::new(
        Arc::clone(&channel),
        storage,
        Arc::clone(&presence),
        me,
        config.event_buffer,
    );
    session = session.with_typing_quiet_period(config.typing_quiet_period);

    // Forward inbound events from the reader task into the command loop.
    let (wire_tx, mut wire_rx) = mpsc::channel::<WireEvent>(256);
    let _wire_sub = channel.subscribe(Arc::new(move |event| {
        let _ = wire_tx.try_send(event.clone());
    }));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    println!("alumchat ready; type /help for commands");
    loop {
        tokio::select! {
            Some(event) = wire_rx.recv() => {
                if let WireEvent::Message(ref message) = event {
                    println!("[{}] {}", message.sender.email, message.text);
                }
                session.handle_event(&event);
            }
            Some(event) = session_events.recv() => {
                if event == SessionEvent::SelectionCleared {
                    println!("(conversation closed)");
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&mut session, line.trim()).await {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            _ = tick.tick() => {
                session.tick().await;
            }
        }
    }

    channel.disconnect().await;
    presence.reset();
    tracing::info!("alumchat exiting");
    Ok(())
}

/// Handles one input line; returns `false` to exit the loop.
async fn handle_line<C, S>(session: &mut ChatSession<C, S>, line: &str) -> bool
where
    C: Channel,
    S: alumchat::store::backend::Storage,
{
    match line.split_once(' ') {
        _ if line.is_empty() => {}
        _ if line == "/quit" => return false,
        _ if line == "/help" => {
            println!("/select <email>  open a conversation");
            println!("/delete <email>  delete a contact and its history");
            println!("/contacts        list the roster");
            println!("/image <data>    stage an image for the next send");
            println!("/quit            exit");
        }
        _ if line == "/contacts" => {
            for contact in session.roster().contacts() {
                let online = if session.presence().is_online(&contact.email) {
                    "•"
                } else {
                    " "
                };
                println!(
                    "{online} {} <{}> ({} unread) — {}",
                    contact.display_name(),
                    contact.email,
                    contact.unread_count,
                    contact.last_message
                );
            }
        }
        Some(("/select", email)) => {
            let contact = session
                .roster()
                .find(email)
                .unwrap_or_else(|| Contact::from_profile(&UserProfile::from_email(email)));
            session.select_contact(contact).await;
            for message in session.messages() {
                println!("  {}: {}", message.sender, message.text);
            }
        }
        Some(("/delete", email)) => {
            session.delete_contact(email.trim());
        }
        Some(("/image", data)) => {
            session.stage_image(data.trim());
            println!("(image staged; next send attaches it)");
        }
        _ => {
            if session.active_contact().is_none() {
                println!("(no conversation selected; use /select <email>)");
            } else {
                session.set_draft(line).await;
                session.send_message().await;
            }
        }
    }
    true
}

/// Initialize file-based logging.
///
/// Logs go to a file so stdout stays free for the command loop. Returns a
/// [`WorkerGuard`] that must be held until shutdown to ensure all buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("alumchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// The directory for persisted chat state: configured, or the platform
/// data dir, or a local fallback.
fn data_dir(config: &ClientConfig) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .map_or_else(|| PathBuf::from("alumchat-data"), |d| d.join("alumchat"))
    })
}
