//! Configuration system for the alumchat client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/alumchat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    network: NetworkFileConfig,
    chat: ChatFileConfig,
    storage: StorageFileConfig,
    profile: ProfileFileConfig,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    endpoint: Option<String>,
    user_id: Option<String>,
    reconnect_delay_secs: Option<u64>,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    typing_quiet_ms: Option<u64>,
    event_buffer: Option<usize>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

/// `[profile]` section of the config file (the local user's wire profile).
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ProfileFileConfig {
    first_name: Option<String>,
    last_name: Option<String>,
    avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Network --
    /// Messaging endpoint base URL (e.g. `ws://127.0.0.1:9000/ws`).
    pub endpoint: Option<String>,
    /// The local user's identity (email).
    pub user_id: Option<String>,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,

    // -- Chat --
    /// Typing debounce quiet period.
    pub typing_quiet_period: Duration,
    /// Buffer size for the session event channel.
    pub event_buffer: usize,

    // -- Storage --
    /// Directory for persisted roster and conversation logs.
    pub data_dir: Option<PathBuf>,

    // -- Profile --
    /// The local user's first name, sent with outbound messages.
    pub first_name: Option<String>,
    /// The local user's last name, sent with outbound messages.
    pub last_name: Option<String>,
    /// The local user's avatar URL, sent with outbound messages.
    pub avatar: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user_id: None,
            reconnect_delay: Duration::from_secs(3),
            typing_quiet_period: Duration::from_millis(1000),
            event_buffer: 64,
            data_dir: None,
            first_name: None,
            last_name: None,
            avatar: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given config file cannot be
    /// read or if a config file fails to parse.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            endpoint: cli
                .endpoint
                .clone()
                .or_else(|| file.network.endpoint.clone()),
            user_id: cli.user_id.clone().or_else(|| file.network.user_id.clone()),
            reconnect_delay: file
                .network
                .reconnect_delay_secs
                .map_or(defaults.reconnect_delay, Duration::from_secs),
            typing_quiet_period: file
                .chat
                .typing_quiet_ms
                .map_or(defaults.typing_quiet_period, Duration::from_millis),
            event_buffer: file.chat.event_buffer.unwrap_or(defaults.event_buffer),
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone()),
            first_name: file.profile.first_name.clone(),
            last_name: file.profile.last_name.clone(),
            avatar: file.profile.avatar.clone(),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Real-time messaging core for the alumni network app")]
pub struct CliArgs {
    /// WebSocket URL of the messaging endpoint.
    #[arg(long, env = "ALUMCHAT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Your identity within the network (email).
    #[arg(long, env = "ALUMCHAT_USER_ID")]
    pub user_id: Option<String>,

    /// Path to config file (default: `~/.config/alumchat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for persisted chat state.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "ALUMCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/alumchat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("alumchat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
