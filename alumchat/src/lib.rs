//! Alumchat — real-time messaging core for the alumni network app.
//!
//! The crate is layered bottom-up: [`transport`] owns the connection to the
//! messaging endpoint, [`presence`] projects status/typing events into
//! queryable state, [`store`] persists per-contact conversation logs,
//! [`roster`] keeps the activity-ordered contact list, and [`session`]
//! orchestrates all of them behind the user-facing chat operations.

pub mod config;
pub mod presence;
pub mod roster;
pub mod session;
pub mod store;
pub mod transport;
