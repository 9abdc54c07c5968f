use thiserror::Error;

pub mod client;
pub mod server;

pub use client::{Action, ClientCommand, Credentials, parse_roster_pick, parse_switch_choice};
pub use server::{AuthStatus, DamageCategory, ServerMessage, parse_server_message};

/// Longest line either side may send, terminator excluded.
pub const MAX_LINE_BYTES: usize = 2048;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty message")]
    EmptyMessage,

    #[error("Unknown action: {0}")]
    InvalidAction(String),

    #[error("Not a number: {0}")]
    InvalidNumber(String),
}
