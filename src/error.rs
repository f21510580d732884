//! Error types for promptty sessions.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the session core.
///
/// Timeouts and EOF carry whatever output was buffered when they fired, so a
/// caller can show the partial transcript instead of losing it.
#[derive(Error, Debug)]
pub enum Error {
    /// The operation was called with missing or invalid arguments.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The external program could not be started.
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// None of the patterns matched before the deadline.
    #[error("Timeout after {timeout:?} waiting for {patterns}; buffered output: {buffer:?}")]
    ExpectTimeout {
        timeout: Duration,
        patterns: String,
        buffer: String,
    },

    /// The program closed its output before any pattern matched.
    #[error("End of output reached before a prompt matched; buffered output: {buffer:?}")]
    Eof { buffer: String },

    /// No session is open.
    #[error("No connection - spawn a session first")]
    NotConnected,

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Output captured before a timeout or EOF, if this error carries any.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Error::ExpectTimeout { buffer, .. } | Error::Eof { buffer } => Some(buffer),
            _ => None,
        }
    }
}

/// Result alias using the session [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
