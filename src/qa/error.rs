use thiserror::Error;

use crate::core::constants::qa::EMPTY_QUERY_MESSAGE;

/// Failures surfaced to the visitor. The `Display` text is what the chat panel shows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QaError {
    #[error("{}", EMPTY_QUERY_MESSAGE)]
    EmptyQuery,
    /// Non-success status whose body carried an `error` message
    #[error("{message}")]
    Server { status: u16, message: String },
    /// Non-success status without a usable body
    #[error("HTTP error! Status: {0}")]
    Status(u16),
    #[error("Failed to fetch response from the backend. Is the server running? ({0})")]
    Transport(String),
    #[error("Could not read the backend response: {0}")]
    Decode(String),
}

impl QaError {
    /// Whether the error was raised before any request left the client.
    pub fn is_local(&self) -> bool {
        matches!(self, QaError::EmptyQuery)
    }
}
