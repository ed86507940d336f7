use std::error::Error;
use std::fmt;

use crate::domain::GridParseError;

/// Failure of a gateway call or of the arguments handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Rejected before (or by) the store because the request was malformed.
    Validation(String),
    /// The gateway could not be reached.
    Transport(String),
    /// The gateway answered with a failure status.
    Server { status: u16, message: String },
    /// The gateway answered with a body that is not a matrix.
    Decode(String),
}

impl SyncError {
    #[cfg(test)]
    pub fn message(&self) -> &str {
        match self {
            SyncError::Validation(message)
            | SyncError::Transport(message)
            | SyncError::Decode(message) => message,
            SyncError::Server { message, .. } => message,
        }
    }

    /// Transport, server and decode failures are worth offering a retry for.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::Validation(_))
    }

    /// Maps a non-success response onto the taxonomy. The server's own
    /// `error` text wins over the generic reason phrase.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| reason_phrase(status).to_string());
        if status == 400 {
            SyncError::Validation(message)
        } else {
            SyncError::Server { status, message }
        }
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Request failed",
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Validation(message) => write!(f, "{}", message),
            SyncError::Transport(message) => write!(f, "could not reach matrix store: {}", message),
            SyncError::Server { status, message } => {
                write!(f, "matrix store error ({}): {}", status, message)
            }
            SyncError::Decode(message) => write!(f, "malformed matrix response: {}", message),
        }
    }
}

impl Error for SyncError {}

impl From<GridParseError> for SyncError {
    fn from(value: GridParseError) -> Self {
        SyncError::Validation(value.to_string())
    }
}
