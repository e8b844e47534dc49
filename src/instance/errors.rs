//! # Session Errors
//!
//! Failures reported by an `Instance` implementation. The core never
//! inspects or retries these, it carries them to the caller unchanged.

use thiserror::Error;

/// Result type for collaborator calls
pub type SessionResult<T> = Result<T, SessionError>;

/// Transport or server-side failure on one session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The server rejected a statement
    #[error("MySQL Error {code}: {message}")]
    Server { code: u32, message: String },

    /// The session is gone or could not be used
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with something the session could not decode
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Create a server error
    pub fn server(code: u32, message: impl Into<String>) -> Self {
        SessionError::Server {
            code,
            message: message.into(),
        }
    }

    /// Server error code, if the server produced one
    pub fn code(&self) -> Option<u32> {
        match self {
            SessionError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}
