// File: quill-common/src/error.rs

use std::fmt;
use std::io;

use thiserror::Error;

/// Upper bound on how much of an attached error-response body is worth
/// reading before giving up.
pub const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Handle to the structured error response a transport may attach to a
/// protocol failure. Reading the body is best-effort and bounded.
pub trait ErrorResponse: Send + Sync {
    /// Reads at most `limit` bytes of the response body as text.
    fn read_body(&self, limit: usize) -> io::Result<String>;
}

/// A protocol-level stream failure, optionally carrying the HTTP status
/// code and error response the transport observed.
pub struct ProtocolError {
    pub status_code: Option<u16>,
    pub response: Option<Box<dyn ErrorResponse>>,
}

impl ProtocolError {
    pub fn new(status_code: Option<u16>) -> Self {
        Self {
            status_code,
            response: None,
        }
    }

    pub fn with_response(status_code: Option<u16>, response: Box<dyn ErrorResponse>) -> Self {
        Self {
            status_code,
            response: Some(response),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolError")
            .field("status_code", &self.status_code)
            .field("has_response", &self.response.is_some())
            .finish()
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "stream protocol error (status {code})"),
            None => write!(f, "stream protocol error"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Invalid credential type: {0}")]
    InvalidCredentialType(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Platform(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_status_code() {
        let err = ProtocolError::new(Some(420));
        assert_eq!(err.to_string(), "stream protocol error (status 420)");
        let err = ProtocolError::new(None);
        assert_eq!(err.to_string(), "stream protocol error");
    }

    #[test]
    fn string_conversions_map_to_parse() {
        let err: Error = "bad field".into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
