//! Error types for session and token operations

/// Errors from session and token operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("session parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("no active session")]
    Anonymous,
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
