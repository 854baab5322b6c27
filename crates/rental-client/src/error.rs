//! Failure taxonomy for the request client

use std::time::Duration;

/// Exactly one of these is produced per logical call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 with no stored credentials; the caller must log in first.
    #[error("authentication required")]
    AuthenticationRequired,

    /// A refresh was attempted and failed; the credentials are gone.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Any other non-success status, with the server's message.
    #[error("request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    /// Network failure, or a response body that was not valid JSON.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-call deadline elapsed before attempt + refresh + retry finished.
    #[error("request deadline exceeded after {after:?}")]
    Timeout { after: Duration },
}

impl ApiError {
    /// Whether the caller should be sent back to login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::AuthenticationRequired | ApiError::SessionExpired
        )
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
