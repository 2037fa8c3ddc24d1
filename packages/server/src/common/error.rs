//! Typed errors for the relay pipeline.
//!
//! Everything except the configuration variants is recoverable: it is
//! logged and confined to the candidate or login attempt that raised it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Required environment value absent or empty
    #[error("missing required configuration: {name}")]
    ConfigMissing { name: &'static str },

    #[error("invalid configuration value for {name}: {reason}")]
    ConfigInvalid { name: &'static str, reason: String },

    /// Credentials rejected, or the feed page never came up
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("dedup store unavailable: {0}")]
    StoreUnavailable(String),

    /// Notification channel refused or never answered
    #[error("notification transport failed: {0}")]
    TransportFailure(String),

    /// Feed page could not be read
    #[error("feed surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

impl RelayError {
    /// Only configuration problems stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::ConfigMissing { .. } | RelayError::ConfigInvalid { .. }
        )
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;
