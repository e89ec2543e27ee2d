//! Error types for session lifecycle operations

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Boxed underlying cause carried by negotiation failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while establishing or tearing down a session
#[derive(Error, Debug)]
pub enum SessionError {
    /// No credential could be resolved (no explicit pair, no object, no prompt input)
    #[error("No credential available")]
    NoCredential,

    /// Server address or port is unusable
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Login request failed (network, TLS, non-2xx, or no session issued)
    #[error("{reason}")]
    AuthFailure {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Capability probe failed after a successful login
    #[error("Unsupported release: device API could not be negotiated")]
    UnsupportedVersion {
        #[source]
        source: Option<BoxError>,
    },

    /// No connection registered as the process default
    #[error("Not connected: no default connection")]
    NoDefaultConnection,

    /// User declined the disconnect confirmation
    #[error("Disconnect aborted by user")]
    UserAborted,

    /// Remote logout call failed
    #[error("Logout failed: {0}")]
    LogoutFailure(#[source] RequestFailure),

    /// Building the HTTP client failed
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(#[source] reqwest::Error),
}

impl SessionError {
    /// Login failure with the fixed user-facing reason
    pub fn auth_failure(source: impl Into<BoxError>) -> Self {
        Self::AuthFailure {
            reason: "Unable to connect".to_string(),
            source: Some(source.into()),
        }
    }

    /// Probe failure, keeping the underlying cause for diagnostics
    pub fn unsupported_version(source: impl Into<BoxError>) -> Self {
        Self::UnsupportedVersion {
            source: Some(source.into()),
        }
    }

    /// Whether this error means the user chose not to proceed
    pub fn is_user_aborted(&self) -> bool {
        matches!(self, Self::UserAborted)
    }
}

/// Errors raised by the generic authenticated request dispatcher
#[derive(Error, Debug)]
pub enum RequestFailure {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Device returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl RequestFailure {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the failure, if the device answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_auth_failure_reason() {
        let err = SessionError::auth_failure(RequestFailure::server_error(401, "denied"));
        assert_eq!(err.to_string(), "Unable to connect");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unsupported_version_keeps_cause() {
        let err = SessionError::unsupported_version(RequestFailure::server_error(503, "busy"));
        let cause = err.source().map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("Server error 503: busy"));
    }

    #[test]
    fn test_reasons_are_distinguishable() {
        let auth = SessionError::auth_failure(RequestFailure::ParseError("x".into()));
        let version = SessionError::unsupported_version(RequestFailure::ParseError("x".into()));
        assert_ne!(auth.to_string(), version.to_string());
    }

    #[test]
    fn test_request_failure_status() {
        assert_eq!(RequestFailure::server_error(404, "nope").status(), Some(404));
        assert_eq!(RequestFailure::ParseError("bad".into()).status(), None);
    }
}
