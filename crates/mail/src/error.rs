//! Error type shared by the driver, action and fetch layers
//!
//! Every error carries an [`ErrorKind`] so callers can branch on the class of
//! failure (for example tearing down a connection on a fatal provider error)
//! without inspecting message text.

use std::fmt;

/// Provider error codes that invalidate the stored connection
pub const FATAL_PROVIDER_CODES: &[&str] = &["invalid_grant"];

/// Classification of a [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No session, or the session has no active connection
    InvalidSession,
    /// The connection record is missing or lacks credentials
    InvalidConnection,
    /// Provider rejected the credentials for good; the connection must be dropped
    FatalProvider,
    /// Any other provider failure
    Provider,
    /// Business rule violation, reported as `{success: false}` by actions
    Validation,
    /// Transport failure talking to an HTTP endpoint
    Network,
    /// Endpoint refused the caller (401/403)
    Auth,
    /// Local database failure
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidSession => "invalid session",
            ErrorKind::InvalidConnection => "invalid connection",
            ErrorKind::FatalProvider => "fatal provider error",
            ErrorKind::Provider => "provider error",
            ErrorKind::Validation => "validation error",
            ErrorKind::Network => "network error",
            ErrorKind::Auth => "authorization error",
            ErrorKind::Storage => "storage error",
        };
        f.write_str(name)
    }
}

/// Error returned across the library boundary
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping its text as the message
    pub fn with_source(kind: ErrorKind, source: anyhow::Error) -> Self {
        Self {
            kind,
            message: format!("{:#}", source),
            source: Some(source.into()),
        }
    }

    pub fn invalid_session() -> Self {
        Self::new(ErrorKind::InvalidSession, "Invalid session")
    }

    pub fn invalid_connection() -> Self {
        Self::new(ErrorKind::InvalidConnection, "Invalid connection")
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Build a provider error from a provider-reported code.
    ///
    /// Codes listed in [`FATAL_PROVIDER_CODES`] become [`ErrorKind::FatalProvider`].
    pub fn provider(code: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if FATAL_PROVIDER_CODES.contains(&code.as_str()) {
            ErrorKind::FatalProvider
        } else {
            ErrorKind::Provider
        };
        Self::new(kind, code)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::FatalProvider
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::with_source(ErrorKind::Storage, e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_is_fatal() {
        let err = Error::provider("invalid_grant");
        assert_eq!(err.kind(), ErrorKind::FatalProvider);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "invalid_grant");
    }

    #[test]
    fn test_other_codes_are_not_fatal() {
        let err = Error::provider("rateLimitExceeded");
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_session_errors() {
        assert_eq!(Error::invalid_session().to_string(), "Invalid session");
        assert_eq!(Error::invalid_connection().kind(), ErrorKind::InvalidConnection);
    }

    #[test]
    fn test_with_source_keeps_context() {
        let source = anyhow::anyhow!("connection reset").context("Failed to list threads");
        let err = Error::with_source(ErrorKind::Network, source);
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.message().contains("Failed to list threads"));
        assert!(err.message().contains("connection reset"));
    }
}
