//! Error types for registry synchronization
//!
//! Every failure carries one of a small set of kinds so that callers can
//! decide whether to skip the current item or abort the run.

pub mod handlers;

use std::fmt;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure classification used for logging and control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catalog unavailable; the run cannot continue
    FatalPrecondition,
    /// Network level fault on a single call
    Transient,
    /// Expected absence of an image, blob or manifest
    NotFound,
    /// Unexpected failure reported by a registry or the container engine
    Api,
    /// Invalid arguments or environment
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FatalPrecondition => "fatal-precondition",
            ErrorKind::Transient => "transient",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Api => "api-error",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Fatal precondition failed: {0}")]
    FatalPrecondition(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::FatalPrecondition(_) => ErrorKind::FatalPrecondition,
            SyncError::Transient(_) => ErrorKind::Transient,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Api(_) => ErrorKind::Api,
            SyncError::Config(_) => ErrorKind::Config,
        }
    }

    /// Errors that end the whole run rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::FatalPrecondition(_) | SyncError::Config(_)
        )
    }

    /// Prefix the message with `context`, keeping the kind
    pub fn with_context(self, context: &str) -> SyncError {
        let wrap = |msg: String| format!("{}: {}", context, msg);
        match self {
            SyncError::FatalPrecondition(msg) => SyncError::FatalPrecondition(wrap(msg)),
            SyncError::Transient(msg) => SyncError::Transient(wrap(msg)),
            SyncError::NotFound(msg) => SyncError::NotFound(wrap(msg)),
            SyncError::Api(msg) => SyncError::Api(wrap(msg)),
            SyncError::Config(msg) => SyncError::Config(wrap(msg)),
        }
    }

    /// Promote any failure to a fatal one, keeping its message
    pub fn into_fatal(self, context: &str) -> SyncError {
        match self {
            SyncError::FatalPrecondition(msg) => SyncError::FatalPrecondition(msg),
            other => SyncError::FatalPrecondition(format!("{}: {}", context, other)),
        }
    }

    /// Exit status reported by the binary for a run that ended with this error
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Api(format!("Malformed response body: {}", err))
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "registry request")
    }
}
