use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// How the daemon classified a failed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaemonErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    ResourceExists,
    Internal,
    Other(u16),
}

impl DaemonErrorKind {
    /// Classifies a failure by the daemon's error type, falling back to the
    /// status code when the type is missing or unrecognized.
    pub fn classify(error_type: Option<&str>, status: u16) -> Self {
        match error_type {
            Some("bad_request") => DaemonErrorKind::BadRequest,
            Some("unauthorized") => DaemonErrorKind::Unauthorized,
            Some("not_found") => DaemonErrorKind::NotFound,
            Some("resource_exists") | Some("conflict") => DaemonErrorKind::ResourceExists,
            Some("internal_server") | Some("internal") => DaemonErrorKind::Internal,
            _ => Self::from_status(status),
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 => DaemonErrorKind::BadRequest,
            401 | 403 => DaemonErrorKind::Unauthorized,
            404 => DaemonErrorKind::NotFound,
            409 => DaemonErrorKind::ResourceExists,
            500..=599 => DaemonErrorKind::Internal,
            other => DaemonErrorKind::Other(other),
        }
    }
}

impl fmt::Display for DaemonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonErrorKind::BadRequest => f.write_str("bad request"),
            DaemonErrorKind::Unauthorized => f.write_str("unauthorized"),
            DaemonErrorKind::NotFound => f.write_str("not found"),
            DaemonErrorKind::ResourceExists => f.write_str("resource exists"),
            DaemonErrorKind::Internal => f.write_str("internal"),
            DaemonErrorKind::Other(status) => write!(f, "status {status}"),
        }
    }
}

/// A terminal rejection reported by the daemon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DaemonError {
    pub kind: DaemonErrorKind,
    pub status: u16,
    pub messages: Vec<String>,
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            write!(f, "daemon returned {}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.messages.join(", "))
        }
    }
}

/// The connection to the daemon failed. Whether the daemon completed the
/// request is unknown.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to the daemon at {0}")]
    ConnectFailed(PathBuf, #[source] std::io::Error),

    #[error("Failed to write request to the daemon")]
    WriteFailed(#[source] std::io::Error),

    #[error("Connection to the daemon was lost: {0}")]
    ConnectionLost(String),

    #[error("Stopped listening to the request after {0} unread frames")]
    FellBehind(usize),
}

#[derive(Error, Debug)]
pub enum DaemonCallError {
    #[error("Failed to serialize request body for {0}")]
    SerializeRequestFailed(String, #[source] serde_json::Error),

    #[error("Failed to deserialize daemon response for {0}")]
    DeserializeResponseFailed(String, #[source] serde_json::Error),

    #[error("Daemon transport failed; the request may or may not have completed")]
    Transport(#[from] TransportError),

    #[error("Daemon rejected the request")]
    Daemon(#[from] DaemonError),

    #[error("Request was canceled")]
    Canceled,
}

impl DaemonCallError {
    pub fn daemon_error(&self) -> Option<&DaemonError> {
        match self {
            DaemonCallError::Daemon(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_resource_exists(&self) -> bool {
        self.daemon_error()
            .is_some_and(|err| err.kind == DaemonErrorKind::ResourceExists)
    }
}
