use crate::daemon::progress::ProgressEvent;
use crate::daemon::request_id::RequestId;
use crate::error::daemon_call::{DaemonError, DaemonErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// A request as written to the daemon, one JSON object per line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct RequestFrame {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    pub version: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Vec<String>,
}

/// Frames read from the daemon. Progress frames precede exactly one
/// terminal (`Response` or `Error`) frame per request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ResponseFrame {
    Progress {
        id: RequestId,
        stage: String,
        message: String,
    },
    Response {
        id: RequestId,
        status: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
    Error {
        id: RequestId,
        status: u16,
        error: ErrorBody,
    },
}

impl ResponseFrame {
    pub fn id(&self) -> &RequestId {
        match self {
            ResponseFrame::Progress { id, .. }
            | ResponseFrame::Response { id, .. }
            | ResponseFrame::Error { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseFrame::Progress { .. })
    }
}

/// The final outcome of a request, as reported by the daemon.
#[derive(Debug)]
pub(crate) enum Terminal {
    Response { status: u16, body: Option<Value> },
    Error { status: u16, error: ErrorBody },
}

impl Terminal {
    pub fn into_result(self) -> Result<Option<Value>, DaemonError> {
        match self {
            Terminal::Response { status, body } if status < 400 => Ok(body),
            Terminal::Response { status, .. } => Err(DaemonError {
                kind: DaemonErrorKind::from_status(status),
                status,
                messages: Vec::new(),
            }),
            Terminal::Error { status, error } => Err(DaemonError {
                kind: DaemonErrorKind::classify(error.kind.as_deref(), status),
                status,
                messages: error.message,
            }),
        }
    }
}

/// Splits a frame into progress or a terminal outcome.
pub(crate) enum Routed {
    Progress(ProgressEvent),
    Terminal(Terminal),
}

impl From<ResponseFrame> for Routed {
    fn from(frame: ResponseFrame) -> Self {
        match frame {
            ResponseFrame::Progress { stage, message, .. } => {
                Routed::Progress(ProgressEvent { stage, message })
            }
            ResponseFrame::Response { status, body, .. } => {
                Routed::Terminal(Terminal::Response { status, body })
            }
            ResponseFrame::Error { status, error, .. } => {
                Routed::Terminal(Terminal::Error { status, error })
            }
        }
    }
}
