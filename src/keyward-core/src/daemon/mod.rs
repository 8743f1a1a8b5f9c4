//! Request/response protocol spoken with the local daemon.
//!
//! Every request gets a correlation id. The daemon answers with zero or more
//! progress frames followed by exactly one terminal frame, all tagged with
//! that id, so many requests can share one connection.
pub(crate) mod cancel;
pub(crate) mod client;
pub(crate) mod connection;
pub(crate) mod frame;
pub(crate) mod progress;
pub(crate) mod request_id;

#[cfg(test)]
pub(crate) mod test_daemon;

pub use cancel::CancelToken;
pub use client::{DaemonClient, PendingCall};
pub use connection::DaemonConnection;
pub use frame::Method;
pub use progress::{DiscardProgress, ProgressEvent, ProgressSink};
pub use request_id::RequestId;
