use crate::daemon::frame::{RequestFrame, ResponseFrame, Routed};
use crate::daemon::request_id::RequestId;
use crate::error::daemon_call::{DaemonCallError, TransportError};
use slog::{debug, trace, Logger};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Frames buffered per request. A request whose consumer falls further
/// behind than this is dropped instead of stalling the reader.
pub(crate) const ROUTE_CAPACITY: usize = 64;

/// Complete request lines waiting for the writer task.
const WRITE_QUEUE: usize = 32;

struct WriteJob {
    line: Vec<u8>,
    done: oneshot::Sender<io::Result<()>>,
}

#[derive(Default)]
struct Routes {
    open: HashMap<RequestId, mpsc::Sender<Routed>>,
    /// Requests dropped because their consumer stopped keeping up.
    overrun: HashSet<RequestId>,
    /// Set once either task has stopped; no request can be routed after that.
    closed: Option<String>,
}

impl Routes {
    fn close(&mut self, reason: String) {
        self.closed.get_or_insert(reason);
        // Dropping the senders ends every pending request's stream.
        self.open.clear();
    }
}

/// One connection to the daemon, shared by any number of requests.
///
/// A writer task owns the write half and puts each request on the wire as
/// one whole line. A reader task routes incoming frames to the request
/// they belong to by correlation id.
pub struct DaemonConnection {
    writes: mpsc::Sender<WriteJob>,
    routes: Arc<Mutex<Routes>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl DaemonConnection {
    #[cfg(unix)]
    pub async fn connect(
        socket_path: &std::path::Path,
        log: &Logger,
    ) -> Result<Self, TransportError> {
        let stream = tokio::net::UnixStream::connect(socket_path)
            .await
            .map_err(|err| TransportError::ConnectFailed(socket_path.to_path_buf(), err))?;
        debug!(log, "Connected to daemon at {}", socket_path.display());
        let (reader, writer) = stream.into_split();
        Ok(Self::from_io(reader, writer, log))
    }

    /// Builds a connection over any byte stream. Must be called from within
    /// a tokio runtime.
    pub fn from_io<R, W>(reader: R, writer: W, log: &Logger) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let routes = Arc::new(Mutex::new(Routes::default()));
        let (writes, jobs) = mpsc::channel(WRITE_QUEUE);
        let reader = tokio::spawn(read_frames(
            BufReader::new(reader),
            routes.clone(),
            log.clone(),
        ));
        let writer = tokio::spawn(write_frames(writer, jobs, routes.clone(), log.clone()));
        DaemonConnection {
            writes,
            routes,
            reader,
            writer,
        }
    }

    fn routes(&self) -> MutexGuard<'_, Routes> {
        lock_routes(&self.routes)
    }

    pub(crate) fn register(&self, id: RequestId) -> Result<mpsc::Receiver<Routed>, TransportError> {
        let mut routes = self.routes();
        if let Some(reason) = &routes.closed {
            return Err(TransportError::ConnectionLost(reason.clone()));
        }
        let (sender, receiver) = mpsc::channel(ROUTE_CAPACITY);
        routes.open.insert(id, sender);
        Ok(receiver)
    }

    /// Stops routing frames for `id`. Anything the daemon still sends for it
    /// is dropped.
    pub(crate) fn deregister(&self, id: &RequestId) {
        let mut routes = self.routes();
        routes.open.remove(id);
        routes.overrun.remove(id);
    }

    pub(crate) fn closed_reason(&self) -> String {
        self.routes()
            .closed
            .clone()
            .unwrap_or_else(|| "the daemon stopped responding to this request".to_string())
    }

    /// Why the stream for `id` ended without a terminal frame.
    pub(crate) fn failure(&self, id: &RequestId) -> TransportError {
        let overrun = self.routes().overrun.remove(id);
        if overrun {
            return TransportError::FellBehind(ROUTE_CAPACITY);
        }
        TransportError::ConnectionLost(self.closed_reason())
    }

    /// Queues one request line for the writer task and waits until it is on
    /// the wire. Dropping the returned future never leaves a partial line:
    /// the frame is either not queued at all or written in full.
    pub(crate) async fn write_frame(&self, frame: &RequestFrame) -> Result<(), DaemonCallError> {
        let mut line = serde_json::to_vec(frame)
            .map_err(|err| DaemonCallError::SerializeRequestFailed(frame.path.clone(), err))?;
        line.push(b'\n');

        let (done, written) = oneshot::channel();
        if self.writes.send(WriteJob { line, done }).await.is_err() {
            return Err(TransportError::ConnectionLost(self.closed_reason()).into());
        }
        match written.await {
            Ok(result) => result.map_err(|err| TransportError::WriteFailed(err).into()),
            Err(_) => Err(TransportError::ConnectionLost(self.closed_reason()).into()),
        }
    }
}

impl Drop for DaemonConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

fn lock_routes(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_frames<R>(mut reader: R, routes: Arc<Mutex<Routes>>, log: Logger)
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let reason = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break "the daemon closed the connection".to_string(),
            Ok(_) => {}
            Err(err) => break format!("read failed: {err}"),
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let frame: ResponseFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => break format!("malformed frame from daemon: {err}"),
        };
        let id = *frame.id();
        let terminal = frame.is_terminal();

        let sender = {
            let mut routes = lock_routes(&routes);
            if terminal {
                routes.open.remove(&id)
            } else {
                routes.open.get(&id).cloned()
            }
        };
        let Some(sender) = sender else {
            debug!(log, "Dropping frame for unknown request {}", id);
            continue;
        };
        match sender.try_send(Routed::from(frame)) {
            Ok(()) => trace!(log, "Routed frame for request {}", id; "terminal" => terminal),
            Err(TrySendError::Full(_)) => {
                debug!(
                    log,
                    "Request {} has {} unread frames; dropping it", id, ROUTE_CAPACITY
                );
                let mut routes = lock_routes(&routes);
                routes.open.remove(&id);
                routes.overrun.insert(id);
            }
            Err(TrySendError::Closed(_)) => debug!(log, "Request {} is no longer listening", id),
        }
    };

    debug!(log, "Daemon connection closed: {}", reason);
    lock_routes(&routes).close(reason);
}

async fn write_frames<W>(
    mut writer: W,
    mut jobs: mpsc::Receiver<WriteJob>,
    routes: Arc<Mutex<Routes>>,
    log: Logger,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(WriteJob { line, done }) = jobs.recv().await {
        let result = match writer.write_all(&line).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };
        let failed = match &result {
            // A failed write may have left part of a line behind.
            Err(err) => {
                let reason = format!("write failed: {err}");
                debug!(log, "Daemon connection closed: {}", reason);
                lock_routes(&routes).close(reason);
                true
            }
            Ok(()) => false,
        };
        let _ = done.send(result);
        if failed {
            return;
        }
    }
}
