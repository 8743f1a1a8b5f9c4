use crate::config::Config;
use crate::daemon::cancel::CancelToken;
use crate::daemon::connection::DaemonConnection;
use crate::daemon::frame::{Method, RequestFrame, Routed, Terminal};
use crate::daemon::progress::{ProgressEvent, ProgressSink};
use crate::daemon::request_id::RequestId;
use crate::error::daemon_call::DaemonCallError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::{debug, trace, Logger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// The single point through which requests reach the daemon.
#[derive(Clone)]
pub struct DaemonClient {
    connection: Arc<DaemonConnection>,
    version: String,
    api_version: String,
    timeout: Option<Duration>,
    log: Logger,
}

impl DaemonClient {
    pub fn new(connection: DaemonConnection, config: &Config, log: &Logger) -> Self {
        DaemonClient {
            connection: Arc::new(connection),
            version: config.version().to_string(),
            api_version: config.api_version().to_string(),
            timeout: config.request_timeout(),
            log: log.clone(),
        }
    }

    /// Connects to the daemon socket named in `config`.
    #[cfg(unix)]
    pub async fn connect(config: &Config, log: &Logger) -> Result<Self, DaemonCallError> {
        let connection = DaemonConnection::connect(config.socket_path(), log).await?;
        Ok(Self::new(connection, config, log))
    }

    /// Writes a request and returns a handle to its progress stream and
    /// outcome. Dropping the handle abandons the request.
    pub async fn begin<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<PendingCall, DaemonCallError>
    where
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| DaemonCallError::SerializeRequestFailed(path.to_string(), err))?;

        let id = RequestId::new();
        let receiver = self.connection.register(id)?;
        let call = PendingCall {
            id,
            path: path.to_string(),
            receiver,
            connection: self.connection.clone(),
            terminal: None,
            exhausted: false,
        };

        trace!(self.log, "Sending {} {}", method, path; "request_id" => %id);
        self.connection
            .write_frame(&RequestFrame {
                id,
                method,
                path: path.to_string(),
                version: self.version.clone(),
                api_version: self.api_version.clone(),
                body,
            })
            .await?;
        Ok(call)
    }

    /// Sends a request, hands every progress event to `progress`, and
    /// returns the daemon's terminal answer.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        progress: &mut dyn ProgressSink,
    ) -> Result<T, DaemonCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_until(method, path, body, progress, &CancelToken::new())
            .await
    }

    /// Like `send`, but gives up with `Canceled` as soon as `cancel` fires
    /// or the configured request timeout elapses. No progress is delivered
    /// after that.
    pub async fn send_until<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<T, DaemonCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let exchange = async {
            let mut call = self.begin(method, path, body).await?;
            while let Some(event) = call.next_progress().await {
                // Events may already be queued when the token fires.
                if cancel.is_canceled() {
                    debug!(self.log, "{} {} canceled", method, path);
                    return Err(DaemonCallError::Canceled);
                }
                progress.on_progress(&event);
            }
            call.outcome().await
        };
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, exchange)
                    .await
                    .unwrap_or_else(|_| {
                        debug!(self.log, "{} {} timed out after {:?}", method, path, limit);
                        Err(DaemonCallError::Canceled)
                    }),
                None => exchange.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.canceled() => {
                debug!(self.log, "{} {} canceled", method, path);
                Err(DaemonCallError::Canceled)
            }
            result = bounded => result,
        }
    }
}

/// A request in flight: an ordered stream of progress events followed by
/// one outcome.
pub struct PendingCall {
    id: RequestId,
    path: String,
    receiver: mpsc::Receiver<Routed>,
    connection: Arc<DaemonConnection>,
    terminal: Option<Terminal>,
    exhausted: bool,
}

impl PendingCall {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// The next progress event, or `None` once the outcome is known or the
    /// connection is gone.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        if self.terminal.is_some() || self.exhausted {
            return None;
        }
        match self.receiver.recv().await {
            Some(Routed::Progress(event)) => Some(event),
            Some(Routed::Terminal(terminal)) => {
                self.terminal = Some(terminal);
                None
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    /// Waits for the terminal frame, discarding any progress not yet read,
    /// and decodes the response body as `T`.
    pub async fn outcome<T: DeserializeOwned>(mut self) -> Result<T, DaemonCallError> {
        while self.next_progress().await.is_some() {}

        let terminal = match self.terminal.take() {
            Some(terminal) => terminal,
            None => return Err(self.connection.failure(&self.id).into()),
        };
        let body = terminal.into_result()?;
        serde_json::from_value(body.unwrap_or(serde_json::Value::Null))
            .map_err(|err| DaemonCallError::DeserializeResponseFailed(self.path.clone(), err))
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.connection.deregister(&self.id);
    }
}
