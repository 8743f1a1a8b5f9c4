//! Scripted in-process daemon speaking the wire format over an in-memory pipe.
use crate::config::Config;
use crate::daemon::client::DaemonClient;
use crate::daemon::connection::DaemonConnection;
use crate::daemon::frame::{ErrorBody, RequestFrame, ResponseFrame};
use serde_json::Value;
use slog::Logger;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

pub(crate) enum Reply {
    Progress {
        stage: String,
        message: String,
    },
    Ok(Value),
    Error {
        status: u16,
        kind: String,
        message: String,
    },
    /// Send nothing further for this request; keep serving others.
    Hang,
    /// Drop the connection.
    Close,
}

impl Reply {
    pub fn progress(stage: &str, message: &str) -> Self {
        Reply::Progress {
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }

    pub fn ok(body: Value) -> Self {
        Reply::Ok(body)
    }

    pub fn error(status: u16, kind: &str, message: &str) -> Self {
        Reply::Error {
            status,
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }
}

pub(crate) struct FakeDaemon {
    requests: Arc<Mutex<Vec<RequestFrame>>>,
    task: JoinHandle<()>,
}

impl FakeDaemon {
    pub fn requests(&self) -> Vec<RequestFrame> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn test_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

pub(crate) fn test_config() -> Config {
    Config::new(PathBuf::from("/nonexistent/keyward-test"))
}

pub(crate) fn spawn_daemon<F>(script: F) -> (DaemonClient, FakeDaemon)
where
    F: FnMut(&RequestFrame) -> Vec<Reply> + Send + 'static,
{
    spawn_daemon_with(test_config(), script)
}

pub(crate) fn spawn_daemon_with<F>(config: Config, mut script: F) -> (DaemonClient, FakeDaemon)
where
    F: FnMut(&RequestFrame) -> Vec<Reply> + Send + 'static,
{
    let (client_io, daemon_io) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let log = test_logger();
    let client = DaemonClient::new(
        DaemonConnection::from_io(client_read, client_write, &log),
        &config,
        &log,
    );

    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let task = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(daemon_io);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let request: RequestFrame =
                serde_json::from_str(&line).expect("client sent a malformed frame");
            recorded.lock().unwrap().push(request.clone());

            let id = request.id;
            for reply in script(&request) {
                let frame = match reply {
                    Reply::Progress { stage, message } => {
                        ResponseFrame::Progress { id, stage, message }
                    }
                    Reply::Ok(body) => ResponseFrame::Response {
                        id,
                        status: 200,
                        body: Some(body),
                    },
                    Reply::Error {
                        status,
                        kind,
                        message,
                    } => ResponseFrame::Error {
                        id,
                        status,
                        error: ErrorBody {
                            kind: Some(kind),
                            message: vec![message],
                        },
                    },
                    Reply::Hang => break,
                    Reply::Close => return,
                };
                let mut line = serde_json::to_vec(&frame).unwrap();
                line.push(b'\n');
                if write.write_all(&line).await.is_err() {
                    return;
                }
            }
        }
    });

    (client, FakeDaemon { requests, task })
}
