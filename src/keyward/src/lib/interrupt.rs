use keyward_core::daemon::CancelToken;
use slog::{debug, Logger};
use tokio::task::JoinHandle;

/// Cancels a token when the user presses Ctrl-C. Must be called from
/// within a tokio runtime.
pub struct InterruptGuard {
    token: CancelToken,
    watcher: JoinHandle<()>,
}

impl InterruptGuard {
    pub fn install(log: &Logger) -> Self {
        let token = CancelToken::new();
        let cancel = token.clone();
        let log = log.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!(log, "Interrupted, canceling the current request");
                cancel.cancel();
            }
        });
        InterruptGuard { token, watcher }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
