use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation shared between a caller and in-flight requests.
/// Once canceled it stays canceled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        CancelToken {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_canceled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once `cancel` has been called on any clone of this token.
    pub async fn canceled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|canceled| *canceled).await.is_err() {
            // The sender lives as long as any clone of the token does.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
