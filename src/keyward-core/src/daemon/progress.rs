use serde::{Deserialize, Serialize};

/// Incremental status reported by the daemon while it works on a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The daemon's identifier for the step being reported.
    pub stage: String,
    pub message: String,
}

/// Receives progress events for one request, in the order the daemon sent
/// them. Never called once the request's outcome is known.
pub trait ProgressSink {
    fn on_progress(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent),
{
    fn on_progress(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

pub struct DiscardProgress;

impl ProgressSink for DiscardProgress {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
}
