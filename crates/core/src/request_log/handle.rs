use tokio::sync::mpsc;

use super::RequestLogEntry;

/// Handle for recording proxied requests
///
/// This is cheaply cloneable and can be shared across handlers.
/// Entries are sent through a bounded channel to be written by the RequestLogWriter.
#[derive(Clone)]
pub struct RequestLogHandle {
    tx: mpsc::Sender<RequestLogEntry>,
}

impl RequestLogHandle {
    pub fn new(tx: mpsc::Sender<RequestLogEntry>) -> Self {
        Self { tx }
    }

    /// Record a request, waiting for channel capacity
    ///
    /// A closed channel is logged, never surfaced to the caller.
    pub async fn record(&self, endpoint: &str, method: &str, status_code: u16) {
        let entry = RequestLogEntry::new(endpoint, method, status_code);
        if let Err(e) = self.tx.send(entry).await {
            tracing::error!("Failed to record request: {}", e);
        }
    }
}
