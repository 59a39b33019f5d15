use std::sync::Arc;

use tokio::sync::mpsc;

use super::{RequestLogEntry, RequestLogHandle, RequestLogSink};

/// Background task that receives request log entries and appends them to a sink
pub struct RequestLogWriter {
    rx: mpsc::Receiver<RequestLogEntry>,
    sink: Arc<dyn RequestLogSink>,
}

impl RequestLogWriter {
    pub fn new(rx: mpsc::Receiver<RequestLogEntry>, sink: Arc<dyn RequestLogSink>) -> Self {
        Self { rx, sink }
    }

    /// Run the writer until every handle has been dropped
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("Request log writer started");

        while let Some(entry) = self.rx.recv().await {
            if let Err(e) = self.sink.append(&entry) {
                tracing::error!("Failed to write request log entry: {}", e);
            }
        }

        tracing::info!("Request log writer shutting down");
    }
}

/// Create a request log system
///
/// Returns:
/// - `RequestLogHandle` - clone this into request handlers
/// - `RequestLogWriter` - spawn this with `tokio::spawn(writer.run())`
pub fn create_request_log(
    sink: Arc<dyn RequestLogSink>,
    buffer_size: usize,
) -> (RequestLogHandle, RequestLogWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = RequestLogHandle::new(tx);
    let writer = RequestLogWriter::new(rx, sink);
    (handle, writer)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::request_log::RequestLogError;

    struct MemorySink {
        entries: Mutex<Vec<RequestLogEntry>>,
        should_fail: bool,
    }

    impl MemorySink {
        fn new(should_fail: bool) -> Self {
            Self {
                entries: Mutex::new(Vec::new()),
                should_fail,
            }
        }

        fn entries(&self) -> Vec<RequestLogEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl RequestLogSink for MemorySink {
        fn append(&self, entry: &RequestLogEntry) -> Result<(), RequestLogError> {
            if self.should_fail {
                return Err(RequestLogError::Io(std::io::Error::other("disk full")));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_writer_appends_in_order() {
        let sink = Arc::new(MemorySink::new(false));
        let (handle, writer) = create_request_log(sink.clone(), 10);
        let writer_handle = tokio::spawn(writer.run());

        handle.record("/api/movies", "GET", 200).await;
        handle.record("/api/orders", "POST", 202).await;
        drop(handle);

        writer_handle.await.unwrap();

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].endpoint, "/api/movies");
        assert_eq!(entries[1].status_code, 202);
    }

    #[tokio::test]
    async fn test_writer_survives_sink_failure() {
        let sink = Arc::new(MemorySink::new(true));
        let (handle, writer) = create_request_log(sink.clone(), 10);
        let writer_handle = tokio::spawn(writer.run());

        handle.record("/api/movies", "GET", 200).await;
        drop(handle);

        writer_handle.await.unwrap();
        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_writer_waits_for_all_handles() {
        let sink = Arc::new(MemorySink::new(false));
        let (handle, writer) = create_request_log(sink.clone(), 10);
        let other = handle.clone();
        let writer_handle = tokio::spawn(writer.run());

        drop(handle);
        other.record("/health", "GET", 200).await;
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert!(!writer_handle.is_finished());

        drop(other);
        let result =
            tokio::time::timeout(tokio::time::Duration::from_secs(1), writer_handle).await;
        assert!(result.is_ok());
        assert_eq!(sink.entries().len(), 1);
    }
}
