use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

use super::RequestLogEntry;

#[derive(Debug, Error)]
pub enum RequestLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for request log entries
pub trait RequestLogSink: Send + Sync {
    fn append(&self, entry: &RequestLogEntry) -> Result<(), RequestLogError>;
}

/// Appends one JSON object per line to a file
pub struct FileRequestLog {
    file: Mutex<File>,
}

impl FileRequestLog {
    /// Open (or create) the log file in append mode
    pub fn open(path: &Path) -> Result<Self, RequestLogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RequestLogSink for FileRequestLog {
    fn append(&self, entry: &RequestLogEntry) -> Result<(), RequestLogError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("request log lock poisoned"))?;
        file.write_all(&line)?;
        Ok(())
    }
}
