use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the gateway request log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
}

impl RequestLogEntry {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>, status_code: u16) -> Self {
        Self {
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            method: method.into(),
            status_code,
        }
    }
}
