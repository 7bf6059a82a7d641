//! Messages the hosting page can post to the worker.

use figus_core::Error;
use serde::{Deserialize, Serialize};

/// Inbound message, tagged by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate the waiting version now instead of when old pages close.
    SkipWaiting,
}

impl WorkerMessage {
    pub fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}
