// Feed event models exchanged over the socket
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One sample from the logger, keyed by column name.
pub type DataTick = BTreeMap<String, f64>;

/// Events pushed from the feed server to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full column-name list, replaces whatever the client shows.
    HeaderData(Vec<String>),
    /// One data tick restricted to the selected columns.
    SerialData(DataTick),
    /// Acknowledgement sent back to the client that changed the selection.
    ColumnsUpdated { columns: Vec<String> },
}

/// Events sent from dashboard clients to the feed server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    UpdateSelectedColumns(Vec<String>),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_frame(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ClientEvent {
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_frame(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
