//! Peer wire protocol
//!
//! Newline-delimited JSON frames tagged by `type`:
//!
//! ```text
//! bridge -> peer  {"type":"app_message","transaction_id":7,"payload":{"lat":54400,...}}
//! peer -> bridge  {"type":"ack","transaction_id":7}
//! peer -> bridge  {"type":"nack","transaction_id":7,"reason":"busy"}
//! peer -> bridge  {"type":"app_message","payload":{"command":"stop"}}
//! ```

use crate::domain::models::{Payload, TransactionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    AppMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transaction_id: Option<TransactionId>,
        payload: Payload,
    },
    Ack {
        transaction_id: TransactionId,
    },
    Nack {
        transaction_id: TransactionId,
        #[serde(default)]
        reason: String,
    },
}

impl Frame {
    /// Serialize as a single line, newline included.
    pub fn to_line(&self) -> serde_json::Result<String> {
        Ok(serde_json::to_string(self)? + "\n")
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}
