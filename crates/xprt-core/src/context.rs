use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Height, Timestamp};

/// Header data of the block whose state transition is running.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockContext {
    pub chain_id: String,
    pub height: Height,
    /// Block time (Unix seconds, UTC).
    pub time: Timestamp,
}

impl BlockContext {
    pub fn new(chain_id: impl Into<String>, height: Height, time: Timestamp) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            time,
        }
    }

    /// Block time as RFC 3339, for logs.
    pub fn time_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.time, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.time.to_string())
    }
}
