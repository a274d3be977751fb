//! Job identifiers and the wire form of a job

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job identifier with hex encoding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Create a new job ID from integer
    pub fn new(id: u64) -> Self {
        JobId(format!("{:x}", id))
    }

    /// Create job ID from a string received from a miner
    pub fn from_string(s: impl Into<String>) -> Self {
        JobId(s.into())
    }

    /// Get the job ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job parameters broadcast to miners in `mining.notify`.
///
/// Miners decode these positionally; order and widths never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    /// Job ID
    pub job_id: JobId,
    /// Version, little-endian packed, hex
    pub version: String,
    /// Previous block hash, reversed, hex
    pub prev_hash: String,
    /// Merkle root, reversed, hex
    pub merkle_root: String,
    /// Reserved field, hex
    pub reserved: String,
    /// Time, little-endian packed, hex
    pub time: String,
    /// Compact bits, reversed, hex
    pub bits: String,
    /// Whether miners must drop earlier jobs
    pub clean_jobs: bool,
}

impl JobParams {
    /// Convert to the positional params array for the notification
    pub fn to_params(&self) -> Vec<Value> {
        vec![
            Value::String(self.job_id.as_str().to_string()),
            Value::String(self.version.clone()),
            Value::String(self.prev_hash.clone()),
            Value::String(self.merkle_root.clone()),
            Value::String(self.reserved.clone()),
            Value::String(self.time.clone()),
            Value::String(self.bits.clone()),
            Value::Bool(self.clean_jobs),
        ]
    }
}
