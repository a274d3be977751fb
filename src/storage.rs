//! Share and block persistence

use crate::core::JobId;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An accepted share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Worker that submitted the share
    pub worker: String,
    /// Job the share was found for
    pub job_id: JobId,
    /// Full nonce, hex
    pub nonce: String,
    /// Share difficulty credited
    pub difficulty: i64,
    /// Block height of the job
    pub height: u64,
    /// When the share was accepted
    pub timestamp: DateTime<Utc>,
}

/// A block accepted by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// The share that solved the block
    pub share: ShareRecord,
    /// Network difficulty at the time, decimal
    pub network_difficulty: String,
    /// Block hash in display order, hex
    pub hash: String,
}

/// Storage for shares and found blocks
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Whether a share with this job and nonce was already recorded
    async fn has_share(&self, job_id: &JobId, nonce: &str) -> Result<bool>;

    /// Record an accepted share. Returns `false` if it already existed.
    async fn record_share(&self, share: &ShareRecord) -> Result<bool>;

    /// Record a block candidate accepted by the node
    async fn record_block(&self, block: &BlockRecord) -> Result<()>;

    /// Forget duplicate-tracking entries for every job except `current`.
    /// Returns how many entries were dropped.
    async fn prune(&self, _current: &JobId) -> Result<usize> {
        Ok(0)
    }
}

/// Process-local store keyed by `(job_id, nonce)`
#[derive(Debug, Default)]
pub struct InMemoryShareStore {
    seen: DashSet<(JobId, String)>,
    shares: DashMap<String, u64>,
    blocks: DashMap<u64, BlockRecord>,
}

impl InMemoryShareStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shares accepted from `worker`
    pub fn share_count(&self, worker: &str) -> u64 {
        self.shares.get(worker).map(|count| *count).unwrap_or(0)
    }

    /// Entries held for duplicate detection
    pub fn tracked_shares(&self) -> usize {
        self.seen.len()
    }

    /// Blocks recorded so far, ordered by height
    pub fn blocks(&self) -> Vec<BlockRecord> {
        let mut blocks: Vec<_> = self.blocks.iter().map(|entry| entry.value().clone()).collect();
        blocks.sort_by_key(|block| block.share.height);
        blocks
    }
}

#[async_trait]
impl ShareStore for InMemoryShareStore {
    async fn has_share(&self, job_id: &JobId, nonce: &str) -> Result<bool> {
        Ok(self.seen.contains(&(job_id.clone(), nonce.to_string())))
    }

    async fn record_share(&self, share: &ShareRecord) -> Result<bool> {
        if !self.seen.insert((share.job_id.clone(), share.nonce.clone())) {
            return Ok(false);
        }

        *self.shares.entry(share.worker.clone()).or_insert(0) += 1;
        debug!(worker = %share.worker, job_id = %share.job_id, "Share recorded");
        Ok(true)
    }

    async fn record_block(&self, block: &BlockRecord) -> Result<()> {
        self.seen
            .insert((block.share.job_id.clone(), block.share.nonce.clone()));
        self.blocks.insert(block.share.height, block.clone());
        debug!(height = block.share.height, hash = %block.hash, "Block recorded");
        Ok(())
    }

    async fn prune(&self, current: &JobId) -> Result<usize> {
        let before = self.seen.len();
        self.seen.retain(|(job_id, _)| job_id == current);
        Ok(before.saturating_sub(self.seen.len()))
    }
}
