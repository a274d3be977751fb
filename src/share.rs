//! Share validation and classification
//!
//! Every submission ends in exactly one [`ShareOutcome`]. The checks run in a
//! fixed order and stop at the first failure:
//!
//! 1. field sizes
//! 2. current work lookup
//! 3. staleness
//! 4. header reconstruction
//! 5. share target
//! 6. duplicate lookup
//! 7. network target, with block submission
//! 8. share recording

use crate::core::codec::{bytes_to_hex, double_hash, reversed};
use crate::core::constants::{NONCE_HEX_LEN, NONCE_SIZE, SOLUTION_HEX_LEN, SOLUTION_SIZE, TIME_HEX_LEN};
use crate::core::difficulty::target_from_difficulty;
use crate::core::{JobId, Network, ProofOfWork, Target, Work};
use crate::error::Result;
use crate::protocol::UpstreamRpc;
use crate::refresher::WorkRefresher;
use crate::registry::WorkRegistry;
use crate::storage::{BlockRecord, ShareRecord, ShareStore};
use chrono::Utc;
use dashmap::DashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A miner's `mining.submit`, joined with the session's extra-nonce prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Worker name
    pub worker: String,
    /// Job the miner worked on
    pub job_id: JobId,
    /// Block time, 8 hex chars
    pub time: String,
    /// Session extra-nonce prefix, hex
    pub extranonce1: String,
    /// Miner extra-nonce part, hex
    pub extranonce2: String,
    /// Size-prefixed Equihash solution, hex
    pub solution: String,
}

impl Submission {
    /// Full nonce: extranonce1 followed by extranonce2
    pub fn nonce_hex(&self) -> String {
        format!("{}{}", self.extranonce1, self.extranonce2)
    }
}

/// Submission field with a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeField {
    /// Block time
    Time,
    /// Combined nonce
    Nonce,
    /// Solution
    Solution,
}

/// Why a share was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A field has the wrong length
    InvalidSize(SizeField),
    /// Nonce or solution is not hex
    InvalidEncoding,
    /// No work has been installed yet
    NoActiveWork,
    /// Job is not the current one
    Stale,
    /// Header does not meet the share target
    BelowTarget,
    /// Same job and nonce seen before
    Duplicate,
    /// Block candidate refused by the node
    RejectedByNode,
}

/// Kind of accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    /// Meets the share target only
    Share,
    /// Meets the network target and the node accepted the block
    Block,
}

/// Failure outside the miner's control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareFailure {
    /// Block submission transport failed
    SubmitFailed(String),
    /// Share storage lookup failed
    Storage(String),
}

/// Classification of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Share or block accepted
    Accepted(ShareKind),
    /// Share rejected
    Rejected(RejectReason),
    /// Share could not be classified
    Error(ShareFailure),
}

impl ShareOutcome {
    /// Whether the share was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, ShareOutcome::Accepted(_))
    }
}

impl fmt::Display for SizeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeField::Time => write!(f, "nTime"),
            SizeField::Nonce => write!(f, "nOnce"),
            SizeField::Solution => write!(f, "solution"),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidSize(field) => write!(f, "Incorrect size of {}", field),
            RejectReason::InvalidEncoding => write!(f, "Malformed nonce or solution"),
            RejectReason::NoActiveWork => write!(f, "No active job"),
            RejectReason::Stale => write!(f, "Job not found"),
            RejectReason::BelowTarget => write!(f, "Low difficulty share"),
            RejectReason::Duplicate => write!(f, "Duplicate share"),
            RejectReason::RejectedByNode => write!(f, "Block rejected"),
        }
    }
}

impl fmt::Display for ShareFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareFailure::SubmitFailed(e) => write!(f, "Block submission failed: {}", e),
            ShareFailure::Storage(e) => write!(f, "Share storage unavailable: {}", e),
        }
    }
}

/// Validates submissions against the current work
pub struct SharePipeline {
    registry: Arc<WorkRegistry>,
    refresher: Arc<WorkRefresher>,
    rpc: Arc<dyn UpstreamRpc>,
    store: Arc<dyn ShareStore>,
    pow: Arc<dyn ProofOfWork>,
    share_difficulty: i64,
    share_target: Target,
    block_claims: DashSet<(JobId, String)>,
}

impl SharePipeline {
    /// Create a pipeline; the share target is derived once from
    /// `share_difficulty` and the network's proof-of-work limit
    pub fn new(
        refresher: Arc<WorkRefresher>,
        rpc: Arc<dyn UpstreamRpc>,
        store: Arc<dyn ShareStore>,
        pow: Arc<dyn ProofOfWork>,
        share_difficulty: i64,
        network: Network,
    ) -> Result<Self> {
        let share_target = target_from_difficulty(share_difficulty, &network.pow_limit())?;

        Ok(Self {
            registry: Arc::clone(refresher.registry()),
            refresher,
            rpc,
            store,
            pow,
            share_difficulty,
            share_target,
            block_claims: DashSet::new(),
        })
    }

    /// Share difficulty credited per accepted share
    pub fn share_difficulty(&self) -> i64 {
        self.share_difficulty
    }

    /// Target a header must meet to count as a share
    pub fn share_target(&self) -> &Target {
        &self.share_target
    }

    /// Classify one submission
    pub async fn process(&self, submission: &Submission) -> ShareOutcome {
        let submitted_nonce = submission.nonce_hex();
        if let Some(field) = size_violation(submission, &submitted_nonce) {
            return ShareOutcome::Rejected(RejectReason::InvalidSize(field));
        }

        // one snapshot per submission; a concurrent replace does not affect it
        let work = match self.registry.current() {
            Some(work) => work,
            None => return ShareOutcome::Rejected(RejectReason::NoActiveWork),
        };

        if submission.job_id != work.job_id {
            debug!(worker = %submission.worker, job_id = %submission.job_id, "Stale share");
            return ShareOutcome::Rejected(RejectReason::Stale);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        let mut solution = [0u8; SOLUTION_SIZE];
        if hex::decode_to_slice(&submitted_nonce, &mut nonce).is_err()
            || hex::decode_to_slice(&submission.solution, &mut solution).is_err()
        {
            return ShareOutcome::Rejected(RejectReason::InvalidEncoding);
        }

        // duplicates are keyed on the bytes, whatever case the miner sent
        let nonce_hex = bytes_to_hex(&nonce);
        let header = work.build_header(&nonce, &solution);

        if !self.pow.satisfies(&header, &self.share_target) {
            return ShareOutcome::Rejected(RejectReason::BelowTarget);
        }

        match self.store.has_share(&work.job_id, &nonce_hex).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(worker = %submission.worker, "Duplicate share");
                return ShareOutcome::Rejected(RejectReason::Duplicate);
            }
            Err(e) => {
                error!(worker = %submission.worker, "Share lookup failed: {}", e);
                return ShareOutcome::Error(ShareFailure::Storage(e.to_string()));
            }
        }

        let record = ShareRecord {
            worker: submission.worker.clone(),
            job_id: work.job_id.clone(),
            nonce: nonce_hex,
            difficulty: self.share_difficulty,
            height: work.height,
            timestamp: Utc::now(),
        };

        if self.pow.satisfies(&header, &work.network_target) {
            if !self.claim_block(&work.job_id, &record.nonce) {
                debug!(worker = %record.worker, "Block candidate already being submitted");
                return ShareOutcome::Rejected(RejectReason::Duplicate);
            }
            return self.submit_block(&work, &header, record).await;
        }

        match self.store.record_share(&record).await {
            Ok(true) => ShareOutcome::Accepted(ShareKind::Share),
            Ok(false) => ShareOutcome::Rejected(RejectReason::Duplicate),
            Err(e) => {
                warn!(worker = %record.worker, "Failed to record share: {}", e);
                ShareOutcome::Accepted(ShareKind::Share)
            }
        }
    }

    /// Reserve a block candidate so it reaches the node at most once.
    /// Claims for other jobs are dropped.
    fn claim_block(&self, job_id: &JobId, nonce: &str) -> bool {
        self.block_claims.retain(|(claimed, _)| claimed == job_id);
        self.block_claims.insert((job_id.clone(), nonce.to_string()))
    }

    async fn submit_block(&self, work: &Work, header: &[u8], record: ShareRecord) -> ShareOutcome {
        let hash = bytes_to_hex(&reversed(&double_hash(header)));
        let block = work.serialize_block(header);

        match self.rpc.submit_block(&block).await {
            Err(e) => {
                error!(
                    upstream = %self.rpc.name(),
                    height = work.height,
                    job_id = %work.job_id,
                    worker = %record.worker,
                    header = %bytes_to_hex(header),
                    "Block submission failure: {}",
                    e
                );
                if let Err(e) = self.store.record_share(&record).await {
                    warn!(worker = %record.worker, "Failed to record share: {}", e);
                }
                ShareOutcome::Error(ShareFailure::SubmitFailed(e.to_string()))
            }
            Ok(false) => {
                warn!(
                    upstream = %self.rpc.name(),
                    height = work.height,
                    %hash,
                    "Block rejected"
                );
                ShareOutcome::Rejected(RejectReason::RejectedByNode)
            }
            Ok(true) => {
                if let Err(e) = self.refresher.refresh().await {
                    warn!("Refresh after found block failed: {}", e);
                }

                let height = record.height;
                let worker = record.worker.clone();
                let block = BlockRecord {
                    share: record,
                    network_difficulty: work.network_difficulty.to_string(),
                    hash,
                };
                match self.store.record_block(&block).await {
                    Ok(()) => info!(height, "Inserted block to backend"),
                    Err(e) => warn!(height, "Failed to insert block candidate into backend: {}", e),
                }

                info!(%worker, height, hash = %block.hash, "Block found");
                ShareOutcome::Accepted(ShareKind::Block)
            }
        }
    }
}

/// First field whose length is wrong, in check order
fn size_violation(submission: &Submission, nonce_hex: &str) -> Option<SizeField> {
    if submission.time.len() != TIME_HEX_LEN {
        Some(SizeField::Time)
    } else if nonce_hex.len() != NONCE_HEX_LEN {
        Some(SizeField::Nonce)
    } else if submission.solution.len() != SOLUTION_HEX_LEN {
        Some(SizeField::Solution)
    } else {
        None
    }
}
