//! Turns upstream block templates into `Work`

use crate::core::codec::{bytes_to_hex, hex_to_bytes, reverse_hex};
use crate::core::difficulty::{difficulty_from_target_hex, target_from_compact};
use crate::core::{BlockTemplate, JobId, MerkleRoot, Target, Work, WorkParts};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Result of feeding a template to the builder
#[derive(Debug)]
pub enum BuildOutcome {
    /// Template builds on the same block as the current work
    NoChange,
    /// Fresh work for a new previous block
    Built(Work),
}

/// Builds `Work` from templates, assigning job IDs from a per-builder counter
pub struct WorkBuilder {
    merkle: Arc<dyn MerkleRoot>,
    job_counter: AtomicU64,
}

impl WorkBuilder {
    /// Create a new builder around a Merkle implementation
    pub fn new(merkle: Arc<dyn MerkleRoot>) -> Self {
        Self {
            merkle,
            job_counter: AtomicU64::new(0),
        }
    }

    /// Generate next job ID
    fn next_job_id(&self) -> JobId {
        let id = self.job_counter.fetch_add(1, Ordering::Relaxed);
        JobId::new(id)
    }

    /// Build work from `template`, or report that `previous` is still current.
    ///
    /// A job ID is only consumed when the build succeeds.
    pub fn build(&self, template: &BlockTemplate, previous: Option<&Work>) -> Result<BuildOutcome> {
        if let Some(previous) = previous {
            // the stored hash is byte-reversed; compare in that order
            let incoming = reverse_hex(&template.previous_block_hash)
                .map_err(|e| Error::malformed_template(format!("previousblockhash: {}", e)))?;
            if incoming.eq_ignore_ascii_case(&bytes_to_hex(&previous.prev_hash_reversed)) {
                return Ok(BuildOutcome::NoChange);
            }
        }

        let prev_hash_reversed = decode_hash("previousblockhash", &template.previous_block_hash, true)?;

        let mut leaves = Vec::with_capacity(template.transactions.len() + 1);
        leaves.push(decode_hash("coinbasetxn.hash", &template.coinbase_txn.hash, false)?);
        for (index, tx) in template.transactions.iter().enumerate() {
            leaves.push(decode_hash(&format!("transactions[{}].hash", index), &tx.hash, false)?);
        }

        let mut merkle_root_reversed = self.merkle.compute_root(&leaves);
        merkle_root_reversed.reverse();

        let bits = decode_bits(&template.bits)?;
        let network_target = match &template.target {
            Some(target) => Target::from_hex(target).map_err(|e| {
                Error::malformed_template(format!("target {}: {}", target, e))
            })?,
            None => target_from_compact(u32::from_be_bytes(bits)).map_err(|e| {
                Error::malformed_template(format!("bits {}: {}", template.bits, e))
            })?,
        };
        let network_difficulty = difficulty_from_target_hex(&network_target.to_hex())
            .map_err(|e| Error::malformed_template(format!("network target: {}", e)))?;

        let mut transactions = Vec::with_capacity(template.transactions.len() + 1);
        transactions.push(decode_data("coinbasetxn.data", &template.coinbase_txn.data)?);
        for (index, tx) in template.transactions.iter().enumerate() {
            transactions.push(decode_data(&format!("transactions[{}].data", index), &tx.data)?);
        }

        let mut bits_reversed = bits;
        bits_reversed.reverse();

        let work = Work::new(WorkParts {
            job_id: self.next_job_id(),
            version: template.version,
            prev_hash_reversed,
            merkle_root_reversed,
            reserved: [0u8; 32],
            time: template.cur_time.to_le_bytes(),
            bits: bits_reversed,
            clean_jobs: true,
            height: template.height,
            network_target,
            network_difficulty,
            transactions,
        });

        debug!(
            job_id = %work.job_id,
            height = work.height,
            transactions = template.transactions.len(),
            "Built work from template"
        );

        Ok(BuildOutcome::Built(work))
    }
}

/// Decode a hash field to its first 32 bytes, optionally reversed
fn decode_hash(field: &str, hex_str: &str, reverse: bool) -> Result<[u8; 32]> {
    let bytes = hex_to_bytes(hex_str)
        .map_err(|e| Error::malformed_template(format!("{}: {}", field, e)))?;

    if bytes.len() < 32 {
        return Err(Error::malformed_template(format!(
            "{}: expected at least 32 bytes, got {}",
            field,
            bytes.len()
        )));
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes[..32]);
    if reverse {
        hash.reverse();
    }
    Ok(hash)
}

fn decode_data(field: &str, hex_str: &str) -> Result<Vec<u8>> {
    hex_to_bytes(hex_str).map_err(|e| Error::malformed_template(format!("{}: {}", field, e)))
}

/// Compact bits as four big-endian bytes
fn decode_bits(bits_hex: &str) -> Result<[u8; 4]> {
    let bytes = hex_to_bytes(bits_hex)
        .map_err(|e| Error::malformed_template(format!("bits: {}", e)))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        Error::malformed_template(format!("bits: expected 4 bytes, got {}", bytes.len()))
    })
}
