//! Immutable unit of work derived from one block template

use super::codec::{bytes_to_hex, compact_size, reversed};
use super::job::{JobId, JobParams};
use super::Target;
use num_bigint::BigUint;

/// Serialized header size: 140 fixed bytes, 3-byte size prefix, 1344-byte solution
pub const HEADER_SIZE: usize = 1487;

/// Offset of the packed version
pub const VERSION_OFFSET: usize = 0;
/// Offset of the reversed previous block hash
pub const PREV_HASH_OFFSET: usize = 4;
/// Offset of the reversed Merkle root
pub const MERKLE_ROOT_OFFSET: usize = 36;
/// Offset of the reserved field
pub const RESERVED_OFFSET: usize = 68;
/// Offset of the packed time
pub const TIME_OFFSET: usize = 100;
/// Offset of the reversed compact bits
pub const BITS_OFFSET: usize = 104;
/// Offset of the 32-byte nonce
pub const NONCE_OFFSET: usize = 108;
/// Offset of the solution, including its 3-byte size prefix
pub const SOLUTION_OFFSET: usize = 140;

/// Nonce length in bytes
pub const NONCE_SIZE: usize = 32;
/// Solution length in bytes, size prefix included
pub const SOLUTION_SIZE: usize = HEADER_SIZE - SOLUTION_OFFSET;

/// Everything needed to assemble a [`Work`]
#[derive(Debug, Clone)]
pub struct WorkParts {
    /// Job identifier
    pub job_id: JobId,
    /// Block version
    pub version: u32,
    /// Previous block hash, already reversed
    pub prev_hash_reversed: [u8; 32],
    /// Merkle root, already reversed
    pub merkle_root_reversed: [u8; 32],
    /// Reserved field
    pub reserved: [u8; 32],
    /// Block time, little-endian packed
    pub time: [u8; 4],
    /// Compact bits, reversed
    pub bits: [u8; 4],
    /// Whether miners must drop earlier jobs
    pub clean_jobs: bool,
    /// Block height
    pub height: u64,
    /// Network target a header must meet to be a block
    pub network_target: Target,
    /// Network difficulty, for logging
    pub network_difficulty: BigUint,
    /// Raw transactions in block order, coinbase first
    pub transactions: Vec<Vec<u8>>,
}

/// One job. Never mutated after construction; shared as `Arc<Work>`.
#[derive(Debug, Clone)]
pub struct Work {
    /// Job identifier
    pub job_id: JobId,
    /// Block version
    pub version: u32,
    /// Previous block hash, reversed
    pub prev_hash_reversed: [u8; 32],
    /// Merkle root, reversed
    pub merkle_root_reversed: [u8; 32],
    /// Reserved field
    pub reserved: [u8; 32],
    /// Block time, little-endian packed
    pub time: [u8; 4],
    /// Compact bits, reversed
    pub bits: [u8; 4],
    /// Whether miners must drop earlier jobs
    pub clean_jobs: bool,
    /// Block height
    pub height: u64,
    /// Network target
    pub network_target: Target,
    /// Network difficulty
    pub network_difficulty: BigUint,
    transactions: Vec<Vec<u8>>,
    header: Vec<u8>,
}

impl Work {
    /// Assemble a work unit and its header prefix
    pub fn new(parts: WorkParts) -> Self {
        let mut header = vec![0u8; HEADER_SIZE];
        header[VERSION_OFFSET..PREV_HASH_OFFSET].copy_from_slice(&parts.version.to_le_bytes());
        header[PREV_HASH_OFFSET..MERKLE_ROOT_OFFSET].copy_from_slice(&parts.prev_hash_reversed);
        header[MERKLE_ROOT_OFFSET..RESERVED_OFFSET].copy_from_slice(&parts.merkle_root_reversed);
        header[RESERVED_OFFSET..TIME_OFFSET].copy_from_slice(&parts.reserved);
        header[TIME_OFFSET..BITS_OFFSET].copy_from_slice(&parts.time);
        header[BITS_OFFSET..NONCE_OFFSET].copy_from_slice(&parts.bits);

        Self {
            job_id: parts.job_id,
            version: parts.version,
            prev_hash_reversed: parts.prev_hash_reversed,
            merkle_root_reversed: parts.merkle_root_reversed,
            reserved: parts.reserved,
            time: parts.time,
            bits: parts.bits,
            clean_jobs: parts.clean_jobs,
            height: parts.height,
            network_target: parts.network_target,
            network_difficulty: parts.network_difficulty,
            transactions: parts.transactions,
            header,
        }
    }

    /// Header with everything up to the nonce filled in
    pub fn header_prefix(&self) -> &[u8] {
        &self.header[..NONCE_OFFSET]
    }

    /// Previous block hash in display order
    pub fn previous_block_hash(&self) -> String {
        bytes_to_hex(&reversed(&self.prev_hash_reversed))
    }

    /// Raw transactions in block order, coinbase first
    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    /// Complete a header with a miner's nonce and encoded solution
    pub fn build_header(&self, nonce: &[u8; NONCE_SIZE], solution: &[u8; SOLUTION_SIZE]) -> Vec<u8> {
        let mut header = self.header.clone();
        header[NONCE_OFFSET..SOLUTION_OFFSET].copy_from_slice(nonce);
        header[SOLUTION_OFFSET..].copy_from_slice(solution);
        header
    }

    /// Serialize a full block: header, transaction count, transactions
    pub fn serialize_block(&self, header: &[u8]) -> Vec<u8> {
        let body_len: usize = self.transactions.iter().map(Vec::len).sum();
        let mut block = Vec::with_capacity(header.len() + 9 + body_len);
        block.extend_from_slice(header);
        block.extend_from_slice(&compact_size(self.transactions.len() as u64));
        for tx in &self.transactions {
            block.extend_from_slice(tx);
        }
        block
    }

    /// Job parameters for `mining.notify`
    pub fn job_params(&self) -> JobParams {
        JobParams {
            job_id: self.job_id.clone(),
            version: bytes_to_hex(&self.version.to_le_bytes()),
            prev_hash: bytes_to_hex(&self.prev_hash_reversed),
            merkle_root: bytes_to_hex(&self.merkle_root_reversed),
            reserved: bytes_to_hex(&self.reserved),
            time: bytes_to_hex(&self.time),
            bits: bytes_to_hex(&self.bits),
            clean_jobs: self.clean_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_work() -> Work {
        Work::new(WorkParts {
            job_id: JobId::new(1),
            version: 4,
            prev_hash_reversed: [0x11; 32],
            merkle_root_reversed: [0x22; 32],
            reserved: [0u8; 32],
            time: 100u32.to_le_bytes(),
            bits: [0xff, 0xff, 0x07, 0x1f],
            clean_jobs: true,
            height: 7,
            network_target: Target::MAX,
            network_difficulty: BigUint::from(1u8),
            transactions: vec![vec![0xc0, 0xc0], vec![0xaa]],
        })
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(SOLUTION_OFFSET, NONCE_OFFSET + NONCE_SIZE);
        assert_eq!(SOLUTION_SIZE, 3 + 1344);
        assert_eq!(HEADER_SIZE, 4 + 32 + 32 + 32 + 4 + 4 + 32 + 3 + 1344);
    }

    #[test]
    fn test_header_prefix_layout() {
        let work = sample_work();
        let prefix = work.header_prefix();
        assert_eq!(prefix.len(), 108);
        assert_eq!(&prefix[0..4], &[4, 0, 0, 0]);
        assert_eq!(&prefix[4..36], &[0x11; 32]);
        assert_eq!(&prefix[36..68], &[0x22; 32]);
        assert_eq!(&prefix[68..100], &[0u8; 32]);
        assert_eq!(&prefix[100..104], &[100, 0, 0, 0]);
        assert_eq!(&prefix[104..108], &[0xff, 0xff, 0x07, 0x1f]);
    }

    #[test]
    fn test_build_header() {
        let work = sample_work();
        let nonce = [0x33; NONCE_SIZE];
        let solution = [0x44; SOLUTION_SIZE];
        let header = work.build_header(&nonce, &solution);

        assert_eq!(header.len(), HEADER_SIZE);
        assert_eq!(&header[..NONCE_OFFSET], work.header_prefix());
        assert_eq!(&header[NONCE_OFFSET..SOLUTION_OFFSET], &nonce);
        assert_eq!(&header[SOLUTION_OFFSET..], &solution[..]);
    }

    #[test]
    fn test_serialize_block() {
        let work = sample_work();
        let header = vec![0x55; HEADER_SIZE];
        let block = work.serialize_block(&header);

        assert_eq!(block.len(), HEADER_SIZE + 1 + 3);
        assert_eq!(block[HEADER_SIZE], 2);
        assert_eq!(&block[HEADER_SIZE + 1..], &[0xc0, 0xc0, 0xaa]);
    }

    #[test]
    fn test_job_params_match_header() {
        let work = sample_work();
        let params = work.job_params();
        assert_eq!(params.job_id.as_str(), "1");
        assert_eq!(params.version, "04000000");
        assert_eq!(params.prev_hash, "11".repeat(32));
        assert_eq!(params.time, "64000000");
        assert_eq!(params.bits, "ffff071f");
        assert!(params.clean_jobs);
        assert_eq!(work.previous_block_hash(), "11".repeat(32));
    }
}
