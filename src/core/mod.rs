//! Core types and primitives for the proxy
//!
//! Byte codecs, targets and difficulty math, Merkle roots, block templates,
//! and the immutable `Work` a share is validated against.

pub mod codec;
pub mod difficulty;
mod job;
pub mod merkle;
pub mod pow;
mod target;
mod template;
mod work;

pub use difficulty::Network;
pub use job::{JobId, JobParams};
pub use merkle::{MerkleRoot, Sha256dMerkle};
pub use pow::{DoubleSha256Pow, ProofOfWork};
pub use target::Target;
pub use template::{BlockTemplate, CoinbaseTransaction, TemplateTransaction};
pub use work::{Work, WorkParts};

/// Constants for the header layout and share submissions
pub mod constants {
    pub use super::work::{
        BITS_OFFSET, HEADER_SIZE, MERKLE_ROOT_OFFSET, NONCE_OFFSET, NONCE_SIZE, PREV_HASH_OFFSET,
        RESERVED_OFFSET, SOLUTION_OFFSET, SOLUTION_SIZE, TIME_OFFSET, VERSION_OFFSET,
    };

    /// Size of a hash in bytes
    pub const HASH_SIZE: usize = 32;

    /// Hex length of the submitted time field
    pub const TIME_HEX_LEN: usize = 8;

    /// Hex length of extranonce1 followed by extranonce2
    pub const NONCE_HEX_LEN: usize = NONCE_SIZE * 2;

    /// Hex length of the submitted solution, size prefix included
    pub const SOLUTION_HEX_LEN: usize = SOLUTION_SIZE * 2;
}

#[cfg(test)]
mod tests {
    use super::constants::*;

    #[test]
    fn test_constants() {
        assert_eq!(HEADER_SIZE, 1487);
        assert_eq!(NONCE_OFFSET, 108);
        assert_eq!(TIME_HEX_LEN, 8);
        assert_eq!(NONCE_HEX_LEN, 64);
        assert_eq!(SOLUTION_HEX_LEN, 2694);
    }
}
