//! Proof-of-work check applied to reconstructed headers

use super::codec::double_hash;
use super::Target;

/// Decides whether a complete header satisfies a target.
///
/// The same check runs twice per share: once against the pool share target
/// and once against the network target.
pub trait ProofOfWork: Send + Sync {
    /// Whether `header` meets `target`
    fn satisfies(&self, header: &[u8], target: &Target) -> bool;
}

/// SHA-256d of the whole header, read as a little-endian integer.
///
/// This does not verify the Equihash solution itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleSha256Pow;

impl ProofOfWork for DoubleSha256Pow {
    fn satisfies(&self, header: &[u8], target: &Target) -> bool {
        target.is_met_by(&double_hash(header))
    }
}
