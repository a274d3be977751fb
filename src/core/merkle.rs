//! Merkle root computation over transaction hashes

use super::codec::double_hash;

/// Folds an ordered list of 32-byte leaves into a single root.
///
/// Implementations must be deterministic and sensitive to leaf order.
pub trait MerkleRoot: Send + Sync {
    /// Compute the root of `leaves`
    fn compute_root(&self, leaves: &[[u8; 32]]) -> [u8; 32];
}

/// Bitcoin-style SHA-256d Merkle tree.
///
/// Leaves and root are in the byte order RPC displays them (big-endian). Each
/// level pairs adjacent nodes, duplicating the last one when the count is
/// odd. An empty list yields the zero hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256dMerkle;

impl MerkleRoot for Sha256dMerkle {
    fn compute_root(&self, leaves: &[[u8; 32]]) -> [u8; 32] {
        if leaves.is_empty() {
            return [0u8; 32];
        }

        // Hash in internal (little-endian) order
        let mut level: Vec<[u8; 32]> = leaves
            .iter()
            .map(|leaf| {
                let mut node = *leaf;
                node.reverse();
                node
            })
            .collect();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                let last = level[level.len() - 1];
                level.push(last);
            }

            level = level
                .chunks(2)
                .map(|pair| {
                    let mut concat = [0u8; 64];
                    concat[..32].copy_from_slice(&pair[0]);
                    concat[32..].copy_from_slice(&pair[1]);
                    double_hash(&concat)
                })
                .collect();
        }

        let mut root = level[0];
        root.reverse();
        root
    }
}
