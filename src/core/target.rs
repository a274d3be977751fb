//! Target type for share and block difficulty

use crate::error::{Error, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 256-bit target stored as 32 big-endian bytes.
///
/// Byte-wise ordering of the array is numeric ordering, so `Ord` can be
/// derived directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(pub [u8; 32]);

impl Target {
    /// Largest representable target
    pub const MAX: Target = Target([0xFF; 32]);

    /// Create a new Target from big-endian bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a Target from a 64-character hex string (big-endian)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::invalid_encoding(format!("Invalid target hex: {}", e)))?;

        if bytes.len() != 32 {
            return Err(Error::invalid_target(format!(
                "Expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    /// Build a target from an arbitrary precision integer, left-padding with
    /// zeros. Values wider than 256 bits are rejected.
    pub fn from_biguint(value: &BigUint) -> Result<Self> {
        if value.bits() > 256 {
            return Err(Error::invalid_target("Value exceeds 256 bits"));
        }

        let bytes = value.to_bytes_be();
        let mut array = [0u8; 32];
        array[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(array))
    }

    /// Convert to an arbitrary precision integer
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Get the target as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether the target is zero (nothing can meet it)
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Check a hash in internal byte order (little-endian, as produced by
    /// SHA-256d) against this target. A hash equal to the target meets it.
    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        for (hash_byte, target_byte) in hash.iter().rev().zip(self.0.iter()) {
            match hash_byte.cmp(target_byte) {
                std::cmp::Ordering::Less => return true,
                std::cmp::Ordering::Greater => return false,
                std::cmp::Ordering::Equal => continue,
            }
        }
        true
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_hex_conversion() {
        let hex = "0000000000000000000000000000000000000000000000000000000000000001";
        let target = Target::from_hex(hex).unwrap();
        assert_eq!(target.to_hex(), hex);
        assert_eq!(target.to_biguint(), BigUint::from(1u8));
    }

    #[test]
    fn test_invalid_target_hex() {
        assert!(matches!(
            Target::from_hex("invalid"),
            Err(Error::InvalidEncoding { .. })
        ));
        assert!(Target::from_hex("00").is_err());
        assert!(Target::from_hex(&"00".repeat(33)).is_err());
    }

    #[test]
    fn test_from_biguint_pads_high_bytes() {
        let target = Target::from_biguint(&BigUint::from(0x0102u32)).unwrap();
        assert_eq!(target.0[30], 0x01);
        assert_eq!(target.0[31], 0x02);
        assert!(target.0[..30].iter().all(|&b| b == 0));

        let too_big = BigUint::from(1u8) << 256;
        assert!(Target::from_biguint(&too_big).is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let small = Target::from_biguint(&BigUint::from(5u8)).unwrap();
        let large = Target::from_biguint(&(BigUint::from(1u8) << 200)).unwrap();
        assert!(small < large);
        assert!(large < Target::MAX);
    }

    #[test]
    fn test_is_met_by_little_endian_hash() {
        // target = 0x00ff00..00
        let mut target_bytes = [0u8; 32];
        target_bytes[1] = 0xFF;
        let target = Target::from_bytes(target_bytes);

        // hash value 1 (little-endian: lowest byte first)
        let mut low = [0u8; 32];
        low[0] = 1;
        assert!(target.is_met_by(&low));

        // hash value with top byte set
        let mut high = [0u8; 32];
        high[31] = 1;
        assert!(!target.is_met_by(&high));

        // equal value meets
        let mut equal = target_bytes;
        equal.reverse();
        assert!(target.is_met_by(&equal));
    }

    #[test]
    fn test_target_serde() {
        let hex = "0007ffff00000000000000000000000000000000000000000000000000000000";
        let target = Target::from_hex(hex).unwrap();

        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, format!("\"{}\"", hex));

        let deserialized: Target = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, target);
    }
}
