//! Difficulty and target conversions
//!
//! All arithmetic runs on arbitrary precision integers. Division truncates
//! toward zero, and that rounding is part of the protocol: pools and miners
//! must derive the same share target from the same difficulty.

use super::Target;
use crate::error::{Error, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network whose proof-of-work ceiling applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Main network, ceiling `2^243 - 1`
    Main,
    /// Test network, ceiling `2^251 - 1`
    #[default]
    Test,
}

impl Network {
    /// Proof-of-work limit (easiest allowed target) for this network
    pub fn pow_limit(&self) -> BigUint {
        let bits = match self {
            Network::Main => 243,
            Network::Test => 251,
        };
        (BigUint::one() << bits) - BigUint::one()
    }

    /// Name used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(Error::config(format!("Unknown network: {}", other))),
        }
    }
}

/// `2^256`, the numerator of the target-to-difficulty conversion
fn pow256() -> BigUint {
    BigUint::one() << 256
}

/// Share target for a pool difficulty: `pow_limit / difficulty`
pub fn target_from_difficulty(difficulty: i64, pow_limit: &BigUint) -> Result<Target> {
    if difficulty <= 0 {
        return Err(Error::invalid_difficulty(format!(
            "Difficulty must be positive, got {}",
            difficulty
        )));
    }

    let quotient = pow_limit / BigUint::from(difficulty as u64);
    Target::from_biguint(&quotient)
}

/// Hex form of [`target_from_difficulty`], as sent in `mining.set_target`
pub fn target_hex(difficulty: i64, pow_limit: &BigUint) -> Result<String> {
    Ok(target_from_difficulty(difficulty, pow_limit)?.to_hex())
}

/// Network difficulty for a hex target: `2^256 / target`.
///
/// An optional `0x` prefix is accepted. A zero target is rejected rather
/// than dividing by zero.
pub fn difficulty_from_target_hex(target_hex: &str) -> Result<BigUint> {
    let cleaned = target_hex
        .strip_prefix("0x")
        .or_else(|| target_hex.strip_prefix("0X"))
        .unwrap_or(target_hex);

    let bytes = hex::decode(cleaned)
        .map_err(|e| Error::invalid_encoding(format!("Invalid target hex: {}", e)))?;

    let target = BigUint::from_bytes_be(&bytes);
    if target.is_zero() {
        return Err(Error::invalid_target("Target is zero"));
    }

    Ok(pow256() / target)
}

/// Decode a compact ("bits") difficulty encoding into a full target
pub fn target_from_compact(bits: u32) -> Result<Target> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;

    if mantissa != 0 && bits & 0x0080_0000 != 0 {
        return Err(Error::invalid_target(format!(
            "Negative compact target {:08x}",
            bits
        )));
    }

    let value = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3)) as usize
    };

    Target::from_biguint(&value)
        .map_err(|_| Error::invalid_target(format!("Compact target {:08x} overflows", bits)))
}
