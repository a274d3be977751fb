//! Per-IP invalid share policy

use dashmap::DashMap;
use std::net::IpAddr;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
struct IpStats {
    valid: u64,
    invalid: u32,
    banned: bool,
}

/// Bans addresses that send too many invalid shares in a row
#[derive(Debug)]
pub struct SharePolicy {
    max_fails: u32,
    stats: DashMap<IpAddr, IpStats>,
}

impl SharePolicy {
    /// Create a policy allowing `max_fails` consecutive invalid shares
    pub fn new(max_fails: u32) -> Self {
        Self {
            max_fails,
            stats: DashMap::new(),
        }
    }

    /// Account a share from `ip`. Returns `false` once the address is banned.
    pub fn apply(&self, ip: IpAddr, valid: bool) -> bool {
        let mut stats = self.stats.entry(ip).or_default();
        if stats.banned {
            return false;
        }

        if valid {
            stats.valid += 1;
            stats.invalid = 0;
            return true;
        }

        stats.invalid += 1;
        if stats.invalid > self.max_fails {
            stats.banned = true;
            warn!(%ip, invalid = stats.invalid, valid = stats.valid, "Banning address for invalid shares");
            return false;
        }
        true
    }

    /// Whether `ip` is banned
    pub fn is_banned(&self, ip: &IpAddr) -> bool {
        self.stats.get(ip).map(|stats| stats.banned).unwrap_or(false)
    }

    /// Lift a ban and reset counters for `ip`
    pub fn unban(&self, ip: &IpAddr) {
        self.stats.remove(ip);
    }
}
