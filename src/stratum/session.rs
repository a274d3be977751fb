//! Stratum session state and extra-nonce allocation

use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

/// Bits of the extra-nonce counter owned by one instance
const INSTANCE_SHIFT: u32 = 27;

/// Session ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out per-session extra-nonce prefixes.
///
/// The top five bits carry the instance id so several proxies behind one
/// pool never hand out the same prefix.
#[derive(Debug)]
pub struct ExtraNonceAllocator {
    seed: u32,
    counter: AtomicU32,
}

impl ExtraNonceAllocator {
    /// Create an allocator for `instance_id` (0..=31)
    pub fn new(instance_id: u32) -> Self {
        Self {
            seed: instance_id << INSTANCE_SHIFT,
            counter: AtomicU32::new(0),
        }
    }

    /// Next prefix as 8 hex chars
    pub fn next(&self) -> String {
        let mask = (1u32 << INSTANCE_SHIFT) - 1;
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & mask;
        format!("{:08x}", self.seed | n)
    }
}

/// One connected miner
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID
    pub id: SessionId,
    /// Remote address
    pub ip: IpAddr,
    /// Login from `mining.authorize`
    pub login: Option<String>,
    /// Extra-nonce prefix assigned at subscribe
    pub extranonce1: Option<String>,
}

impl Session {
    /// Create a session for a new connection
    pub fn new(ip: IpAddr) -> Self {
        Self {
            id: SessionId::new(),
            ip,
            login: None,
            extranonce1: None,
        }
    }

    /// Assign an extra-nonce prefix; returns it
    pub fn subscribe(&mut self, allocator: &ExtraNonceAllocator) -> &str {
        self.extranonce1.get_or_insert_with(|| allocator.next())
    }

    /// Record the authorized login
    pub fn authorize(&mut self, login: impl Into<String>) {
        self.login = Some(login.into());
    }

    /// Whether `mining.subscribe` completed
    pub fn is_subscribed(&self) -> bool {
        self.extranonce1.is_some()
    }

    /// Whether `mining.authorize` completed
    pub fn is_authorized(&self) -> bool {
        self.login.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    #[test]
    fn test_allocator_seeds_instance() {
        let allocator = ExtraNonceAllocator::new(1);
        assert_eq!(allocator.next(), "08000001");
        assert_eq!(allocator.next(), "08000002");

        let zero = ExtraNonceAllocator::new(0);
        assert_eq!(zero.next(), "00000001");

        let last = ExtraNonceAllocator::new(31);
        assert_eq!(last.next(), "f8000001");
    }

    #[test]
    fn test_allocator_unique_across_threads() {
        let allocator = std::sync::Arc::new(ExtraNonceAllocator::new(2));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = std::sync::Arc::clone(&allocator);
                std::thread::spawn(move || (0..250).map(|_| allocator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for prefix in handle.join().unwrap() {
                assert_eq!(prefix.len(), 8);
                assert!(seen.insert(prefix));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_session_lifecycle() {
        let allocator = ExtraNonceAllocator::new(0);
        let mut session = Session::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(!session.is_subscribed());
        assert!(!session.is_authorized());

        let first = session.subscribe(&allocator).to_string();
        // resubscribing keeps the prefix
        assert_eq!(session.subscribe(&allocator), first);

        session.authorize("t1address.rig1");
        assert!(session.is_authorized());
        assert_ne!(session.id, Session::new(session.ip).id);
    }
}
