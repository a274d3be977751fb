//! Single-slot holder of the current work

use crate::core::{JobParams, Work};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the job broadcast channel
const BROADCAST_CAPACITY: usize = 16;

/// Holds the live `Work` and announces replacements.
///
/// The lock only guards the pointer read or swap. Readers get an `Arc`
/// snapshot and keep using it after a replace.
pub struct WorkRegistry {
    current: RwLock<Option<Arc<Work>>>,
    jobs: broadcast::Sender<JobParams>,
    broadcast_enabled: bool,
}

impl WorkRegistry {
    /// Create an empty registry
    pub fn new(broadcast_enabled: bool) -> Self {
        let (jobs, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            current: RwLock::new(None),
            jobs,
            broadcast_enabled,
        }
    }

    /// Current work, if any has been installed
    pub fn current(&self) -> Option<Arc<Work>> {
        self.current.read().clone()
    }

    /// Install `work` and broadcast its job once the swap is visible
    pub fn replace(&self, work: Work) -> Arc<Work> {
        let work = Arc::new(work);
        let params = work.job_params();

        {
            let mut slot = self.current.write();
            *slot = Some(Arc::clone(&work));
        }

        info!(
            job_id = %work.job_id,
            height = work.height,
            network_difficulty = %work.network_difficulty,
            "New job installed"
        );

        if self.broadcast_enabled {
            // no receivers is fine: no session is connected yet
            if let Err(e) = self.jobs.send(params) {
                debug!("No job subscribers: {}", e);
            }
        }

        work
    }

    /// Subscribe to job broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<JobParams> {
        self.jobs.subscribe()
    }

    /// Whether replacements are broadcast
    pub fn broadcast_enabled(&self) -> bool {
        self.broadcast_enabled
    }
}

impl Default for WorkRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}
