//! Serialized fetch, build and install cycles

use crate::builder::{BuildOutcome, WorkBuilder};
use crate::core::JobId;
use crate::error::{Error, Result};
use crate::protocol::UpstreamRpc;
use crate::registry::WorkRegistry;
use crate::storage::ShareStore;
use crate::utils::format_difficulty;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Result of one refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The current work still builds on the latest block
    Unchanged,
    /// New work was installed
    Installed(JobId),
    /// The template could not be turned into work; the registry is untouched
    Skipped,
}

/// Runs refresh cycles one at a time
pub struct WorkRefresher {
    rpc: Arc<dyn UpstreamRpc>,
    builder: WorkBuilder,
    registry: Arc<WorkRegistry>,
    store: Option<Arc<dyn ShareStore>>,
    refresh_lock: Mutex<()>,
}

impl WorkRefresher {
    /// Create a new refresher
    pub fn new(rpc: Arc<dyn UpstreamRpc>, builder: WorkBuilder, registry: Arc<WorkRegistry>) -> Self {
        Self {
            rpc,
            builder,
            registry,
            store: None,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Prune `store`'s duplicate index whenever new work is installed
    pub fn with_share_store(mut self, store: Arc<dyn ShareStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registry this refresher installs into
    pub fn registry(&self) -> &Arc<WorkRegistry> {
        &self.registry
    }

    /// Fetch a template and install new work if the previous block changed.
    ///
    /// Fetch errors are returned with the registry untouched. Templates that
    /// fail to build are logged and skipped.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;

        let template = self.rpc.get_block_template().await.map_err(|e| {
            error!(upstream = %self.rpc.name(), "Error while refreshing block template: {}", e);
            e
        })?;

        let current = self.registry.current();
        match self.builder.build(&template, current.as_deref()) {
            Ok(BuildOutcome::NoChange) => {
                debug!(height = template.height, "Block template unchanged");
                Ok(RefreshOutcome::Unchanged)
            }
            Ok(BuildOutcome::Built(work)) => {
                info!(
                    upstream = %self.rpc.name(),
                    height = work.height,
                    prev_hash = %work.previous_block_hash(),
                    difficulty = %format_difficulty(&work.network_difficulty),
                    "New block to mine"
                );
                let work = self.registry.replace(work);
                self.prune_shares(&work.job_id).await;
                Ok(RefreshOutcome::Installed(work.job_id.clone()))
            }
            Err(e @ Error::MalformedTemplate { .. }) => {
                warn!(upstream = %self.rpc.name(), "Skipping block template: {}", e);
                Ok(RefreshOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Shares for replaced jobs can only be stale from now on
    async fn prune_shares(&self, current: &JobId) {
        let Some(store) = &self.store else {
            return;
        };
        match store.prune(current).await {
            Ok(0) => {}
            Ok(pruned) => debug!(job_id = %current, pruned, "Pruned shares of replaced jobs"),
            Err(e) => warn!(job_id = %current, "Failed to prune shares: {}", e),
        }
    }
}
