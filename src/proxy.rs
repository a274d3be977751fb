//! Proxy wiring and the template poll loop

use crate::builder::WorkBuilder;
use crate::config::Config;
use crate::core::difficulty::target_hex;
use crate::core::{DoubleSha256Pow, JobParams, Sha256dMerkle};
use crate::error::Result;
use crate::protocol::{JsonRpcClient, UpstreamRpc};
use crate::refresher::WorkRefresher;
use crate::registry::WorkRegistry;
use crate::share::SharePipeline;
use crate::storage::{InMemoryShareStore, ShareStore};
use crate::stratum::{ExtraNonceAllocator, SharePolicy, StratumNotification};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// All proxy components, wired from configuration
pub struct ProxyServer {
    refresher: Arc<WorkRefresher>,
    pipeline: Arc<SharePipeline>,
    policy: Arc<SharePolicy>,
    allocator: Arc<ExtraNonceAllocator>,
    refresh_interval: Duration,
    set_target: StratumNotification,
    shutdown: watch::Sender<bool>,
}

impl ProxyServer {
    /// Build the proxy against the primary configured upstream
    pub fn new(config: &Config) -> Result<Self> {
        let rpc = Arc::new(JsonRpcClient::new(config.primary_upstream()?)?);
        Self::with_components(config, rpc, Arc::new(InMemoryShareStore::new()))
    }

    /// Build the proxy with explicit upstream and storage
    pub fn with_components(
        config: &Config,
        rpc: Arc<dyn UpstreamRpc>,
        store: Arc<dyn ShareStore>,
    ) -> Result<Self> {
        let proxy = &config.proxy;
        let registry = Arc::new(WorkRegistry::new(proxy.stratum_enabled));
        let refresher = Arc::new(
            WorkRefresher::new(
                Arc::clone(&rpc),
                WorkBuilder::new(Arc::new(Sha256dMerkle)),
                registry,
            )
            .with_share_store(Arc::clone(&store)),
        );
        let pipeline = Arc::new(SharePipeline::new(
            Arc::clone(&refresher),
            rpc,
            store,
            Arc::new(DoubleSha256Pow),
            proxy.difficulty,
            proxy.network,
        )?);
        let set_target = StratumNotification::set_target(&target_hex(
            proxy.difficulty,
            &proxy.network.pow_limit(),
        )?);
        let (shutdown, _) = watch::channel(false);

        info!(
            network = %proxy.network,
            difficulty = proxy.difficulty,
            share_target = %pipeline.share_target(),
            "Proxy configured"
        );

        Ok(Self {
            refresher,
            pipeline,
            policy: Arc::new(SharePolicy::new(proxy.max_fails)),
            allocator: Arc::new(ExtraNonceAllocator::new(proxy.instance_id)),
            refresh_interval: proxy.refresh_interval()?,
            set_target,
            shutdown,
        })
    }

    /// Share pipeline for session handlers
    pub fn pipeline(&self) -> &Arc<SharePipeline> {
        &self.pipeline
    }

    /// Invalid share policy for session handlers
    pub fn policy(&self) -> &Arc<SharePolicy> {
        &self.policy
    }

    /// Extra-nonce allocator for new sessions
    pub fn allocator(&self) -> &Arc<ExtraNonceAllocator> {
        &self.allocator
    }

    /// Work refresher
    pub fn refresher(&self) -> &Arc<WorkRefresher> {
        &self.refresher
    }

    /// `mining.set_target` sent to every new session
    pub fn set_target_notification(&self) -> &StratumNotification {
        &self.set_target
    }

    /// Subscribe to new jobs
    pub fn subscribe_jobs(&self) -> broadcast::Receiver<JobParams> {
        self.refresher.registry().subscribe()
    }

    /// Fetch the first template and start polling for new ones
    pub async fn start(&self) -> JoinHandle<()> {
        // an unreachable node at startup is not fatal; the loop keeps trying
        if let Err(e) = self.refresher.refresh().await {
            warn!("Initial block template fetch failed: {}", e);
        }

        tokio::spawn(refresh_loop(
            Arc::clone(&self.refresher),
            self.refresh_interval,
            self.shutdown.subscribe(),
        ))
    }

    /// Stop the poll loop
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Poll for templates every `interval` until `shutdown` flips to true
pub async fn refresh_loop(
    refresher: Arc<WorkRefresher>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // errors are logged by the refresher
                let _ = refresher.refresh().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Refresh loop stopping");
                    break;
                }
            }
        }
    }
}
