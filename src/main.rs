//! Pool Proxy
//!
//! Polls an upstream node for block templates and validates miner shares.

use clap::Parser;
use pool_proxy::{
    config::{Args, Config},
    error::{Error, Result},
    proxy::ProxyServer,
    stratum::StratumNotification,
    utils,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let print_config = args.print_config;

    let config = Config::from_args(args)?;

    if print_config {
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| Error::config(format!("Failed to render config: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    // the guard flushes the file appender on drop
    let _log_guard = utils::init_logging(&config.logging)?;

    info!("Starting Pool Proxy v{}", pool_proxy::VERSION);
    let upstream = config.primary_upstream()?;
    info!(
        upstream = %upstream.name,
        url = %upstream.url,
        listen = %config.proxy.listen,
        "Using upstream node"
    );

    let proxy = ProxyServer::new(&config)?;
    let mut jobs = proxy.subscribe_jobs();
    let refresh = proxy.start().await;

    let notifier = tokio::spawn(async move {
        loop {
            match jobs.recv().await {
                Ok(job) => {
                    let notification = StratumNotification::notify(&job);
                    debug!(job_id = %job.job_id, params = ?notification.params, "New job");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Job notifier lagged, skipped {} jobs", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::other(format!("Failed to listen for shutdown signal: {}", e)))?;
    info!("Shutdown signal received");

    proxy.stop();
    if let Err(e) = refresh.await {
        warn!("Refresh loop ended abnormally: {}", e);
    }
    notifier.abort();

    info!("Pool Proxy stopped");
    Ok(())
}
