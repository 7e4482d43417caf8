//! nodepool autoscaler
//!
//! Watches aggregate CPU utilization across the cluster and converges the
//! worker count within configured bounds, subject to a cooldown between
//! scaling actions. Intended for small, self-managed clusters without a
//! native cluster-autoscaler.
//!
//! Wiring lives here; the components are in `nodepool_autoscaler` and the
//! decision policy in `nodepool-scaling`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nodepool_autoscaler::config::Config;
use nodepool_autoscaler::{
    Actuator, Controller, DesiredStateStore, HttpMetricsSource, HttpProvisioner, MetricsSource,
    Observer, Provisioner,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting nodepool autoscaler");

    // Load configuration; invalid policy combinations abort startup here
    let config = Config::from_env()?;
    info!(
        metrics_url = %config.metrics_url,
        provisioner_url = %config.provisioner_url,
        data_dir = %config.data_dir,
        "Configuration loaded"
    );

    // Open the desired-state store
    std::fs::create_dir_all(&config.data_dir)?;
    let store = DesiredStateStore::open(Path::new(&config.data_dir).join("autoscaler.db"))?;
    if let Some(count) = store.read_worker_count()? {
        info!(count, "Recovered desired worker count");
    }

    // Wire up the external collaborators
    let metrics: Arc<dyn MetricsSource> = Arc::new(HttpMetricsSource::new(
        &config.metrics_url,
        config.request_timeout(),
    ));
    let provisioner: Arc<dyn Provisioner> = Arc::new(HttpProvisioner::new(
        &config.provisioner_url,
        config.request_timeout(),
        config.converge_timeout(),
    ));

    let observer = Observer::new(metrics, Arc::clone(&provisioner));
    let actuator = Actuator::new(store, provisioner);
    let controller = Controller::new(
        observer,
        actuator,
        config.policy(),
        config.check_interval(),
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let controller_handle = tokio::spawn(controller.run(shutdown_rx));

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = controller_handle => {
            info!("Control loop exited");
        }
    }

    // Signal shutdown and let an in-flight cycle finish
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    info!("Autoscaler shutdown complete");
    Ok(())
}
