//! Cluster observation.
//!
//! One read-only fan-in per cycle: aggregate utilization from the metrics
//! source plus the current worker count from the provisioner. A cycle needs
//! both values to decide; there is no partial success.

use std::sync::Arc;

use nodepool_scaling::mean_utilization;
use thiserror::Error;
use tracing::debug;

use crate::metrics::MetricsSource;
use crate::provisioner::Provisioner;

/// Errors that prevent a cycle from observing the cluster.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// The metrics query failed or timed out.
    #[error("metrics query failed: {0}")]
    Metrics(#[source] anyhow::Error),

    /// The provisioner count query failed or timed out.
    #[error("provisioner query failed: {0}")]
    Provisioner(#[source] anyhow::Error),

    /// The metrics source answered but no node reported. Distinguished from
    /// 0% load so an outage is never read as an idle cluster.
    #[error("no nodes reported utilization")]
    NoSamples,
}

/// A fresh snapshot of the cluster, produced once per cycle.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Mean CPU utilization across reporting nodes, 0-100.
    pub utilization: f64,

    /// Workers currently provisioned.
    pub workers: u32,

    /// How many nodes contributed to the mean.
    pub reporting_nodes: usize,
}

/// Observer over the metrics source and the provisioner.
pub struct Observer {
    metrics: Arc<dyn MetricsSource>,
    provisioner: Arc<dyn Provisioner>,
}

impl Observer {
    /// Create a new observer.
    pub fn new(metrics: Arc<dyn MetricsSource>, provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            metrics,
            provisioner,
        }
    }

    /// Take one observation of the cluster.
    pub async fn observe(&self) -> Result<Observation, ObserveError> {
        let nodes = self
            .metrics
            .node_utilization()
            .await
            .map_err(ObserveError::Metrics)?;

        let reporting_nodes = nodes.len();
        let utilization =
            mean_utilization(nodes.into_values()).ok_or(ObserveError::NoSamples)?;

        let workers = self
            .provisioner
            .current_count()
            .await
            .map_err(ObserveError::Provisioner)?;

        debug!(utilization, workers, reporting_nodes, "Observed cluster");

        Ok(Observation {
            utilization,
            workers,
            reporting_nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MockMetricsSource;
    use crate::provisioner::MockProvisioner;

    fn observer(metrics: MockMetricsSource, provisioner: MockProvisioner) -> Observer {
        Observer::new(Arc::new(metrics), Arc::new(provisioner))
    }

    #[tokio::test]
    async fn test_observe_aggregates_mean() {
        let observer = observer(
            MockMetricsSource::reporting(&[("worker-a", 60.0), ("worker-b", 80.0)]),
            MockProvisioner::with_count(3),
        );

        let observation = observer.observe().await.unwrap();
        assert_eq!(observation.utilization, 70.0);
        assert_eq!(observation.workers, 3);
        assert_eq!(observation.reporting_nodes, 2);
    }

    #[tokio::test]
    async fn test_non_reporting_nodes_are_excluded() {
        // Only one of the cluster's nodes reports; the mean covers it alone
        // instead of averaging in zeros for the missing ones.
        let observer = observer(
            MockMetricsSource::reporting(&[("worker-a", 90.0)]),
            MockProvisioner::with_count(5),
        );

        let observation = observer.observe().await.unwrap();
        assert_eq!(observation.utilization, 90.0);
        assert_eq!(observation.reporting_nodes, 1);
    }

    #[tokio::test]
    async fn test_no_reporting_nodes_is_an_error() {
        let observer = observer(MockMetricsSource::silent(), MockProvisioner::with_count(3));
        assert!(matches!(
            observer.observe().await,
            Err(ObserveError::NoSamples)
        ));
    }

    #[tokio::test]
    async fn test_metrics_failure() {
        let observer = observer(MockMetricsSource::failing(), MockProvisioner::with_count(3));
        assert!(matches!(
            observer.observe().await,
            Err(ObserveError::Metrics(_))
        ));
    }

    #[tokio::test]
    async fn test_provisioner_failure() {
        let observer = observer(
            MockMetricsSource::reporting(&[("worker-a", 50.0)]),
            MockProvisioner::failing(),
        );
        assert!(matches!(
            observer.observe().await,
            Err(ObserveError::Provisioner(_))
        ));
    }
}
