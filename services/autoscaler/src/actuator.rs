//! Scaling actuation.
//!
//! Two steps per action: persist the desired count, then ask the provisioner
//! to converge. The steps are not atomic; a crash between them leaves the
//! desired state ahead of real infrastructure, and the next successful
//! decision reconciles it because converge is idempotent for a given target.

use std::sync::Arc;
use std::time::Instant;

use nodepool_scaling::CooldownState;
use thiserror::Error;
use tracing::info;

use crate::provisioner::Provisioner;
use crate::store::{DesiredStateStore, StoreError};

/// Errors from a scaling attempt.
#[derive(Debug, Error)]
pub enum ActuationError {
    /// Persisting the desired count failed; converge was not attempted.
    #[error("failed to persist desired count: {0}")]
    Persist(#[from] StoreError),

    /// The provisioner failed to converge or reported failure.
    #[error("provisioner convergence failed: {0}")]
    Converge(#[source] anyhow::Error),
}

/// Actuator converging the cluster to decided targets.
pub struct Actuator {
    store: DesiredStateStore,
    provisioner: Arc<dyn Provisioner>,
}

impl Actuator {
    /// Create a new actuator.
    pub fn new(store: DesiredStateStore, provisioner: Arc<dyn Provisioner>) -> Self {
        Self { store, provisioner }
    }

    /// The last desired count this controller persisted, if any.
    pub fn last_applied(&self) -> Result<Option<u32>, StoreError> {
        self.store.read_worker_count()
    }

    /// Converge the cluster to `target` workers.
    ///
    /// The cooldown is recorded only after both steps succeed; a failed
    /// attempt leaves it untouched so the next eligible cycle retries.
    pub async fn apply(
        &self,
        target: u32,
        cooldown: &mut CooldownState,
    ) -> Result<(), ActuationError> {
        self.store.write_worker_count(target)?;

        self.provisioner
            .converge(target)
            .await
            .map_err(ActuationError::Converge)?;

        cooldown.record(Instant::now());
        info!(target, "Converged worker count");

        Ok(())
    }
}
