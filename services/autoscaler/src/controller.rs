//! The control loop.
//!
//! Each cycle: observe, decide, maybe actuate, then sleep. Failures are
//! contained per cycle so one bad observation or scaling attempt never takes
//! down the controller; the loop only exits on shutdown.

use std::time::{Duration, Instant};

use nodepool_scaling::{decide, CooldownState, ScalingPolicy};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::actuator::Actuator;
use crate::observer::Observer;

/// The autoscaler control loop.
pub struct Controller {
    observer: Observer,
    actuator: Actuator,
    policy: ScalingPolicy,
    check_interval: Duration,
    cooldown: CooldownState,
}

impl Controller {
    /// Create a new controller. Cooldown starts at "never", so the first
    /// cycle is eligible to scale.
    pub fn new(
        observer: Observer,
        actuator: Actuator,
        policy: ScalingPolicy,
        check_interval: Duration,
    ) -> Self {
        Self {
            observer,
            actuator,
            policy,
            check_interval,
            cooldown: CooldownState::never(),
        }
    }

    /// The controller's cooldown state.
    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    /// Run the control loop until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            check_interval_secs = self.check_interval.as_secs(),
            scale_up_threshold = self.policy.scale_up_threshold,
            scale_down_threshold = self.policy.scale_down_threshold,
            min_workers = self.policy.min_workers,
            max_workers = self.policy.max_workers,
            cooldown_secs = self.policy.cooldown.as_secs(),
            "Starting control loop"
        );

        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Control loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One observe / decide / actuate pass.
    ///
    /// Never propagates an error. A missing observation skips the cycle
    /// explicitly; it is never read as 0% load or "no change needed".
    pub async fn run_cycle(&mut self) {
        let observation = match self.observer.observe().await {
            Ok(observation) => observation,
            Err(e) => {
                warn!(error = %e, "Skipping cycle, no observation");
                return;
            }
        };

        let decision = decide(
            observation.utilization,
            observation.workers,
            &self.cooldown,
            Instant::now(),
            &self.policy,
        );

        info!(
            utilization = observation.utilization,
            workers = observation.workers,
            reporting_nodes = observation.reporting_nodes,
            decision = %decision,
            "Cycle complete"
        );

        if let Some(target) = decision.target() {
            if let Err(e) = self.actuator.apply(target, &mut self.cooldown).await {
                error!(error = %e, target, "Scaling action failed");
            }
        }
    }
}
