//! Integration tests for the control loop.
//!
//! These tests drive full observe / decide / actuate cycles against mock
//! collaborators and verify the per-cycle failure isolation:
//! 1. Observer failures skip the cycle without touching cooldown
//! 2. Scaling actions stay within bounds and respect cooldown
//! 3. A failed actuation does not stop the loop or reset cooldown

use std::sync::Arc;
use std::time::Duration;

use nodepool_autoscaler::actuator::Actuator;
use nodepool_autoscaler::controller::Controller;
use nodepool_autoscaler::metrics::MockMetricsSource;
use nodepool_autoscaler::observer::Observer;
use nodepool_autoscaler::provisioner::{MockProvisioner, Provisioner};
use nodepool_autoscaler::store::DesiredStateStore;
use nodepool_scaling::ScalingPolicy;
use tokio::sync::watch;

fn test_controller(
    metrics: MockMetricsSource,
    provisioner: Arc<MockProvisioner>,
) -> Controller {
    let store = DesiredStateStore::open_in_memory().unwrap();
    let observer = Observer::new(
        Arc::new(metrics),
        Arc::clone(&provisioner) as Arc<dyn Provisioner>,
    );
    let actuator = Actuator::new(store, provisioner as Arc<dyn Provisioner>);
    Controller::new(
        observer,
        actuator,
        ScalingPolicy::default(),
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn test_high_utilization_scales_up_one_step() {
    let provisioner = Arc::new(MockProvisioner::with_count(3));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 92.0), ("worker-b", 88.0)]);
    let mut controller = test_controller(metrics, Arc::clone(&provisioner));

    controller.run_cycle().await;

    assert_eq!(provisioner.converge_calls(), vec![4]);
    assert!(controller.cooldown().last_scale_at().is_some());
}

#[tokio::test]
async fn test_low_utilization_scales_down_one_step() {
    let provisioner = Arc::new(MockProvisioner::with_count(5));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 12.0), ("worker-b", 18.0)]);
    let mut controller = test_controller(metrics, Arc::clone(&provisioner));

    controller.run_cycle().await;

    assert_eq!(provisioner.converge_calls(), vec![4]);
}

#[tokio::test]
async fn test_utilization_inside_band_takes_no_action() {
    let provisioner = Arc::new(MockProvisioner::with_count(5));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 50.0)]);
    let mut controller = test_controller(metrics, Arc::clone(&provisioner));

    controller.run_cycle().await;

    assert!(provisioner.converge_calls().is_empty());
    assert!(controller.cooldown().last_scale_at().is_none());
}

#[tokio::test]
async fn test_cooldown_blocks_consecutive_actions() {
    let provisioner = Arc::new(MockProvisioner::with_count(3));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 95.0)]);
    let mut controller = test_controller(metrics, Arc::clone(&provisioner));

    // First cycle scales up; the second lands inside the cooldown and is
    // skipped even though utilization is still high.
    controller.run_cycle().await;
    controller.run_cycle().await;

    assert_eq!(provisioner.converge_calls(), vec![4]);
}

#[tokio::test]
async fn test_observer_failure_skips_cycle() {
    // A stalled metrics source must not be read as 0% load, which would
    // otherwise trigger a scale-down here.
    let provisioner = Arc::new(MockProvisioner::with_count(5));
    let mut controller = test_controller(MockMetricsSource::failing(), Arc::clone(&provisioner));

    controller.run_cycle().await;

    assert!(provisioner.converge_calls().is_empty());
    assert!(controller.cooldown().last_scale_at().is_none());
}

#[tokio::test]
async fn test_silent_metrics_source_skips_cycle() {
    let provisioner = Arc::new(MockProvisioner::with_count(5));
    let mut controller = test_controller(MockMetricsSource::silent(), Arc::clone(&provisioner));

    controller.run_cycle().await;

    assert!(provisioner.converge_calls().is_empty());
}

#[tokio::test]
async fn test_failed_actuation_keeps_loop_alive_and_cooldown_clear() {
    let provisioner = Arc::new(MockProvisioner::with_failing_converge(3));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 95.0)]);
    let mut controller = test_controller(metrics, Arc::clone(&provisioner));

    controller.run_cycle().await;

    // The attempt happened, cooldown was not reset, and the next cycle
    // retries the same decision.
    assert_eq!(provisioner.converge_calls(), vec![4]);
    assert!(controller.cooldown().last_scale_at().is_none());

    controller.run_cycle().await;
    assert_eq!(provisioner.converge_calls(), vec![4, 4]);
}

#[tokio::test]
async fn test_run_exits_on_shutdown_signal() {
    let provisioner = Arc::new(MockProvisioner::with_count(5));
    let metrics = MockMetricsSource::reporting(&[("worker-a", 50.0)]);
    let controller = test_controller(metrics, provisioner);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("controller did not shut down")
        .unwrap();
}
