//! nodepool autoscaler library
//!
//! A control loop that watches aggregate CPU utilization across the cluster
//! and converges the worker count within configured bounds, one step per
//! cycle, with a cooldown between scaling actions.
//!
//! ## Architecture
//!
//! - **Observer**: reads per-node utilization and the provisioned worker count
//! - **Decision engine**: pure policy over one observation (`nodepool-scaling`)
//! - **Actuator**: persists the desired count, then converges via the provisioner
//! - **Controller**: drives the three on a fixed interval, isolating failures
//!   per cycle
//!
//! Data flows one way each cycle: observer, then decision, then actuator. No
//! component keeps cross-cycle state except the controller's cooldown.

pub mod actuator;
pub mod config;
pub mod controller;
pub mod metrics;
pub mod observer;
pub mod provisioner;
pub mod store;

// Re-export commonly used types
pub use actuator::Actuator;
pub use controller::Controller;
pub use metrics::{HttpMetricsSource, MetricsSource, MockMetricsSource};
pub use observer::{Observation, Observer};
pub use provisioner::{HttpProvisioner, MockProvisioner, Provisioner};
pub use store::DesiredStateStore;
