//! Scaling decision primitives.
//!
//! This library provides the pure half of the autoscaler: the function that
//! turns one observation of the cluster into a scaling decision. Key concepts:
//!
//! - **Utilization**: aggregate CPU percentage across reporting nodes.
//! - **Worker bounds**: the decision never targets a count outside
//!   `[min_workers, max_workers]`.
//! - **Cooldown**: minimum elapsed time between two successful scaling
//!   actions, to prevent oscillation.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same inputs
//! - Step size is fixed at one worker per cycle
//! - An unexpired cooldown blocks any action, regardless of utilization

use std::time::{Duration, Instant};

use thiserror::Error;

/// Policy validation errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Worker bounds are inverted.
    #[error("min_workers ({min}) exceeds max_workers ({max})")]
    InvertedBounds { min: u32, max: u32 },

    /// Thresholds are inverted or equal.
    #[error("scale_down_threshold ({down}) must be below scale_up_threshold ({up})")]
    InvertedThresholds { down: f64, up: f64 },

    /// A threshold is not a percentage.
    #[error("threshold {0} is outside 0-100")]
    ThresholdOutOfRange(f64),
}

/// Thresholds and bounds governing scaling decisions.
///
/// Immutable for the process lifetime; validated once at startup.
#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    /// Utilization above this triggers a scale-up (strict inequality).
    pub scale_up_threshold: f64,

    /// Utilization below this triggers a scale-down (strict inequality).
    pub scale_down_threshold: f64,

    /// Lower worker bound.
    pub min_workers: u32,

    /// Upper worker bound.
    pub max_workers: u32,

    /// Minimum elapsed time between successful scaling actions.
    pub cooldown: Duration,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            scale_up_threshold: 80.0,
            scale_down_threshold: 30.0,
            min_workers: 2,
            max_workers: 10,
            cooldown: Duration::from_secs(300),
        }
    }
}

impl ScalingPolicy {
    /// Validate the policy. Invalid combinations are a startup error, not a
    /// per-decision concern.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for threshold in [self.scale_up_threshold, self.scale_down_threshold] {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(PolicyError::ThresholdOutOfRange(threshold));
            }
        }

        if self.scale_down_threshold >= self.scale_up_threshold {
            return Err(PolicyError::InvertedThresholds {
                down: self.scale_down_threshold,
                up: self.scale_up_threshold,
            });
        }

        if self.min_workers > self.max_workers {
            return Err(PolicyError::InvertedBounds {
                min: self.min_workers,
                max: self.max_workers,
            });
        }

        Ok(())
    }
}

/// Why a cycle took no action even though a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cooldown from the last successful scaling action has not expired.
    Cooldown { remaining: Duration },
}

/// Outcome of a single decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Add one worker, up to the configured target.
    ScaleUp(u32),

    /// Remove one worker, down to the configured target.
    ScaleDown(u32),

    /// Utilization is inside the threshold band (or the bounds are pinned).
    NoOp,

    /// No action was considered at all.
    Skip(SkipReason),
}

impl Decision {
    /// The worker count this decision wants to converge to, if any.
    pub fn target(&self) -> Option<u32> {
        match self {
            Decision::ScaleUp(target) | Decision::ScaleDown(target) => Some(*target),
            Decision::NoOp | Decision::Skip(_) => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::ScaleUp(target) => write!(f, "scale-up to {target}"),
            Decision::ScaleDown(target) => write!(f, "scale-down to {target}"),
            Decision::NoOp => write!(f, "no-op"),
            Decision::Skip(SkipReason::Cooldown { remaining }) => {
                write!(f, "skip (cooldown, {}s remaining)", remaining.as_secs())
            }
        }
    }
}

/// Timestamp of the last successful scaling action.
///
/// Owned by the control loop, recorded by the actuator on success only.
/// Starts at "never", so the first cycle is never cooldown-blocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooldownState {
    last_scale_at: Option<Instant>,
}

impl CooldownState {
    /// A state in which no scaling action has ever happened.
    pub fn never() -> Self {
        Self::default()
    }

    /// Record a successful scaling action.
    pub fn record(&mut self, now: Instant) {
        self.last_scale_at = Some(now);
    }

    /// Time elapsed since the last scaling action, or `None` if never.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_scale_at.map(|at| now.duration_since(at))
    }

    /// When the last scaling action happened, or `None` if never.
    pub fn last_scale_at(&self) -> Option<Instant> {
        self.last_scale_at
    }
}

/// Decide what to do with the cluster given one fresh observation.
///
/// Pure: no I/O, no mutation. The cooldown check takes priority over the
/// threshold checks. Utilization exactly equal to a threshold takes no
/// action.
pub fn decide(
    utilization: f64,
    current: u32,
    cooldown: &CooldownState,
    now: Instant,
    policy: &ScalingPolicy,
) -> Decision {
    if let Some(elapsed) = cooldown.elapsed(now) {
        if elapsed < policy.cooldown {
            return Decision::Skip(SkipReason::Cooldown {
                remaining: policy.cooldown - elapsed,
            });
        }
    }

    if utilization > policy.scale_up_threshold && current < policy.max_workers {
        return Decision::ScaleUp((current + 1).min(policy.max_workers));
    }

    if utilization < policy.scale_down_threshold && current > policy.min_workers {
        return Decision::ScaleDown(current.saturating_sub(1).max(policy.min_workers));
    }

    Decision::NoOp
}

/// Unweighted mean utilization across reporting nodes.
///
/// A node that fails to report is simply absent from `samples` and therefore
/// excluded from the mean, never counted as 0%. Returns `None` when no node
/// reports, so the caller can distinguish "no data" from "0% load".
pub fn mean_utilization<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut count = 0u32;
    for sample in samples {
        sum += sample;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some(sum / f64::from(count))
    }
}
