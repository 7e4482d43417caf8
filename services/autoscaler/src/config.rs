//! Configuration for the autoscaler.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use nodepool_scaling::ScalingPolicy;

/// Autoscaler configuration.
///
/// Read once at startup; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds between control cycles.
    pub check_interval_secs: u64,

    /// Utilization percentage above which a scale-up is triggered.
    pub scale_up_threshold: f64,

    /// Utilization percentage below which a scale-down is triggered.
    pub scale_down_threshold: f64,

    /// Minimum worker nodes.
    pub min_workers: u32,

    /// Maximum worker nodes.
    pub max_workers: u32,

    /// Seconds between successful scaling actions.
    pub cooldown_secs: u64,

    /// Metrics API URL.
    pub metrics_url: String,

    /// Provisioner API URL.
    pub provisioner_url: String,

    /// Data directory for local state.
    pub data_dir: String,

    /// Timeout for read-only queries in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for provisioner convergence in seconds. Convergence changes
    /// real infrastructure and can take minutes.
    pub converge_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or malformed values fall back to defaults; an invalid
    /// combination of values is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let metrics_url = std::env::var("POOL_METRICS_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9090".to_string());

        let provisioner_url = std::env::var("POOL_PROVISIONER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let data_dir =
            std::env::var("POOL_DATA_DIR").unwrap_or_else(|_| "/var/lib/nodepool".to_string());

        let log_level = std::env::var("POOL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let config = Self {
            check_interval_secs: env_parse("POOL_CHECK_INTERVAL", 60),
            scale_up_threshold: env_parse("POOL_SCALE_UP_THRESHOLD", 80.0),
            scale_down_threshold: env_parse("POOL_SCALE_DOWN_THRESHOLD", 30.0),
            min_workers: env_parse("POOL_MIN_WORKERS", 2),
            max_workers: env_parse("POOL_MAX_WORKERS", 10),
            cooldown_secs: env_parse("POOL_COOLDOWN_SECS", 300),
            metrics_url,
            provisioner_url,
            data_dir,
            request_timeout_secs: env_parse("POOL_REQUEST_TIMEOUT_SECS", 10),
            converge_timeout_secs: env_parse("POOL_CONVERGE_TIMEOUT_SECS", 600),
            log_level,
        };

        config.policy().validate()?;
        Ok(config)
    }

    /// The decision policy carried by this configuration.
    pub fn policy(&self) -> ScalingPolicy {
        ScalingPolicy {
            scale_up_threshold: self.scale_up_threshold,
            scale_down_threshold: self.scale_down_threshold,
            min_workers: self.min_workers,
            max_workers: self.max_workers,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn converge_timeout(&self) -> Duration {
        Duration::from_secs(self.converge_timeout_secs)
    }
}
