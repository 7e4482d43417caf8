//! Metrics source interface and HTTP implementation.
//!
//! The metrics source reports per-node CPU utilization. Nodes that fail to
//! report are absent from the response; they are excluded from aggregation
//! rather than counted as idle.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

/// Per-node CPU utilization percentages, keyed by node name.
pub type NodeUtilization = HashMap<String, f64>;

/// Metrics source interface.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Query utilization for all reporting nodes.
    async fn node_utilization(&self) -> Result<NodeUtilization>;
}

/// Metrics API response.
#[derive(Debug, Clone, Deserialize)]
pub struct UtilizationResponse {
    pub nodes: HashMap<String, f64>,
}

/// HTTP metrics source.
pub struct HttpMetricsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetricsSource {
    /// Create a new metrics source client.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn node_utilization(&self) -> Result<NodeUtilization> {
        let url = format!("{}/v1/nodes/utilization", self.base_url);
        debug!(url = %url, "Querying node utilization");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to query utilization");
            anyhow::bail!("Failed to query utilization: {} - {}", status, body);
        }

        let payload: UtilizationResponse = response.json().await?;
        debug!(
            reporting_nodes = payload.nodes.len(),
            "Fetched node utilization"
        );

        Ok(payload.nodes)
    }
}

/// Mock metrics source for testing and development.
pub struct MockMetricsSource {
    nodes: NodeUtilization,
    fail: bool,
}

impl MockMetricsSource {
    /// A source where the given nodes report the given utilization.
    pub fn reporting(nodes: &[(&str, f64)]) -> Self {
        Self {
            nodes: nodes
                .iter()
                .map(|(name, pct)| (name.to_string(), *pct))
                .collect(),
            fail: false,
        }
    }

    /// A source where no node reports at all.
    pub fn silent() -> Self {
        Self {
            nodes: HashMap::new(),
            fail: false,
        }
    }

    /// A source whose queries fail.
    pub fn failing() -> Self {
        Self {
            nodes: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn node_utilization(&self) -> Result<NodeUtilization> {
        if self.fail {
            anyhow::bail!("Mock metrics source configured to fail");
        }
        Ok(self.nodes.clone())
    }
}
