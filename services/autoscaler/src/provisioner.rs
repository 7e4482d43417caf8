//! Provisioner interface and HTTP implementation.
//!
//! The provisioner owns real infrastructure. It exposes two operations:
//! the current worker count, and converging the cluster to a target count.
//! Converge is idempotent: repeated calls with the same target are safe.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Provisioner interface.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Number of workers currently provisioned.
    async fn current_count(&self) -> Result<u32>;

    /// Converge real infrastructure to `target` workers. Blocks until the
    /// provisioner reports completion or failure.
    async fn converge(&self, target: u32) -> Result<()>;
}

/// Worker count response.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerCountResponse {
    pub count: u32,
}

#[derive(Debug, Serialize)]
struct ConvergeRequest {
    target: u32,
}

/// Convergence outcome reported by the provisioner.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvergeResponse {
    pub converged: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP provisioner client.
pub struct HttpProvisioner {
    client: reqwest::Client,
    base_url: String,
    converge_timeout: Duration,
}

impl HttpProvisioner {
    /// Create a new provisioner client.
    ///
    /// `request_timeout` bounds the count query; `converge_timeout` bounds
    /// the converge call, which changes infrastructure and runs far longer.
    pub fn new(base_url: &str, request_timeout: Duration, converge_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            converge_timeout,
        }
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn current_count(&self) -> Result<u32> {
        let url = format!("{}/v1/workers", self.base_url);
        debug!(url = %url, "Querying worker count");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to query worker count");
            anyhow::bail!("Failed to query worker count: {} - {}", status, body);
        }

        let payload: WorkerCountResponse = response.json().await?;
        Ok(payload.count)
    }

    async fn converge(&self, target: u32) -> Result<()> {
        let url = format!("{}/v1/workers/converge", self.base_url);
        debug!(url = %url, target, "Requesting convergence");

        let response = self
            .client
            .post(&url)
            .json(&ConvergeRequest { target })
            .timeout(self.converge_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Converge request failed");
            anyhow::bail!("Converge request failed: {} - {}", status, body);
        }

        let payload: ConvergeResponse = response.json().await?;
        if !payload.converged {
            let detail = payload.message.unwrap_or_else(|| "no detail".to_string());
            anyhow::bail!("Provisioner reported failed convergence: {detail}");
        }

        Ok(())
    }
}

/// Mock provisioner for testing and development.
pub struct MockProvisioner {
    count: AtomicU32,
    converge_calls: Mutex<Vec<u32>>,
    fail_queries: bool,
    fail_converge: bool,
}

impl MockProvisioner {
    /// A provisioner holding the given worker count. Converge succeeds and
    /// updates the count.
    pub fn with_count(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
            converge_calls: Mutex::new(Vec::new()),
            fail_queries: false,
            fail_converge: false,
        }
    }

    /// A provisioner whose queries and converge calls all fail.
    pub fn failing() -> Self {
        Self {
            count: AtomicU32::new(0),
            converge_calls: Mutex::new(Vec::new()),
            fail_queries: true,
            fail_converge: true,
        }
    }

    /// A provisioner that answers queries but fails every converge call.
    pub fn with_failing_converge(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
            converge_calls: Mutex::new(Vec::new()),
            fail_queries: false,
            fail_converge: true,
        }
    }

    /// Targets passed to converge, in call order.
    pub fn converge_calls(&self) -> Vec<u32> {
        self.converge_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    async fn current_count(&self) -> Result<u32> {
        if self.fail_queries {
            anyhow::bail!("Mock provisioner configured to fail queries");
        }
        Ok(self.count.load(Ordering::SeqCst))
    }

    async fn converge(&self, target: u32) -> Result<()> {
        self.converge_calls.lock().unwrap().push(target);
        if self.fail_converge {
            anyhow::bail!("Mock provisioner configured to fail convergence");
        }
        self.count.store(target, Ordering::SeqCst);
        Ok(())
    }
}
