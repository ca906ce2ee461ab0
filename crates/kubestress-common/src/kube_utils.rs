//! Kubernetes client construction
//!
//! Builds a kube-rs [`Client`] from a kubeconfig path plus explicit transport
//! tuning. Nothing here is a compile-time constant: the load command passes a
//! [`TransportConfig`] at construction time.

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default sustained request rate against the API server
pub const DEFAULT_QPS: f64 = 1000.0;
/// Slowest accepted sustained rate; one request every ~17 minutes
pub const MIN_QPS: f64 = 1e-3;
/// Default number of requests allowed in a burst above the sustained rate
pub const DEFAULT_BURST: u32 = 500;

/// Client-side transport tuning for the load generator
#[derive(Clone, Debug, PartialEq)]
pub struct TransportConfig {
    /// Sustained requests per second across all workers
    pub qps: f64,
    /// Token bucket capacity
    pub burst: u32,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Per-request read timeout
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            qps: DEFAULT_QPS,
            burst: DEFAULT_BURST,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Reject settings that would stall or disable the client
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.qps.is_finite() && self.qps >= MIN_QPS) {
            return Err(Error::validation_for_field(
                "qps",
                format!("qps must be a number of at least {}, got {}", MIN_QPS, self.qps),
            ));
        }
        if self.burst == 0 {
            return Err(Error::validation_for_field("burst", "burst must be at least 1"));
        }
        Ok(())
    }
}

/// Create a kube client from a kubeconfig file using its current context.
pub async fn client_from_kubeconfig(
    path: &Path,
    transport: &TransportConfig,
) -> Result<Client, Error> {
    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| Error::credentials(path, format!("failed to read kubeconfig: {}", e)))?;
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::credentials(path, format!("failed to load kubeconfig: {}", e)))?;
    config.connect_timeout = Some(transport.connect_timeout);
    config.read_timeout = Some(transport.read_timeout);

    debug!(
        cluster_url = %config.cluster_url,
        kubeconfig = %path.display(),
        "building kube client"
    );
    Client::try_from(config)
        .map_err(|e| Error::credentials(path, format!("failed to create client: {}", e)))
}
