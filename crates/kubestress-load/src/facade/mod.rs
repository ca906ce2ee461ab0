//! Cluster API seam
//!
//! The engine and the readiness emulator only talk to the cluster through
//! [`ClusterFacade`], so tests can swap in mocks or an in-memory cluster
//! while production uses [`KubeFacade`] over a kube-rs client.

use std::future::Future;
use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[cfg(test)]
use mockall::automock;

use kubestress_common::kube_utils::{client_from_kubeconfig, TransportConfig};
use kubestress_common::{Error, DEFAULT_NAMESPACE, FIELD_MANAGER};

use crate::throttle::Throttle;

#[cfg(test)]
pub(crate) mod testing;

/// Trait abstracting the cluster operations the load engine needs
///
/// Every call is a single remote request. Failures are returned as-is;
/// callers treat them as terminal and do not retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterFacade: Send + Sync {
    /// Create a service account in its namespace (`default` when unset or empty)
    async fn create_service_account(
        &self,
        service_account: &ServiceAccount,
        cancel: &CancellationToken,
    ) -> Result<ServiceAccount, Error>;

    /// Create a node, returning the object as stored by the API server
    async fn create_node(&self, node: &Node, cancel: &CancellationToken) -> Result<Node, Error>;

    /// Create a pod in its namespace (`default` when unset or empty)
    async fn create_pod(&self, pod: &Pod, cancel: &CancellationToken) -> Result<Pod, Error>;

    /// Fetch a node by name, failing with `Error::NotFound` if it does not exist
    async fn get_node(&self, name: &str) -> Result<Node, Error>;

    /// Replace a node's metadata and spec; the status subresource is ignored
    async fn update_node(&self, node: &Node) -> Result<Node, Error>;

    /// Replace a node's status subresource
    async fn update_node_status(&self, node: &Node) -> Result<Node, Error>;
}

/// Real cluster facade backed by a kube-rs client
pub struct KubeFacade {
    client: Client,
    throttle: Throttle,
}

impl KubeFacade {
    /// Wrap an existing client, throttled per the transport settings
    pub fn new(client: Client, transport: &TransportConfig) -> Self {
        Self {
            client,
            throttle: Throttle::from_transport(transport),
        }
    }

    /// Build a client from a kubeconfig file and wrap it
    pub async fn connect(kubeconfig: &Path, transport: &TransportConfig) -> Result<Self, Error> {
        let client = client_from_kubeconfig(kubeconfig, transport).await?;
        Ok(Self::new(client, transport))
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    /// Run a request after the throttle admits it, unless `cancel` fires first
    async fn cancellable<T, F>(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        request: F,
    ) -> Result<T, Error>
    where
        F: Future<Output = kube::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled(operation)),
            result = async {
                self.throttle.acquire().await;
                request.await
            } => result.map_err(Error::from),
        }
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Namespace to create in; unset and empty both mean `default`
fn namespace_or_default(metadata: &ObjectMeta) -> &str {
    metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE)
}

fn node_name(node: &Node) -> Result<&str, Error> {
    node.metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::validation_for_field("metadata.name", "node has no name"))
}

#[async_trait]
impl ClusterFacade for KubeFacade {
    async fn create_service_account(
        &self,
        service_account: &ServiceAccount,
        cancel: &CancellationToken,
    ) -> Result<ServiceAccount, Error> {
        let namespace = namespace_or_default(&service_account.metadata);
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        self.cancellable(
            cancel,
            "create service account",
            api.create(&post_params(), service_account),
        )
        .await
    }

    async fn create_node(&self, node: &Node, cancel: &CancellationToken) -> Result<Node, Error> {
        let api = self.nodes();
        self.cancellable(cancel, "create node", api.create(&post_params(), node))
            .await
    }

    async fn create_pod(&self, pod: &Pod, cancel: &CancellationToken) -> Result<Pod, Error> {
        let namespace = namespace_or_default(&pod.metadata);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        self.cancellable(cancel, "create pod", api.create(&post_params(), pod))
            .await
    }

    async fn get_node(&self, name: &str) -> Result<Node, Error> {
        self.throttle.acquire().await;
        trace!(node = %name, "getting node");
        self.nodes()
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::not_found("Node", name))
    }

    async fn update_node(&self, node: &Node) -> Result<Node, Error> {
        let name = node_name(node)?;
        self.throttle.acquire().await;
        trace!(node = %name, "replacing node");
        Ok(self.nodes().replace(name, &post_params(), node).await?)
    }

    async fn update_node_status(&self, node: &Node) -> Result<Node, Error> {
        let name = node_name(node)?;
        let body = serde_json::to_vec(node)
            .map_err(|e| Error::serialization_for_kind("Node", e.to_string()))?;
        self.throttle.acquire().await;
        trace!(node = %name, "replacing node status");
        Ok(self.nodes().replace_status(name, &post_params(), body).await?)
    }
}
