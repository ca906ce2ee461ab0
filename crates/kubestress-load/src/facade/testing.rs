//! In-memory cluster for engine tests
//!
//! Mimics the API server behaviours the engine relies on: `generateName`
//! suffixing, plain updates ignoring status, and status updates touching
//! only status. Service accounts and pods are stored exactly as sent, so
//! tests see the namespace the caller chose.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, ServiceAccount};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use kubestress_common::Error;

use super::ClusterFacade;

#[derive(Default)]
pub(crate) struct FakeCluster {
    next_id: AtomicUsize,
    pub(crate) nodes: Mutex<BTreeMap<String, Node>>,
    pub(crate) pods: Mutex<Vec<Pod>>,
    pub(crate) service_accounts: Mutex<Vec<ServiceAccount>>,
    /// Node-scoped operations in call order, e.g. "update_status node-3"
    pub(crate) node_ops: Mutex<Vec<String>>,
    /// Fail this many upcoming node creations
    pub(crate) failing_node_creates: AtomicUsize,
    pub(crate) fail_pod_creates: AtomicBool,
    pub(crate) fail_status_updates: AtomicBool,
    pub(crate) reject_service_account: AtomicBool,
}

impl FakeCluster {
    fn assign_name(&self, prefix: Option<&str>, name: Option<&str>) -> String {
        match name {
            Some(name) => name.to_string(),
            None => format!(
                "{}{}",
                prefix.unwrap_or_default(),
                self.next_id.fetch_add(1, Ordering::SeqCst)
            ),
        }
    }

    fn server_error(message: &str) -> Error {
        Error::from(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: "InternalError".to_string(),
            code: 500,
        }))
    }

    fn record(&self, op: &str, name: &str) {
        self.node_ops.lock().push(format!("{} {}", op, name));
    }
}

#[async_trait]
impl ClusterFacade for FakeCluster {
    async fn create_service_account(
        &self,
        service_account: &ServiceAccount,
        cancel: &CancellationToken,
    ) -> Result<ServiceAccount, Error> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("create service account"));
        }
        if self.reject_service_account.load(Ordering::SeqCst) {
            return Err(Error::from(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "serviceaccounts \"default\" already exists".to_string(),
                reason: "AlreadyExists".to_string(),
                code: 409,
            })));
        }
        let created = service_account.clone();
        self.service_accounts.lock().push(created.clone());
        Ok(created)
    }

    async fn create_node(&self, node: &Node, cancel: &CancellationToken) -> Result<Node, Error> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("create node"));
        }
        let should_fail = self
            .failing_node_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Self::server_error("etcd request timed out"));
        }

        let mut created = node.clone();
        let name = self.assign_name(
            node.metadata.generate_name.as_deref(),
            node.metadata.name.as_deref(),
        );
        created.metadata.name = Some(name.clone());
        self.record("create", &name);
        self.nodes.lock().insert(name, created.clone());
        Ok(created)
    }

    async fn create_pod(&self, pod: &Pod, cancel: &CancellationToken) -> Result<Pod, Error> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("create pod"));
        }
        if self.fail_pod_creates.load(Ordering::SeqCst) {
            return Err(Self::server_error("admission webhook unavailable"));
        }
        let mut created = pod.clone();
        created.metadata.name = Some(self.assign_name(
            pod.metadata.generate_name.as_deref(),
            pod.metadata.name.as_deref(),
        ));
        self.pods.lock().push(created.clone());
        Ok(created)
    }

    async fn get_node(&self, name: &str) -> Result<Node, Error> {
        self.record("get", name);
        self.nodes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("Node", name))
    }

    async fn update_node(&self, node: &Node) -> Result<Node, Error> {
        let name = node.metadata.name.clone().unwrap_or_default();
        self.record("update", &name);
        let mut nodes = self.nodes.lock();
        let stored = nodes
            .get_mut(&name)
            .ok_or_else(|| Error::not_found("Node", name.as_str()))?;
        // A plain update never changes the status subresource
        stored.metadata = node.metadata.clone();
        stored.spec = node.spec.clone();
        Ok(stored.clone())
    }

    async fn update_node_status(&self, node: &Node) -> Result<Node, Error> {
        let name = node.metadata.name.clone().unwrap_or_default();
        self.record("update_status", &name);
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(Self::server_error("status update rejected"));
        }
        let mut nodes = self.nodes.lock();
        let stored = nodes
            .get_mut(&name)
            .ok_or_else(|| Error::not_found("Node", name.as_str()))?;
        stored.status = node.status.clone();
        Ok(stored.clone())
    }
}
