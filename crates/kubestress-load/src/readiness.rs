//! Node readiness emulation
//!
//! A node created through the API has no kubelet behind it, so it would sit
//! NotReady with the `node.kubernetes.io/not-ready` taint forever. The
//! emulator rewrites it into the state a healthy kubelet would report:
//!
//! 1. **Spec phase** - fetch the node, set the ready condition vector, drop
//!    the not-ready taints, and write it back with a plain update.
//! 2. **Status phase** - take the object returned by step 1, replace its
//!    status with the template status (phase `Running`, ready conditions)
//!    and write it through the status subresource.
//!
//! The spec write must land before the status write: a later spec-only
//! read-modify-write would otherwise carry a stale status snapshot.

use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeStatus, Taint};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tracing::debug;

use kubestress_common::{Error, NOT_READY_TAINT_KEY};

use crate::facade::ClusterFacade;

/// Phase forced onto every emulated node
pub const NODE_PHASE_RUNNING: &str = "Running";

/// How far in the past (seconds) the emulated conditions claim to have settled
pub const CONDITION_SETTLE_SECS: i64 = 60;

/// The condition vector of a healthy node, settled one minute before `now`
pub fn ready_conditions(now: DateTime<Utc>) -> Vec<NodeCondition> {
    let settled = Time(now - Duration::seconds(CONDITION_SETTLE_SECS));
    [
        ("Ready", "True", "KubeletReady", "kubelet is posting ready status"),
        (
            "NetworkUnavailable",
            "False",
            "RouteCreated",
            "route created for node",
        ),
        (
            "DiskPressure",
            "False",
            "KubeletHasNoDiskPressure",
            "kubelet has no disk pressure",
        ),
        (
            "MemoryPressure",
            "False",
            "KubeletHasSufficientMemory",
            "kubelet has sufficient memory available",
        ),
    ]
    .into_iter()
    .map(|(type_, status, reason, message)| NodeCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(settled.clone()),
        last_heartbeat_time: Some(settled.clone()),
    })
    .collect()
}

/// Drop every taint keyed as not-ready, keeping the rest in order
pub fn strip_not_ready_taints(taints: Vec<Taint>) -> Vec<Taint> {
    taints
        .into_iter()
        .filter(|taint| taint.key != NOT_READY_TAINT_KEY)
        .collect()
}

/// Move a freshly created node into the emulated ready state.
///
/// `template_status` is the status carried by the node's template; it
/// replaces whatever status the API server assigned.
pub async fn emulate_ready(
    facade: &dyn ClusterFacade,
    node_name: &str,
    template_status: Option<NodeStatus>,
) -> Result<Node, Error> {
    emulate_ready_at(facade, node_name, template_status, Utc::now()).await
}

/// [`emulate_ready`] with an explicit clock
pub async fn emulate_ready_at(
    facade: &dyn ClusterFacade,
    node_name: &str,
    template_status: Option<NodeStatus>,
    now: DateTime<Utc>,
) -> Result<Node, Error> {
    let conditions = ready_conditions(now);

    let mut node = facade.get_node(node_name).await?;
    node.status.get_or_insert_with(NodeStatus::default).conditions = Some(conditions.clone());
    if let Some(spec) = node.spec.as_mut() {
        if let Some(taints) = spec.taints.take() {
            spec.taints = Some(strip_not_ready_taints(taints));
        }
    }
    let mut node = facade.update_node(&node).await?;
    debug!(node = %node_name, "node spec adjusted");

    let mut status = template_status.unwrap_or_default();
    status.phase = Some(NODE_PHASE_RUNNING.to_string());
    status.conditions = Some(conditions);
    node.status = Some(status);
    let node = facade.update_node_status(&node).await?;
    debug!(node = %node_name, "node status emulated ready");

    Ok(node)
}
