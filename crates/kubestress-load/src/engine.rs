//! Load orchestration
//!
//! [`LoadEngine`] creates the default service account, then fans out one
//! creation task per (repetition, template) pair through a [`WorkerPool`].
//! Node tasks hand the created node to the readiness emulator. A failing task
//! only ends itself; its error is collected into the [`LoadReport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kubestress_common::{Error, DEFAULT_NAMESPACE};

use crate::config::LoadConfig;
use crate::facade::{ClusterFacade, KubeFacade};
use crate::pool::WorkerPool;
use crate::readiness::emulate_ready;
use crate::report::{LoadReport, ObjectKind, TaskOutcome};
use crate::scenario::ScenarioData;

/// Successful creations between two progress log lines, per object kind
pub const PROGRESS_INTERVAL: u64 = 100;

/// Successful creations per kind, shared by every task of a run
#[derive(Debug, Default)]
struct Progress {
    nodes: AtomicU64,
    pods: AtomicU64,
}

impl Progress {
    /// Count one success; logs on every `PROGRESS_INTERVAL`th
    fn record(&self, kind: ObjectKind) -> u64 {
        let counter = match kind {
            ObjectKind::Node => &self.nodes,
            ObjectKind::Pod => &self.pods,
        };
        let created = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if created % PROGRESS_INTERVAL == 0 {
            info!(kind = %kind, created, "creation progress");
        }
        created
    }
}

/// Drives one load run against a cluster
pub struct LoadEngine {
    config: LoadConfig,
    facade: Arc<dyn ClusterFacade>,
    scenario: Arc<ScenarioData>,
    service_account: ServiceAccount,
}

impl LoadEngine {
    /// Validate the config and load its templates, using `facade` for all
    /// cluster calls
    pub fn new(config: LoadConfig, facade: Arc<dyn ClusterFacade>) -> Result<Self, Error> {
        let (scenario, service_account) = prepare(&config)?;
        Ok(Self {
            config,
            facade,
            scenario: Arc::new(scenario),
            service_account,
        })
    }

    /// Validate the config, load its templates and build a client from the
    /// configured kubeconfig. Nothing is sent to the cluster yet.
    pub async fn connect(config: LoadConfig) -> Result<Self, Error> {
        let (scenario, service_account) = prepare(&config)?;
        let facade = KubeFacade::connect(&config.kubeconfig, &config.transport).await?;
        Ok(Self {
            config,
            facade: Arc::new(facade),
            scenario: Arc::new(scenario),
            service_account,
        })
    }

    /// The validated configuration
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// The loaded scenario templates
    pub fn scenario(&self) -> &ScenarioData {
        &self.scenario
    }

    /// Create the default service account.
    ///
    /// Any failure, including the account already existing, is fatal.
    pub async fn ensure_default_identity(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ServiceAccount, Error> {
        let mut service_account = self.service_account.clone();
        default_namespace(&mut service_account.metadata);

        let created = self
            .facade
            .create_service_account(&service_account, cancel)
            .await?;
        info!(
            name = created.metadata.name.as_deref().unwrap_or_default(),
            namespace = created.metadata.namespace.as_deref().unwrap_or_default(),
            "default service account created"
        );
        Ok(created)
    }

    /// Run the scenario `repeat_count` times and wait for every task.
    ///
    /// Only a failure to create the default service account aborts the run;
    /// per-task failures are reported in the returned [`LoadReport`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<LoadReport, Error> {
        self.ensure_default_identity(cancel).await?;

        let scenario_name = self.config.scenario_name.as_str();
        let repeat_count = self.config.repeat_count;
        info!(
            scenario = %scenario_name,
            repeat_count,
            nodes_per_repetition = self.scenario.template_nodes.len(),
            pods_per_repetition = self.scenario.template_pods.len(),
            max_workers = self.config.max_workers,
            "starting load"
        );

        let progress = Arc::new(Progress::default());
        let mut pool = WorkerPool::new(self.config.max_workers);

        for repetition in 0..repeat_count {
            for index in 0..self.scenario.template_nodes.len() {
                pool.submit(node_task(
                    self.facade.clone(),
                    self.scenario.clone(),
                    index,
                    cancel.clone(),
                    progress.clone(),
                ));
            }
            for index in 0..self.scenario.template_pods.len() {
                pool.submit(pod_task(
                    self.facade.clone(),
                    self.scenario.clone(),
                    index,
                    cancel.clone(),
                    progress.clone(),
                ));
            }
            debug!(repetition, submitted = pool.submitted(), "repetition submitted");
        }

        let submitted = pool.submitted();
        info!(submitted, "all tasks submitted, waiting for completion");
        let drained = pool.drain().await;

        let mut report = LoadReport::new(scenario_name, repeat_count);
        report.submitted = submitted;
        report.panicked = drained.panicked;
        for outcome in drained.outputs {
            report.record(outcome);
        }

        info!(
            scenario = %scenario_name,
            submitted = report.submitted,
            nodes_created = report.nodes_created,
            pods_created = report.pods_created,
            failed = report.failures.len(),
            panicked = report.panicked,
            "load finished"
        );
        Ok(report)
    }
}

fn prepare(config: &LoadConfig) -> Result<(ScenarioData, ServiceAccount), Error> {
    config.validate()?;
    let scenario = config.templates.load_scenario(&config.scenario_name)?;
    let service_account = config.templates.load_default_service_account()?;
    Ok((scenario, service_account))
}

/// Unset and empty namespaces both mean `default`
fn default_namespace(metadata: &mut ObjectMeta) {
    if metadata.namespace.as_deref().unwrap_or_default().is_empty() {
        metadata.namespace = Some(DEFAULT_NAMESPACE.to_string());
    }
}

fn template_prefix(metadata: &ObjectMeta) -> String {
    metadata
        .generate_name
        .clone()
        .or_else(|| metadata.name.clone())
        .unwrap_or_default()
}

fn task_failed(kind: ObjectKind, template: String, error: Error) -> TaskOutcome {
    warn!(kind = %kind, template = %template, error = %error, "creation task failed");
    TaskOutcome::failed(kind, template, error)
}

async fn node_task(
    facade: Arc<dyn ClusterFacade>,
    scenario: Arc<ScenarioData>,
    index: usize,
    cancel: CancellationToken,
    progress: Arc<Progress>,
) -> TaskOutcome {
    let node = scenario.template_nodes[index].clone();
    let template = template_prefix(&node.metadata);

    let created = match facade.create_node(&node, &cancel).await {
        Ok(created) => created,
        Err(e) => return task_failed(ObjectKind::Node, template, e),
    };
    let Some(name) = created.metadata.name else {
        return task_failed(
            ObjectKind::Node,
            template,
            Error::internal_with_context("create node", "API server returned a node without a name"),
        );
    };

    if let Err(e) = emulate_ready(facade.as_ref(), &name, node.status).await {
        return task_failed(ObjectKind::Node, template, e);
    }

    progress.record(ObjectKind::Node);
    TaskOutcome::Created {
        kind: ObjectKind::Node,
        name,
    }
}

async fn pod_task(
    facade: Arc<dyn ClusterFacade>,
    scenario: Arc<ScenarioData>,
    index: usize,
    cancel: CancellationToken,
    progress: Arc<Progress>,
) -> TaskOutcome {
    let mut pod = scenario.template_pods[index].clone();
    let template = template_prefix(&pod.metadata);
    default_namespace(&mut pod.metadata);

    match facade.create_pod(&pod, &cancel).await {
        Ok(created) => {
            progress.record(ObjectKind::Pod);
            TaskOutcome::Created {
                kind: ObjectKind::Pod,
                name: created.metadata.name.unwrap_or_default(),
            }
        }
        Err(e) => task_failed(ObjectKind::Pod, template, e),
    }
}
