//! kubestress load engine
//!
//! Generates synthetic load against a Kubernetes control plane by creating
//! repetitions of a scenario's node and pod templates and forcing every new
//! node into an emulated ready state, without running kubelets.
//!
//! # Modules
//!
//! - [`config`] - Validated load configuration
//! - [`scenario`] - Scenario template store (embedded or on-disk)
//! - [`facade`] - Cluster API seam and its kube-rs implementation
//! - [`throttle`] - Client-side token bucket for API calls
//! - [`pool`] - Bounded worker pool with an unbounded submission queue
//! - [`readiness`] - Two-phase node readiness emulation
//! - [`engine`] - Load orchestration
//! - [`report`] - Per-task outcomes and the run report

#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod facade;
pub mod pool;
pub mod readiness;
pub mod report;
pub mod scenario;
pub mod throttle;

pub use config::LoadConfig;
pub use engine::LoadEngine;
pub use facade::{ClusterFacade, KubeFacade};
pub use pool::{PoolReport, WorkerPool, DEFAULT_MAX_WORKERS};
pub use report::{LoadReport, ObjectKind, TaskFailure, TaskOutcome};
pub use scenario::{ScenarioData, TemplateSource};
