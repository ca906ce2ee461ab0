//! Load command - Materialize a scenario against a cluster
//!
//! Arguments are turned into a validated [`LoadConfig`] before credentials
//! are read or any request reaches the cluster. Ctrl-C cancels creations
//! that have not been sent yet; tasks already running finish normally.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kubestress_common::kube_utils::{DEFAULT_BURST, DEFAULT_QPS};
use kubestress_load::scenario::TemplateSource;
use kubestress_load::{LoadConfig, LoadEngine, LoadReport, DEFAULT_MAX_WORKERS};

use crate::{Error, Result};

/// Create repetitions of a scenario's nodes and pods
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Path to the kubeconfig of the cluster under test
    #[arg(short = 'k', long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Scenario to run
    #[arg(short = 's', long, env = "SCENARIO")]
    pub scenario: Option<String>,

    /// How many times to create every template in the scenario
    #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
    pub number: i64,

    /// Maximum number of creation tasks running at once
    #[arg(long, env = "KUBESTRESS_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Client-side request rate limit (requests per second)
    #[arg(long, env = "KUBESTRESS_QPS", default_value_t = DEFAULT_QPS)]
    pub qps: f64,

    /// Client-side request burst
    #[arg(long, env = "KUBESTRESS_BURST", default_value_t = DEFAULT_BURST)]
    pub burst: u32,

    /// Read scenarios from this directory instead of the built-in set
    #[arg(long, env = "KUBESTRESS_SCENARIO_DIR")]
    pub scenario_dir: Option<PathBuf>,

    /// Exit with an error if any object failed to be created
    #[arg(long)]
    pub fail_on_error: bool,
}

impl LoadArgs {
    /// Check the arguments and build the load configuration
    pub fn into_config(self) -> Result<LoadConfig> {
        let scenario = self
            .scenario
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::validation("a scenario is required (--scenario or SCENARIO)"))?;
        let kubeconfig = self
            .kubeconfig
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::validation("a kubeconfig is required (--kubeconfig or KUBECONFIG)")
            })?;
        if self.number < 1 {
            return Err(Error::validation(format!(
                "--number must be a positive integer, got {}",
                self.number
            )));
        }
        let repeat_count = u32::try_from(self.number).map_err(|_| {
            Error::validation(format!("--number {} is too large", self.number))
        })?;

        let mut config = LoadConfig::new(kubeconfig, scenario, repeat_count);
        config.max_workers = self.max_workers;
        config.transport.qps = self.qps;
        config.transport.burst = self.burst;
        if let Some(dir) = self.scenario_dir {
            config.templates = TemplateSource::Directory(dir);
        }

        config
            .validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        Ok(config)
    }
}

/// Run the load command
pub async fn run(args: LoadArgs) -> Result<()> {
    let fail_on_error = args.fail_on_error;
    let config = args.into_config()?;

    info!(
        scenario = %config.scenario_name,
        repeat_count = config.repeat_count,
        kubeconfig = %config.kubeconfig.display(),
        "preparing load run"
    );
    let engine = LoadEngine::connect(config)
        .await
        .map_err(Error::construction)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling pending creations");
            signal_cancel.cancel();
        }
    });

    let report = engine
        .run(&cancel)
        .await
        .map_err(|e| Error::execution(e.to_string()))?;

    check_report(&report, fail_on_error)
}

fn check_report(report: &LoadReport, fail_on_error: bool) -> Result<()> {
    if report.is_clean() {
        info!(
            nodes = report.nodes_created,
            pods = report.pods_created,
            "all objects created"
        );
        return Ok(());
    }

    warn!(
        failed = report.failures.len(),
        panicked = report.panicked,
        submitted = report.submitted,
        "some creation tasks failed"
    );
    if fail_on_error {
        return Err(Error::execution(format!(
            "{} of {} creation tasks failed",
            report.failure_count(),
            report.submitted
        )));
    }
    Ok(())
}
