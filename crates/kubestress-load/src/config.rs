//! Load configuration
//!
//! A [`LoadConfig`] is checked once, before any credentials are read or any
//! cluster call is made, and is immutable for the rest of the run.

use std::path::PathBuf;

use kubestress_common::kube_utils::TransportConfig;
use kubestress_common::Error;

use crate::pool::DEFAULT_MAX_WORKERS;
use crate::scenario::TemplateSource;

/// Settings for one load run
#[derive(Clone, Debug, PartialEq)]
pub struct LoadConfig {
    /// Kubeconfig of the target cluster
    pub kubeconfig: PathBuf,
    /// Scenario to materialize
    pub scenario_name: String,
    /// How many times every template in the scenario is created
    pub repeat_count: u32,
    /// Upper bound on concurrently running creation tasks
    pub max_workers: usize,
    /// Client-side rate limits and timeouts
    pub transport: TransportConfig,
    /// Where scenario templates come from
    pub templates: TemplateSource,
}

impl LoadConfig {
    /// Config with default pool size, transport and embedded templates
    pub fn new(
        kubeconfig: impl Into<PathBuf>,
        scenario_name: impl Into<String>,
        repeat_count: u32,
    ) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            scenario_name: scenario_name.into(),
            repeat_count,
            max_workers: DEFAULT_MAX_WORKERS,
            transport: TransportConfig::default(),
            templates: TemplateSource::default(),
        }
    }

    /// Reject configurations that must never reach the cluster
    pub fn validate(&self) -> Result<(), Error> {
        if self.scenario_name.trim().is_empty() {
            return Err(Error::validation_for_field(
                "scenario_name",
                "scenario name is required",
            ));
        }
        if self.kubeconfig.as_os_str().is_empty() {
            return Err(Error::validation_for_field(
                "kubeconfig",
                "kubeconfig path is required",
            ));
        }
        if self.repeat_count == 0 {
            return Err(Error::validation_for_field(
                "repeat_count",
                "repeat count must be at least 1",
            ));
        }
        if self.max_workers == 0 {
            return Err(Error::validation_for_field(
                "max_workers",
                "max workers must be at least 1",
            ));
        }
        self.transport.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: Error) -> Option<String> {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn new_uses_defaults() {
        let config = LoadConfig::new("/tmp/kubeconfig", "a", 3);
        assert_eq!(config.max_workers, 500);
        assert_eq!(config.templates, TemplateSource::Embedded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_scenario_name_is_rejected() {
        let config = LoadConfig::new("/tmp/kubeconfig", "  ", 1);
        assert_eq!(
            field_of(config.validate().unwrap_err()).as_deref(),
            Some("scenario_name")
        );
    }

    #[test]
    fn empty_kubeconfig_is_rejected() {
        let config = LoadConfig::new("", "a", 1);
        assert_eq!(
            field_of(config.validate().unwrap_err()).as_deref(),
            Some("kubeconfig")
        );
    }

    #[test]
    fn zero_repeat_count_is_rejected() {
        let config = LoadConfig::new("/tmp/kubeconfig", "a", 0);
        assert_eq!(
            field_of(config.validate().unwrap_err()).as_deref(),
            Some("repeat_count")
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = LoadConfig::new("/tmp/kubeconfig", "a", 1);
        config.max_workers = 0;
        assert_eq!(
            field_of(config.validate().unwrap_err()).as_deref(),
            Some("max_workers")
        );
    }

    #[test]
    fn transport_errors_surface_through_validate() {
        let mut config = LoadConfig::new("/tmp/kubeconfig", "a", 1);
        config.transport.burst = 0;
        assert_eq!(
            field_of(config.validate().unwrap_err()).as_deref(),
            Some("burst")
        );
    }
}
