//! Scenario template store
//!
//! A scenario is a named set of Node and Pod templates. Built-in scenarios
//! are compiled into the binary; `TemplateSource::Directory` reads the same
//! layout from disk (`<dir>/<scenario>/*.yaml`).
//!
//! Templates are decoded once and never mutated afterwards; the engine shares
//! them read-only between tasks and each task clones the template it creates.

use std::fs;
use std::path::{Path, PathBuf};

use k8s_openapi::api::core::v1::{Node, Pod, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use tracing::debug;

use kubestress_common::yaml::{from_manifest, manifest_kind, parse_manifests};
use kubestress_common::Error;

/// File name of the default service account manifest
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "default-service-account.yaml";

const DEFAULT_SERVICE_ACCOUNT: &str = include_str!("../../scenarios/default-service-account.yaml");

/// Built-in scenarios: name and (file name, contents) pairs
const EMBEDDED_SCENARIOS: &[(&str, &[(&str, &str)])] = &[(
    "a",
    &[
        ("node-p.yaml", include_str!("../../scenarios/a/node-p.yaml")),
        ("pod-p.yaml", include_str!("../../scenarios/a/pod-p.yaml")),
    ],
)];

/// Names of the scenarios compiled into the binary
pub fn builtin_scenarios() -> impl Iterator<Item = &'static str> {
    EMBEDDED_SCENARIOS.iter().map(|(name, _)| *name)
}

/// Where scenario templates are read from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Scenarios compiled into the binary
    #[default]
    Embedded,
    /// `<dir>/<scenario>/*.yaml`, plus an optional `<dir>/default-service-account.yaml`
    Directory(PathBuf),
}

/// A decoded template, tagged by kind
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateObject {
    /// Node template
    Node(Box<Node>),
    /// Pod template
    Pod(Box<Pod>),
}

impl TemplateObject {
    /// Decode a manifest into a Node or Pod template
    pub fn from_manifest(manifest: Value) -> Result<Self, String> {
        match manifest_kind(&manifest) {
            Some("Node") => from_manifest(manifest)
                .map(|node| TemplateObject::Node(Box::new(node)))
                .map_err(|e| format!("invalid Node template: {}", e)),
            Some("Pod") => from_manifest(manifest)
                .map(|pod| TemplateObject::Pod(Box::new(pod)))
                .map_err(|e| format!("invalid Pod template: {}", e)),
            Some(other) => Err(format!("unsupported template kind {}", other)),
            None => Err("template has no kind".to_string()),
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        match self {
            TemplateObject::Node(node) => &node.metadata,
            TemplateObject::Pod(pod) => &pod.metadata,
        }
    }
}

/// Templates for one scenario
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioData {
    /// Node templates in file order
    pub template_nodes: Vec<Node>,
    /// Pod templates in file order
    pub template_pods: Vec<Pod>,
}

impl ScenarioData {
    /// Decode a scenario from `(file name, YAML)` pairs
    pub fn from_files<'a>(
        scenario: &str,
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, Error> {
        let mut data = ScenarioData::default();
        for (file, contents) in files {
            let manifests = parse_manifests(contents)
                .map_err(|e| Error::template(scenario, format!("{}: {}", file, e)))?;
            for manifest in manifests {
                let template = TemplateObject::from_manifest(manifest)
                    .map_err(|e| Error::template(scenario, format!("{}: {}", file, e)))?;
                if template.metadata().generate_name.as_deref().unwrap_or("").is_empty() {
                    return Err(Error::template(
                        scenario,
                        format!("{}: template has no metadata.generateName", file),
                    ));
                }
                match template {
                    TemplateObject::Node(node) => data.template_nodes.push(*node),
                    TemplateObject::Pod(pod) => data.template_pods.push(*pod),
                }
            }
        }

        if data.is_empty() {
            return Err(Error::template(scenario, "scenario has no templates"));
        }
        Ok(data)
    }

    /// Number of templates, i.e. tasks submitted per repetition
    pub fn template_count(&self) -> usize {
        self.template_nodes.len() + self.template_pods.len()
    }

    /// True when the scenario has neither node nor pod templates
    pub fn is_empty(&self) -> bool {
        self.template_count() == 0
    }
}

impl TemplateSource {
    /// Load the named scenario's templates
    pub fn load_scenario(&self, name: &str) -> Result<ScenarioData, Error> {
        let data = match self {
            TemplateSource::Embedded => {
                let (_, files) = EMBEDDED_SCENARIOS
                    .iter()
                    .find(|(scenario, _)| *scenario == name)
                    .ok_or_else(|| {
                        Error::template(
                            name,
                            format!(
                                "unknown scenario, built-in scenarios are: {}",
                                builtin_scenarios().collect::<Vec<_>>().join(", ")
                            ),
                        )
                    })?;
                ScenarioData::from_files(name, files.iter().copied())?
            }
            TemplateSource::Directory(dir) => load_scenario_dir(dir, name)?,
        };

        debug!(
            scenario = %name,
            nodes = data.template_nodes.len(),
            pods = data.template_pods.len(),
            "loaded scenario templates"
        );
        Ok(data)
    }

    /// Load the default service account template
    pub fn load_default_service_account(&self) -> Result<ServiceAccount, Error> {
        let contents = match self {
            TemplateSource::Directory(dir) => {
                let path = dir.join(DEFAULT_SERVICE_ACCOUNT_FILE);
                if path.is_file() {
                    read_file(DEFAULT_SERVICE_ACCOUNT_FILE, &path)?
                } else {
                    DEFAULT_SERVICE_ACCOUNT.to_string()
                }
            }
            TemplateSource::Embedded => DEFAULT_SERVICE_ACCOUNT.to_string(),
        };
        parse_service_account(&contents)
    }
}

fn parse_service_account(contents: &str) -> Result<ServiceAccount, Error> {
    let scenario = DEFAULT_SERVICE_ACCOUNT_FILE;
    let manifest = parse_manifests(contents)
        .map_err(|e| Error::template(scenario, e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| Error::template(scenario, "no ServiceAccount manifest"))?;
    match manifest_kind(&manifest) {
        Some("ServiceAccount") => {
            from_manifest(manifest).map_err(|e| Error::template(scenario, e.to_string()))
        }
        other => Err(Error::template(
            scenario,
            format!("expected kind ServiceAccount, got {}", other.unwrap_or("none")),
        )),
    }
}

fn load_scenario_dir(dir: &Path, name: &str) -> Result<ScenarioData, Error> {
    let scenario_dir = dir.join(name);
    if !scenario_dir.is_dir() {
        return Err(Error::template(
            name,
            format!("unknown scenario, {} is not a directory", scenario_dir.display()),
        ));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&scenario_dir)
        .map_err(|e| Error::template(name, format!("{}: {}", scenario_dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    paths.sort();

    let files = paths
        .iter()
        .map(|path| {
            let file = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or_default()
                .to_string();
            read_file(name, path).map(|contents| (file, contents))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ScenarioData::from_files(
        name,
        files.iter().map(|(file, contents)| (file.as_str(), contents.as_str())),
    )
}

fn read_file(scenario: &str, path: &Path) -> Result<String, Error> {
    fs::read_to_string(path)
        .map_err(|e| Error::template(scenario, format!("failed to read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubestress_common::NOT_READY_TAINT_KEY;

    const NODE_TEMPLATE: &str = r#"
apiVersion: v1
kind: Node
metadata:
  generateName: big-node-
"#;

    const POD_TEMPLATE: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  generateName: web-
  namespace: load
spec:
  containers:
    - name: app
      image: registry.k8s.io/pause:3.10
"#;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn builtin_scenario_a_has_one_node_and_one_pod() {
        let data = TemplateSource::Embedded.load_scenario("a").unwrap();
        assert_eq!(data.template_nodes.len(), 1);
        assert_eq!(data.template_pods.len(), 1);
        assert_eq!(data.template_count(), 2);

        let node = &data.template_nodes[0];
        assert_eq!(node.metadata.generate_name.as_deref(), Some("node-"));
        let taints = node.spec.as_ref().unwrap().taints.as_ref().unwrap();
        assert!(taints.iter().any(|t| t.key == NOT_READY_TAINT_KEY));
        assert!(node.status.as_ref().unwrap().capacity.is_some());

        let pod = &data.template_pods[0];
        assert_eq!(pod.metadata.generate_name.as_deref(), Some("pod-"));
        assert!(pod.metadata.namespace.is_none());
    }

    #[test]
    fn unknown_builtin_scenario_lists_known_ones() {
        let err = TemplateSource::Embedded.load_scenario("zzz").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("zzz"));
        assert!(msg.contains("built-in scenarios are: a"));
    }

    #[test]
    fn embedded_default_service_account() {
        let sa = TemplateSource::Embedded
            .load_default_service_account()
            .unwrap();
        assert_eq!(sa.metadata.name.as_deref(), Some("default"));
        assert_eq!(sa.metadata.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn directory_scenario_reads_yaml_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mixed/02-pods.yml", POD_TEMPLATE);
        write(
            dir.path(),
            "mixed/01-nodes.yaml",
            &format!("{}---\n{}", NODE_TEMPLATE, NODE_TEMPLATE.replace("big-", "small-")),
        );
        write(dir.path(), "mixed/README.md", "not a template");

        let source = TemplateSource::Directory(dir.path().to_path_buf());
        let data = source.load_scenario("mixed").unwrap();
        let prefixes: Vec<_> = data
            .template_nodes
            .iter()
            .map(|n| n.metadata.generate_name.clone().unwrap())
            .collect();
        assert_eq!(prefixes, vec!["big-node-", "small-node-"]);
        assert_eq!(data.template_pods.len(), 1);
        assert_eq!(
            data.template_pods[0].metadata.namespace.as_deref(),
            Some("load")
        );
    }

    #[test]
    fn missing_directory_scenario_is_a_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = TemplateSource::Directory(dir.path().to_path_buf());
        assert!(matches!(
            source.load_scenario("nope"),
            Err(Error::Template { .. })
        ));
    }

    #[test]
    fn directory_service_account_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            DEFAULT_SERVICE_ACCOUNT_FILE,
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: loader\n  namespace: load\n",
        );
        let source = TemplateSource::Directory(dir.path().to_path_buf());
        let sa = source.load_default_service_account().unwrap();
        assert_eq!(sa.metadata.name.as_deref(), Some("loader"));

        let empty = tempfile::tempdir().unwrap();
        let fallback = TemplateSource::Directory(empty.path().to_path_buf())
            .load_default_service_account()
            .unwrap();
        assert_eq!(fallback.metadata.name.as_deref(), Some("default"));
    }

    #[test]
    fn service_account_file_must_hold_a_service_account() {
        let err = parse_service_account(POD_TEMPLATE).unwrap_err();
        assert!(err.to_string().contains("expected kind ServiceAccount"));
    }

    #[test]
    fn unsupported_kind_is_rejected() {
        let deployment = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  generateName: d-\n";
        let err = ScenarioData::from_files("s", [("d.yaml", deployment)]).unwrap_err();
        assert!(err.to_string().contains("unsupported template kind Deployment"));
    }

    #[test]
    fn template_without_generate_name_is_rejected() {
        let fixed = "apiVersion: v1\nkind: Node\nmetadata:\n  name: fixed\n";
        let err = ScenarioData::from_files("s", [("n.yaml", fixed)]).unwrap_err();
        assert!(err.to_string().contains("generateName"));
    }

    #[test]
    fn empty_scenario_is_rejected() {
        let err = ScenarioData::from_files("s", [("empty.yaml", "---\n")]).unwrap_err();
        assert!(err.to_string().contains("no templates"));
    }
}
