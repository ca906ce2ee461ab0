//! Common types for kubestress: errors, manifest decoding and client setup

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod logging;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace used for pods whose template leaves the namespace unset, and for
/// the default service account
pub const DEFAULT_NAMESPACE: &str = "default";

/// Taint key the node lifecycle controller applies to nodes that are not ready
pub const NOT_READY_TAINT_KEY: &str = "node.kubernetes.io/not-ready";

/// Field manager / user agent name reported to the API server
pub const FIELD_MANAGER: &str = "kubestress";
