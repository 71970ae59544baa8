// ABOUTME: Error types for manifest parsing and placeholder resolution.
// ABOUTME: Covers malformed documents, route shapes, and instance-count fields.

use thiserror::Error;

/// Errors raised while interpreting a deployment manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest document has no top-level application list.
    #[error("manifest contains no application config")]
    NoApplicationList,

    /// A `routes` entry is not a `{route: <string>}` mapping.
    #[error("invalid route format in manifest")]
    InvalidRouteFormat,

    /// The instance-count field references a variable but no variable file
    /// was supplied.
    #[error("no valid variable file found, verify a var file is present and has valid structure")]
    MissingVariableFile,

    /// The instance-count field did not resolve to an integer.
    #[error("instance count is not a valid integer: {0}")]
    InvalidInstanceCount(String),

    /// A manifest or variable document failed to parse.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
