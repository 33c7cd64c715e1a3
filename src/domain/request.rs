//! Workflow request types.
//!
//! A `DeployRequest` is what a caller hands in; a `WorkflowRequest` is the
//! validated, default-filled form the orchestrator works with.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw deployment request, as received from the CLI or an embedding caller.
///
/// Optional fields are filled from configuration defaults during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    /// Path to the project root directory
    pub project_path: PathBuf,

    /// Application name (DNS label, used for image, chart and release)
    pub app_name: String,

    /// Target namespace (defaults to the configured namespace)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Image tag (defaults to the configured tag)
    #[serde(default)]
    pub image_tag: Option<String>,

    /// Port the application listens on
    pub port: u16,

    /// Prefer smaller base images
    #[serde(default)]
    pub optimize_for_size: bool,

    /// Use a multi-stage build template where the language has one
    #[serde(default)]
    pub multi_stage: bool,

    /// Free-text Dockerfile directives, appended verbatim in order
    #[serde(default)]
    pub custom_instructions: Vec<String>,

    /// Cluster profile to deploy into (defaults to the configured profile)
    #[serde(default)]
    pub cluster_profile: Option<String>,
}

/// A fully validated workflow request. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub project_path: PathBuf,
    pub app_name: String,
    pub namespace: String,
    pub image_tag: String,
    pub port: u16,
    pub optimize_for_size: bool,
    pub multi_stage: bool,
    pub custom_instructions: Vec<String>,
    pub cluster_profile: String,
}

impl WorkflowRequest {
    /// Image reference built from the app name and tag (e.g. `demo:latest`).
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.app_name, self.image_tag)
    }

    /// Release name used when installing the chart.
    pub fn release_name(&self) -> &str {
        &self.app_name
    }
}
