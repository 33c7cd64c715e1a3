//! Pipeline context and artifacts.
//!
//! The context is the typed carrier of everything the steps produce. Each
//! step consumes it by value and returns a replacement, so no step can see
//! or mutate another step's private state. It lives only for one workflow
//! execution; the durable trace of what was produced is the artifact list
//! on each step record.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Artifact carrier threaded between steps within one workflow execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Result of project analysis
    pub profile: Option<ProjectProfile>,

    /// Path of the generated Dockerfile
    pub dockerfile: Option<PathBuf>,

    /// Reference of the built image (e.g. `demo:latest`)
    pub image: Option<String>,

    /// Directory of the generated chart
    pub chart_dir: Option<PathBuf>,

    /// Name of the installed release
    pub release: Option<String>,

    /// Whether the cluster was already reachable and got reused
    #[serde(default)]
    pub cluster_reused: bool,
}

impl PipelineContext {
    pub fn with_profile(mut self, profile: ProjectProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_dockerfile(mut self, path: PathBuf) -> Self {
        self.dockerfile = Some(path);
        self
    }

    pub fn with_image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_chart_dir(mut self, dir: PathBuf) -> Self {
        self.chart_dir = Some(dir);
        self
    }

    pub fn with_release(mut self, release: String) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_cluster_reused(mut self, reused: bool) -> Self {
        self.cluster_reused = reused;
        self
    }
}

/// A reference to something a step produced, recorded on its step record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub reference: String,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }
}

/// Kinds of artifacts the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Generated Dockerfile path
    Dockerfile,

    /// Built image reference
    Image,

    /// Generated chart directory
    ChartDir,

    /// Installed release name
    Release,
}

/// What project analysis discovered about the target project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProfile {
    /// Absolute project root
    pub root: PathBuf,

    /// Detected implementation language
    pub language: Language,

    /// Detected framework, when a manifest names one
    pub framework: Option<String>,

    /// Dependency manifests found at the project root
    pub manifests: Vec<String>,

    /// Relative paths of the scanned files
    pub files: Vec<String>,

    /// File extensions seen during the scan
    pub extensions: BTreeSet<String>,

    /// Number of files scanned
    pub total_files: usize,
}

impl ProjectProfile {
    pub fn has_manifest(&self, name: &str) -> bool {
        self.manifests.iter().any(|m| m == name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }
}

/// Languages the analyzer can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Node,
    Go,
    Rust,
    Java,
    Ruby,
    Php,
    Unknown,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Language::Python => "python",
            Language::Node => "node.js",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
