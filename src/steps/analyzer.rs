//! Project analysis step.
//!
//! Scans the project tree (bounded in file count and size), records which
//! dependency manifests are present, and detects the implementation
//! language (manifests first, file extensions as a fallback), plus a
//! light framework sniff from manifest contents.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{
    Language, PipelineContext, ProjectProfile, StepError, StepKind, WorkflowRequest,
};

use super::{StepExecutor, StepOutcome};

/// Files larger than this are skipped during the scan.
const MAX_FILE_SIZE: u64 = 100 * 1024;

/// At most this many files are scanned.
const MAX_FILES: usize = 30;

/// Directories that never contain anything worth scanning.
const SKIP_DIRS: &[&str] = &["node_modules", "target", "__pycache__", "venv", "dist", "helm"];

/// Dependency manifests, in detection-priority order.
const MANIFESTS: &[(&str, Language)] = &[
    ("requirements.txt", Language::Python),
    ("pyproject.toml", Language::Python),
    ("package.json", Language::Node),
    ("go.mod", Language::Go),
    ("Cargo.toml", Language::Rust),
    ("pom.xml", Language::Java),
    ("build.gradle", Language::Java),
    ("Gemfile", Language::Ruby),
    ("composer.json", Language::Php),
];

/// Framework markers looked for inside a manifest: (marker, framework).
const FRAMEWORKS: &[(&str, &[(&str, &str)])] = &[
    (
        "requirements.txt",
        &[("fastapi", "fastapi"), ("flask", "flask"), ("django", "django")],
    ),
    (
        "pyproject.toml",
        &[("fastapi", "fastapi"), ("flask", "flask"), ("django", "django")],
    ),
    (
        "package.json",
        &[("express", "express"), ("fastify", "fastify"), ("next", "next")],
    ),
    (
        "Cargo.toml",
        &[("axum", "axum"), ("actix-web", "actix-web"), ("rocket", "rocket")],
    ),
    ("go.mod", &[("gin-gonic", "gin"), ("labstack/echo", "echo")]),
];

/// Project analyzer.
#[derive(Debug, Default)]
pub struct ProjectAnalyzer;

impl ProjectAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a project directory into a profile.
    ///
    /// Also usable outside the pipeline (e.g. `slipway analyze`).
    #[instrument(skip(self))]
    pub fn analyze(&self, path: &Path) -> Result<ProjectProfile, StepError> {
        if !path.is_dir() {
            return Err(StepError::Analysis(format!(
                "project path does not exist or is not a directory: {}",
                path.display()
            )));
        }

        let mut files = Vec::new();
        collect_files(path, path, &mut files);

        if files.is_empty() {
            return Err(StepError::Analysis(format!(
                "no relevant files found in project directory: {}",
                path.display()
            )));
        }

        let extensions: BTreeSet<String> = files
            .iter()
            .filter_map(|f| Path::new(f).extension())
            .filter_map(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .collect();

        let manifests: Vec<String> = MANIFESTS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| path.join(name).is_file())
            .map(str::to_string)
            .collect();

        let language = detect_language(&manifests, &extensions);
        let framework = detect_framework(path, &manifests);

        debug!(
            %language,
            files = files.len(),
            manifests = manifests.len(),
            "project analyzed"
        );

        Ok(ProjectProfile {
            root: path.to_path_buf(),
            language,
            framework,
            manifests,
            total_files: files.len(),
            files,
            extensions,
        })
    }
}

#[async_trait]
impl StepExecutor for ProjectAnalyzer {
    fn kind(&self) -> StepKind {
        StepKind::AnalyzeProject
    }

    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let profile = self.analyze(&request.project_path)?;
        Ok(StepOutcome::new(context.with_profile(profile)))
    }
}

/// Collect relative file paths, bounded by `MAX_FILES` and `MAX_FILE_SIZE`.
fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) {
    if files.len() >= MAX_FILES {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        if files.len() >= MAX_FILES {
            return;
        }

        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if !SKIP_DIRS.contains(&name.as_ref()) {
                collect_files(root, &path, files);
            }
            continue;
        }

        if let Ok(meta) = entry.metadata() {
            if meta.len() > MAX_FILE_SIZE {
                continue;
            }
        }

        if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_string_lossy().into_owned());
        }
    }
}

/// Manifests are the reliable signal; extensions are the fallback.
fn detect_language(manifests: &[String], extensions: &BTreeSet<String>) -> Language {
    for (name, language) in MANIFESTS {
        if manifests.iter().any(|m| m == name) {
            return *language;
        }
    }

    const BY_EXTENSION: &[(&str, Language)] = &[
        (".py", Language::Python),
        (".js", Language::Node),
        (".ts", Language::Node),
        (".go", Language::Go),
        (".rs", Language::Rust),
        (".java", Language::Java),
        (".rb", Language::Ruby),
        (".php", Language::Php),
    ];

    for (ext, language) in BY_EXTENSION {
        if extensions.contains(*ext) {
            return *language;
        }
    }

    Language::Unknown
}

/// Look inside present manifests for a known framework name.
fn detect_framework(root: &Path, manifests: &[String]) -> Option<String> {
    for (manifest, markers) in FRAMEWORKS {
        if !manifests.iter().any(|m| m == manifest) {
            continue;
        }
        let Ok(content) = fs::read_to_string(root.join(manifest)) else {
            continue;
        };
        let content = content.to_lowercase();
        for (marker, name) in *markers {
            if content.contains(marker) {
                return Some((*name).to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_beats_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.mod"), "module demo\n\ngo 1.21\n").unwrap();
        // A stray script must not override the manifest signal
        fs::write(temp.path().join("tool.py"), "print('hi')\n").unwrap();

        let profile = ProjectAnalyzer::new().analyze(temp.path()).unwrap();

        assert_eq!(profile.language, Language::Go);
        assert!(profile.has_manifest("go.mod"));
    }

    #[test]
    fn test_extension_fallback() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.rb"), "puts 'hi'\n").unwrap();

        let profile = ProjectAnalyzer::new().analyze(temp.path()).unwrap();
        assert_eq!(profile.language, Language::Ruby);
        assert!(profile.manifests.is_empty());
    }

    #[test]
    fn test_framework_detection() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("requirements.txt"),
            "fastapi==0.100\nuvicorn\n",
        )
        .unwrap();
        fs::write(temp.path().join("main.py"), "app = FastAPI()\n").unwrap();

        let profile = ProjectAnalyzer::new().analyze(temp.path()).unwrap();

        assert_eq!(profile.language, Language::Python);
        assert_eq!(profile.framework.as_deref(), Some("fastapi"));
    }

    #[test]
    fn test_empty_project_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = ProjectAnalyzer::new().analyze(temp.path());
        assert!(matches!(result, Err(StepError::Analysis(_))));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = ProjectAnalyzer::new().analyze(&temp.path().join("nope"));
        assert!(matches!(result, Err(StepError::Analysis(_))));
    }

    #[test]
    fn test_hidden_and_vendored_dirs_are_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git").join("HEAD"), "ref\n").unwrap();
        fs::create_dir(temp.path().join("node_modules")).unwrap();
        fs::write(temp.path().join("node_modules").join("x.js"), "x\n").unwrap();
        fs::write(temp.path().join("package.json"), "{}\n").unwrap();

        let profile = ProjectAnalyzer::new().analyze(temp.path()).unwrap();

        assert_eq!(profile.total_files, 1);
        assert!(profile.has_file("package.json"));
    }

    #[tokio::test]
    async fn test_execute_populates_context() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), "{}\n").unwrap();

        let request = WorkflowRequest {
            project_path: temp.path().to_path_buf(),
            app_name: "demo".to_string(),
            namespace: "default".to_string(),
            image_tag: "latest".to_string(),
            port: 8080,
            optimize_for_size: false,
            multi_stage: false,
            custom_instructions: Vec::new(),
            cluster_profile: "slipway-cluster".to_string(),
        };

        let outcome = ProjectAnalyzer::new()
            .execute(&request, PipelineContext::default())
            .await
            .unwrap();

        let profile = outcome.context.profile.unwrap();
        assert_eq!(profile.language, Language::Node);
    }
}
