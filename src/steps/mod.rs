//! Step executors for the deployment pipeline.
//!
//! Every collaborator (analyzer, generators, builder, cluster manager,
//! loader, installer) satisfies the same contract: take the request and
//! the current pipeline context, return a replacement context plus the
//! artifacts produced, or a `StepError`. The orchestrator stays agnostic
//! to what a step actually does.

pub mod analyzer;
pub mod chart;
pub mod cluster;
pub mod dockerfile;
pub mod image;
pub mod installer;
pub mod loader;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::Config;
use crate::domain::{Artifact, ArtifactKind, PipelineContext, StepError, StepKind, WorkflowRequest};

// Re-export the executors
pub use analyzer::ProjectAnalyzer;
pub use chart::ChartGenerator;
pub use cluster::ClusterManager;
pub use dockerfile::DockerfileGenerator;
pub use image::ImageBuilder;
pub use installer::ChartInstaller;
pub use loader::ImageLoader;

/// What a step hands back on success.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Replacement pipeline context for the next step
    pub context: PipelineContext,

    /// References to what this step produced
    pub artifacts: Vec<Artifact>,

    /// Whether the step's precondition was already satisfied and nothing
    /// was recreated
    pub reused: bool,
}

impl StepOutcome {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            artifacts: Vec::new(),
            reused: false,
        }
    }

    pub fn with_artifact(mut self, kind: ArtifactKind, reference: impl Into<String>) -> Self {
        self.artifacts.push(Artifact::new(kind, reference));
        self
    }

    pub fn reused(mut self) -> Self {
        self.reused = true;
        self
    }
}

/// Uniform contract every pipeline step satisfies.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Which pipeline step this executor implements
    fn kind(&self) -> StepKind;

    /// Execute the step against the current context.
    ///
    /// Implementations report failure through the returned `StepError`;
    /// the orchestrator additionally normalizes any escaping fault into a
    /// failed step record, so bookkeeping is never bypassed.
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError>;
}

/// The standard executors, in plan order.
pub fn standard_steps(config: &Config) -> Vec<Arc<dyn StepExecutor>> {
    vec![
        Arc::new(ProjectAnalyzer::new()),
        Arc::new(DockerfileGenerator::new()),
        Arc::new(ImageBuilder::new(config)),
        Arc::new(ClusterManager::new(config)),
        Arc::new(ImageLoader::new(config)),
        Arc::new(ChartGenerator::new()),
        Arc::new(ChartInstaller::new(config)),
    ]
}

/// Captured output of an external tool invocation.
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    /// Exit status code (-1 when terminated by a signal)
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run an external tool, capturing output, with a hard timeout.
///
/// A nonzero exit is returned as a normal `CommandOutput`; only spawn
/// failures and timeouts are errors. Callers map both into their own
/// `StepError` variant.
pub(crate) async fn run_command(
    program: &str,
    args: &[&str],
    step_timeout: Duration,
) -> Result<CommandOutput> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", program))?;

    let output = timeout(step_timeout, child.wait_with_output())
        .await
        .with_context(|| format!("'{}' timed out after {:?}", program, step_timeout))?
        .with_context(|| format!("Failed to wait for '{}'", program))?;

    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command("echo", &["hello"], Duration::from_secs(5))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit_is_not_an_error() {
        let output = run_command("sh", &["-c", "echo oops >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.status, 3);
        assert_eq!(output.stderr, "oops");
    }

    #[tokio::test]
    async fn test_run_command_missing_binary_is_an_error() {
        let result =
            run_command("definitely-not-a-binary", &[], Duration::from_secs(5)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_outcome_builder() {
        let outcome = StepOutcome::new(PipelineContext::default())
            .with_artifact(ArtifactKind::Image, "demo:latest")
            .reused();

        assert!(outcome.reused);
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].reference, "demo:latest");
    }
}
