//! Error taxonomy for the workflow core.
//!
//! Three families: `ValidationError` (request rejected before anything
//! runs, carries every violation found), `StepError` (one failed
//! collaborator, always attached to exactly one step record), and
//! `ProgressError` (progress queries and store writes).

use std::path::PathBuf;

use thiserror::Error;

use super::record::WorkflowId;
use super::step::StepKind;

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("project path does not exist or is not a directory: {}", .0.display())]
    ProjectPath(PathBuf),

    #[error(
        "application name must be a DNS label \
         (lowercase alphanumerics and dashes, at most 63 characters): {0:?}"
    )]
    AppName(String),

    #[error("port must be in the range 1..=65535, got {0}")]
    Port(u16),

    #[error("namespace must be a DNS label: {0:?}")]
    Namespace(String),
}

/// Request rejected before any step ran. Lists every violation found,
/// not just the first.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl std::error::Error for ValidationError {}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid workflow request ({} violation", self.violations.len())?;
        if self.violations.len() != 1 {
            write!(f, "s")?;
        }
        write!(f, "):")?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

/// Failure of one collaborator step.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("project analysis failed: {0}")]
    Analysis(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("image build failed (exit {status}): {stderr}")]
    Build { status: i32, stderr: String },

    #[error("cluster unavailable: {0}")]
    Cluster(String),

    #[error("image load failed: {0}")]
    Load(String),

    #[error("chart install failed: {0}")]
    Deploy(String),
}

/// Progress store errors.
#[derive(Debug, Clone, Error)]
pub enum ProgressError {
    /// Progress query for an id that was never created
    #[error("workflow not found: {0}")]
    NotFound(WorkflowId),

    /// Attempt to transition a step record that already resolved
    #[error("step {step} of workflow {id} is already terminal")]
    TerminalStep { id: WorkflowId, step: StepKind },
}

/// Top-level error for driving a workflow to completion.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Progress(#[from] ProgressError),
}
