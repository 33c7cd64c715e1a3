//! Workflow and step records.
//!
//! A `WorkflowRecord` is the append-until-terminal log of one pipeline
//! invocation. It is created with all seven step records in `Pending`
//! state, so the full plan is visible to observers before the first step
//! runs, and is mutated step by step until the last attempted step
//! resolves. The overall state is always derived from the step records,
//! never stored on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::Artifact;
use super::request::WorkflowRequest;
use super::step::{StepKind, STEP_PLAN};

/// Opaque workflow identifier. The only key for progress lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for WorkflowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// State of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Not yet started
    Pending,

    /// Currently executing
    Running,

    /// Resolved successfully
    Succeeded,

    /// Resolved with an error
    Failed,

    /// Never run because an earlier step failed
    Skipped,
}

impl StepState {
    /// Terminal step records are never mutated again.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepState::Succeeded | StepState::Failed)
    }
}

/// Record of one step of one workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Which pipeline step this is
    pub kind: StepKind,

    /// Current state
    pub state: StepState,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When the step resolved
    pub finished_at: Option<DateTime<Utc>>,

    /// References to what the step produced
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Set when the step's precondition was already satisfied and nothing
    /// was recreated (e.g. a cluster that was already running)
    #[serde(default)]
    pub reused: bool,

    /// Error detail, present only in `Failed` state
    pub error: Option<String>,
}

impl StepRecord {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            state: StepState::Pending,
            started_at: None,
            finished_at: None,
            artifacts: Vec::new(),
            reused: false,
            error: None,
        }
    }

    /// Wall-clock duration in milliseconds, once the step has resolved.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => {
                let millis = end.signed_duration_since(start).num_milliseconds();
                Some(millis.max(0) as u64)
            }
            _ => None,
        }
    }
}

/// Derived overall state of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Steps remain to be attempted
    Running,

    /// Every step succeeded
    Succeeded,

    /// The first step failed; nothing was produced
    Failed,

    /// A later step failed after at least one success; some artifacts exist
    PartiallyFailed,
}

/// The progress record of one workflow invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Workflow id
    pub id: WorkflowId,

    /// Immutable snapshot of the originating request
    pub request: WorkflowRequest,

    /// One record per pipeline step, in plan order
    pub steps: Vec<StepRecord>,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRecord {
    /// Create a record with the full step plan in `Pending` state.
    pub fn new(id: WorkflowId, request: WorkflowRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            request,
            steps: STEP_PLAN.iter().map(|kind| StepRecord::new(*kind)).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, kind: StepKind) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn step_mut(&mut self, kind: StepKind) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.kind == kind)
    }

    /// Derive the overall state from the step records.
    ///
    /// `Succeeded` iff every step succeeded; `Failed` iff a step failed
    /// with no prior success; `PartiallyFailed` iff a step failed after at
    /// least one success; `Running` otherwise.
    pub fn overall_state(&self) -> WorkflowState {
        if self.steps.iter().all(|s| s.state == StepState::Succeeded) {
            return WorkflowState::Succeeded;
        }

        if let Some(failed_idx) = self.steps.iter().position(|s| s.state == StepState::Failed) {
            let any_prior_success = self.steps[..failed_idx]
                .iter()
                .any(|s| s.state == StepState::Succeeded);
            return if any_prior_success {
                WorkflowState::PartiallyFailed
            } else {
                WorkflowState::Failed
            };
        }

        WorkflowState::Running
    }

    /// Whether no further steps will be attempted.
    pub fn is_finished(&self) -> bool {
        self.overall_state() != WorkflowState::Running
    }

    /// The first failed step and its error, when one exists.
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.state == StepState::Failed)
    }
}
