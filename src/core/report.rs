//! Result aggregation.
//!
//! `summarize` reduces a workflow record into a terminal report: overall
//! state, per-step durations, the first failure cause when one exists,
//! and the artifacts of succeeded steps. It is a pure function of the
//! record and is used both for the terminal response and for rendering.

use serde::Serialize;

use crate::domain::{
    Artifact, StepKind, StepState, WorkflowId, WorkflowRecord, WorkflowState,
};

/// Terminal summary of a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub id: WorkflowId,
    pub app_name: String,
    pub namespace: String,
    pub overall: WorkflowState,
    pub steps: Vec<StepSummary>,
    /// Present only when overall state is `Failed` or `PartiallyFailed`
    pub first_failure: Option<FailureCause>,
    /// Artifacts of succeeded steps; skipped and failed steps contribute
    /// nothing
    pub artifacts: Vec<Artifact>,
}

/// One step, summarized.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub step: StepKind,
    pub state: StepState,
    pub duration_ms: Option<u64>,
    pub reused: bool,
}

/// The step that sank the workflow.
#[derive(Debug, Clone, Serialize)]
pub struct FailureCause {
    pub step: StepKind,
    pub error: String,
}

/// Reduce a workflow record into its report.
pub fn summarize(record: &WorkflowRecord) -> WorkflowReport {
    let overall = record.overall_state();

    let steps = record
        .steps
        .iter()
        .map(|step| StepSummary {
            step: step.kind,
            state: step.state,
            duration_ms: step.duration_ms(),
            reused: step.reused,
        })
        .collect();

    let first_failure = match overall {
        WorkflowState::Failed | WorkflowState::PartiallyFailed => {
            record.first_failure().map(|step| FailureCause {
                step: step.kind,
                error: step.error.clone().unwrap_or_default(),
            })
        }
        _ => None,
    };

    let artifacts = record
        .steps
        .iter()
        .filter(|step| step.state == StepState::Succeeded)
        .flat_map(|step| step.artifacts.iter().cloned())
        .collect();

    WorkflowReport {
        id: record.id,
        app_name: record.request.app_name.clone(),
        namespace: record.request.namespace.clone(),
        overall,
        steps,
        first_failure,
        artifacts,
    }
}
