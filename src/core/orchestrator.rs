//! Main orchestrator for workflow execution.
//!
//! Drives the fixed step sequence as a per-step state machine
//! (`Pending -> Running -> Succeeded | Failed`), threads the pipeline
//! context between steps, and keeps the progress store current. After
//! the first failure, every remaining step transitions to `Skipped` and
//! execution stops; there is no retry and no cancellation.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, RequestDefaults};
use crate::domain::{
    DeployRequest, PipelineContext, ValidationError, WorkflowError, WorkflowId,
    WorkflowRecord, WorkflowRequest,
};
use crate::steps::{standard_steps, StepExecutor};

use super::progress::{ProgressStore, StepTransition};
use super::report::{summarize, WorkflowReport};
use super::validate::validate;

/// Workflow orchestrator.
///
/// Owns the ordered step executors and a handle to the progress store.
/// Requests are validated before a workflow id is minted; execution runs
/// the steps strictly in plan order.
pub struct Orchestrator {
    store: Arc<ProgressStore>,
    steps: Vec<Arc<dyn StepExecutor>>,
    defaults: RequestDefaults,
}

impl Orchestrator {
    /// Create an orchestrator with the standard deployment steps.
    pub fn new(store: Arc<ProgressStore>, config: &Config) -> Self {
        Self {
            store,
            steps: standard_steps(config),
            defaults: config.defaults.clone(),
        }
    }

    /// Create an orchestrator with caller-provided step executors.
    ///
    /// The executors must be in plan order; this is the seam tests use to
    /// drive the pipeline with stubs.
    pub fn with_steps(store: Arc<ProgressStore>, steps: Vec<Arc<dyn StepExecutor>>) -> Self {
        Self {
            store,
            steps,
            defaults: RequestDefaults::default(),
        }
    }

    /// The progress store this orchestrator writes to.
    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    /// Validate a request and begin executing it on a background task.
    ///
    /// The returned id exists (and is queryable) before step 1 starts.
    /// Validation failures surface here; step failures never do, they
    /// are captured into the workflow record.
    pub fn start_workflow(
        self: Arc<Self>,
        raw: DeployRequest,
    ) -> Result<WorkflowId, ValidationError> {
        let (id, request) = self.admit(raw)?;

        tokio::spawn(async move {
            self.execute_pipeline(id, request).await;
        });

        Ok(id)
    }

    /// Validate a request and drive it to completion, returning the final
    /// report. Progress remains observable through the store while this
    /// runs.
    pub async fn run_workflow(&self, raw: DeployRequest) -> Result<WorkflowReport, WorkflowError> {
        let (id, request) = self.admit(raw)?;
        self.execute_pipeline(id, request).await;

        let record = self.store.get(id)?;
        Ok(summarize(&record))
    }

    /// Read-only snapshot of a workflow record.
    pub fn get_workflow_progress(
        &self,
        id: WorkflowId,
    ) -> Result<WorkflowRecord, crate::domain::ProgressError> {
        self.store.get(id)
    }

    /// Validate and register a new workflow. No step has run yet when
    /// this returns.
    fn admit(&self, raw: DeployRequest) -> Result<(WorkflowId, WorkflowRequest), ValidationError> {
        let request = validate(raw, &self.defaults)?;
        let id = WorkflowId::new();
        self.store.create(WorkflowRecord::new(id, request.clone()));
        Ok((id, request))
    }

    /// Run the step sequence for one workflow.
    #[instrument(skip(self, request), fields(app = %request.app_name))]
    async fn execute_pipeline(&self, id: WorkflowId, request: WorkflowRequest) {
        info!(%id, profile = %request.cluster_profile, "starting deployment workflow");

        let mut context = PipelineContext::default();
        let mut failed = false;

        for executor in &self.steps {
            let kind = executor.kind();

            if failed {
                self.record_transition(id, kind, StepTransition::Skipped);
                continue;
            }

            self.record_transition(id, kind, StepTransition::Started);
            debug!(%id, step = kind.name(), "executing step");

            // Each step runs on its own task so a panicking executor is
            // normalized into a Failed record instead of tearing down the
            // workflow's bookkeeping.
            let step = Arc::clone(executor);
            let step_request = request.clone();
            let step_context = context.clone();
            let joined =
                tokio::spawn(async move { step.execute(&step_request, step_context).await }).await;

            let transition = match joined {
                Ok(Ok(outcome)) => {
                    info!(%id, step = kind.name(), reused = outcome.reused, "step succeeded");
                    context = outcome.context;
                    StepTransition::Succeeded {
                        artifacts: outcome.artifacts,
                        reused: outcome.reused,
                    }
                }
                Ok(Err(step_error)) => {
                    error!(%id, step = kind.name(), error = %step_error, "step failed");
                    failed = true;
                    StepTransition::Failed {
                        error: step_error.to_string(),
                    }
                }
                Err(join_error) => {
                    let detail = if join_error.is_panic() {
                        format!("step panicked: {}", panic_message(join_error.into_panic()))
                    } else {
                        "step task was cancelled".to_string()
                    };
                    error!(%id, step = kind.name(), error = %detail, "step fault");
                    failed = true;
                    StepTransition::Failed { error: detail }
                }
            };

            self.record_transition(id, kind, transition);
        }

        match self.store.get(id) {
            Ok(record) => {
                info!(%id, state = ?record.overall_state(), "workflow finished");
            }
            Err(err) => warn!(%id, %err, "workflow record missing at completion"),
        }
    }

    fn record_transition(
        &self,
        id: WorkflowId,
        kind: crate::domain::StepKind,
        transition: StepTransition,
    ) {
        if let Err(err) = self.store.update_step(id, kind, transition) {
            warn!(%id, step = kind.name(), %err, "progress update rejected");
        }
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
