//! Concurrency-safe registry of workflow records.
//!
//! The store is written by the orchestrator and read by progress queries.
//! Each record sits behind its own lock, so writes to one workflow never
//! block readers or writers of another; writes to the same workflow are
//! serialized. `get` hands out a cloned snapshot, never a live reference,
//! so a concurrent reader cannot observe a record mid-mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use tracing::warn;

use crate::domain::{
    Artifact, ProgressError, StepKind, StepState, WorkflowId, WorkflowRecord,
};

/// A step state transition applied through the store.
#[derive(Debug, Clone)]
pub enum StepTransition {
    /// `Pending -> Running`
    Started,

    /// `Running -> Succeeded`
    Succeeded {
        artifacts: Vec<Artifact>,
        reused: bool,
    },

    /// `Running -> Failed`
    Failed { error: String },

    /// `Pending -> Skipped` (an earlier step failed)
    Skipped,
}

/// In-memory progress store. Records live for the life of the process.
#[derive(Debug, Default)]
pub struct ProgressStore {
    records: RwLock<HashMap<WorkflowId, Arc<Mutex<WorkflowRecord>>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created record.
    pub fn create(&self, record: WorkflowRecord) {
        let id = record.id;
        let mut records = recover(self.records.write());
        records.insert(id, Arc::new(Mutex::new(record)));
    }

    /// Snapshot of a record. Fails with `NotFound` for unknown ids.
    pub fn get(&self, id: WorkflowId) -> Result<WorkflowRecord, ProgressError> {
        let entry = self.entry(id)?;
        let record = recover(entry.lock());
        Ok(record.clone())
    }

    /// Apply a step transition to a record.
    ///
    /// A step record that already resolved (`Succeeded` or `Failed`) is
    /// never mutated again; such writes are rejected.
    pub fn update_step(
        &self,
        id: WorkflowId,
        kind: StepKind,
        transition: StepTransition,
    ) -> Result<(), ProgressError> {
        let entry = self.entry(id)?;
        let mut record = recover(entry.lock());

        let step = record
            .step_mut(kind)
            .ok_or(ProgressError::NotFound(id))?;

        if step.state.is_terminal() {
            warn!(%id, step = kind.name(), "rejecting write to terminal step record");
            return Err(ProgressError::TerminalStep { id, step: kind });
        }

        let now = Utc::now();
        match transition {
            StepTransition::Started => {
                step.state = StepState::Running;
                step.started_at = Some(now);
            }
            StepTransition::Succeeded { artifacts, reused } => {
                step.state = StepState::Succeeded;
                step.finished_at = Some(now);
                step.artifacts = artifacts;
                step.reused = reused;
            }
            StepTransition::Failed { error } => {
                step.state = StepState::Failed;
                step.finished_at = Some(now);
                step.error = Some(error);
            }
            StepTransition::Skipped => {
                step.state = StepState::Skipped;
            }
        }

        record.updated_at = now;
        Ok(())
    }

    fn entry(&self, id: WorkflowId) -> Result<Arc<Mutex<WorkflowRecord>>, ProgressError> {
        let records = recover(self.records.read());
        records
            .get(&id)
            .cloned()
            .ok_or(ProgressError::NotFound(id))
    }
}

/// Lock recovery: the store never panics while holding a guard, so a
/// poisoned lock still contains a consistent record.
fn recover<G>(result: Result<G, PoisonError<G>>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}
