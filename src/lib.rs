//! slipway - deployment workflow orchestrator
//!
//! Takes a project from source tree to a release running in a local
//! Kubernetes cluster as one observable pipeline: analyze the project,
//! generate a Dockerfile, build the image, ensure a cluster, load the
//! image, generate a Helm chart, install it.
//!
//! # Architecture
//!
//! - A workflow record with the full step plan exists before the first
//!   step runs; progress is queryable concurrently while it executes
//! - Each step consumes a typed pipeline context and returns a
//!   replacement, making data dependencies between steps explicit
//! - A failed step marks everything after it skipped; the record keeps
//!   the artifacts of the steps that did succeed
//!
//! # Modules
//!
//! - `core`: orchestration (validator, orchestrator, progress store, report)
//! - `domain`: data structures (requests, records, context, errors)
//! - `steps`: the step executors (analyzer, generators, external tools)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Deploy a project
//! slipway deploy ./my-app --app-name my-app --port 8080
//!
//! # See what the analyzer detects
//! slipway analyze ./my-app
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod steps;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use core::{summarize, Orchestrator, ProgressStore, StepTransition, WorkflowReport};
pub use domain::{
    Artifact, ArtifactKind, DeployRequest, PipelineContext, ProgressError, ProjectProfile,
    StepError, StepKind, StepRecord, StepState, ValidationError, WorkflowError, WorkflowId,
    WorkflowRecord, WorkflowRequest, WorkflowState, STEP_PLAN,
};
pub use steps::{StepExecutor, StepOutcome};
