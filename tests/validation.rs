//! Validation Integration Tests
//!
//! A rejected request surfaces every violation at once, mints no
//! workflow id, and invokes no collaborator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use slipway::config::RequestDefaults;
use slipway::core::validate;
use slipway::domain::Violation;
use slipway::{
    DeployRequest, Orchestrator, PipelineContext, ProgressStore, StepError, StepExecutor,
    StepKind, StepOutcome, WorkflowError, WorkflowRequest, STEP_PLAN,
};

/// Counts executions so tests can prove no collaborator ran.
struct CountingStep {
    kind: StepKind,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StepExecutor for CountingStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn execute(
        &self,
        _request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StepOutcome::new(context))
    }
}

#[tokio::test]
async fn test_invalid_request_lists_every_violation() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(ProgressStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let steps = STEP_PLAN
        .iter()
        .map(|kind| -> Arc<dyn StepExecutor> {
            Arc::new(CountingStep {
                kind: *kind,
                calls: Arc::clone(&calls),
            })
        })
        .collect();
    let orchestrator = Orchestrator::with_steps(Arc::clone(&store), steps);

    let request = DeployRequest {
        project_path: temp.path().to_path_buf(),
        app_name: "UP_PER".to_string(),
        port: 0,
        ..Default::default()
    };

    let err = orchestrator.run_workflow(request).await.unwrap_err();
    let WorkflowError::Validation(validation) = err else {
        panic!("expected a validation error");
    };

    assert_eq!(validation.violations.len(), 2);
    assert!(validation
        .violations
        .iter()
        .any(|v| matches!(v, Violation::AppName(name) if name == "UP_PER")));
    assert!(validation
        .violations
        .iter()
        .any(|v| matches!(v, Violation::Port(0))));

    // No step ran
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_defaults_are_filled() {
    let temp = TempDir::new().unwrap();
    let request = DeployRequest {
        project_path: temp.path().to_path_buf(),
        app_name: "demo".to_string(),
        port: 8080,
        ..Default::default()
    };

    let validated = validate(request, &RequestDefaults::default()).unwrap();

    assert_eq!(validated.namespace, "default");
    assert_eq!(validated.image_tag, "latest");
    assert_eq!(validated.cluster_profile, "slipway-cluster");
    assert_eq!(validated.image_reference(), "demo:latest");
}

#[test]
fn test_custom_defaults_are_honored() {
    let temp = TempDir::new().unwrap();
    let request = DeployRequest {
        project_path: temp.path().to_path_buf(),
        app_name: "demo".to_string(),
        port: 8080,
        ..Default::default()
    };

    let defaults = RequestDefaults {
        namespace: "staging".to_string(),
        image_tag: "nightly".to_string(),
        cluster_profile: "ci-cluster".to_string(),
    };

    let validated = validate(request, &defaults).unwrap();

    assert_eq!(validated.namespace, "staging");
    assert_eq!(validated.image_tag, "nightly");
    assert_eq!(validated.cluster_profile, "ci-cluster");
}

#[test]
fn test_explicit_values_beat_defaults() {
    let temp = TempDir::new().unwrap();
    let request = DeployRequest {
        project_path: temp.path().to_path_buf(),
        app_name: "demo".to_string(),
        namespace: Some("prod".to_string()),
        image_tag: Some("v2".to_string()),
        cluster_profile: Some("big-cluster".to_string()),
        port: 8080,
        ..Default::default()
    };

    let validated = validate(request, &RequestDefaults::default()).unwrap();

    assert_eq!(validated.namespace, "prod");
    assert_eq!(validated.image_tag, "v2");
    assert_eq!(validated.cluster_profile, "big-cluster");
}

#[test]
fn test_app_name_edge_cases() {
    let temp = TempDir::new().unwrap();
    let base = DeployRequest {
        project_path: temp.path().to_path_buf(),
        app_name: String::new(),
        port: 8080,
        ..Default::default()
    };

    let too_long = "a".repeat(64);
    for bad in ["", "-demo", "demo-", "Demo", "demo_app", too_long.as_str()] {
        let mut request = base.clone();
        request.app_name = bad.to_string();
        let err = validate(request, &RequestDefaults::default()).unwrap_err();
        assert!(
            err.violations
                .iter()
                .any(|v| matches!(v, Violation::AppName(_))),
            "expected app name violation for {:?}",
            bad
        );
    }

    let max_len = "a".repeat(63);
    for good in ["demo", "demo-2", "a", max_len.as_str()] {
        let mut request = base.clone();
        request.app_name = good.to_string();
        assert!(
            validate(request, &RequestDefaults::default()).is_ok(),
            "expected {:?} to validate",
            good
        );
    }
}
