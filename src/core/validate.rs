//! Request validation and step-plan resolution.
//!
//! Validation accumulates every violation instead of stopping at the
//! first, fills configuration defaults into unset fields, and resolves
//! the step plan up front. No collaborator is invoked and no workflow id
//! is minted for a rejected request.

use crate::config::RequestDefaults;
use crate::domain::{
    DeployRequest, StepKind, ValidationError, Violation, WorkflowRequest, STEP_PLAN,
};

/// Kubernetes object names are DNS labels.
const MAX_LABEL_LEN: usize = 63;

/// Validate a raw request, filling defaults from configuration.
pub fn validate(
    raw: DeployRequest,
    defaults: &RequestDefaults,
) -> Result<WorkflowRequest, ValidationError> {
    let mut violations = Vec::new();

    if !raw.project_path.is_dir() {
        violations.push(Violation::ProjectPath(raw.project_path.clone()));
    }

    if !is_dns_label(&raw.app_name) {
        violations.push(Violation::AppName(raw.app_name.clone()));
    }

    if raw.port == 0 {
        violations.push(Violation::Port(raw.port));
    }

    let namespace = match raw.namespace {
        Some(ns) if !ns.is_empty() => {
            if !is_dns_label(&ns) {
                violations.push(Violation::Namespace(ns.clone()));
            }
            ns
        }
        _ => defaults.namespace.clone(),
    };

    let image_tag = match raw.image_tag {
        Some(tag) if !tag.is_empty() => tag,
        _ => defaults.image_tag.clone(),
    };

    let cluster_profile = match raw.cluster_profile {
        Some(profile) if !profile.is_empty() => profile,
        _ => defaults.cluster_profile.clone(),
    };

    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    Ok(WorkflowRequest {
        project_path: raw.project_path,
        app_name: raw.app_name,
        namespace,
        image_tag,
        port: raw.port,
        optimize_for_size: raw.optimize_for_size,
        multi_stage: raw.multi_stage,
        custom_instructions: raw.custom_instructions,
        cluster_profile,
    })
}

/// The resolved step plan for a validated request.
///
/// The topology is fixed; resolution exists so execution never branches
/// on configuration to decide what runs.
pub fn resolve_plan(_request: &WorkflowRequest) -> Vec<StepKind> {
    STEP_PLAN.to_vec()
}

/// DNS label: nonempty, at most 63 chars, lowercase alphanumerics and
/// dashes, no leading or trailing dash.
fn is_dns_label(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_LABEL_LEN {
        return false;
    }
    if s.starts_with('-') || s.ends_with('-') {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw(temp: &TempDir) -> DeployRequest {
        DeployRequest {
            project_path: temp.path().to_path_buf(),
            app_name: "demo".to_string(),
            port: 8080,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let request = validate(raw(&temp), &RequestDefaults::default()).unwrap();

        assert_eq!(request.namespace, "default");
        assert_eq!(request.image_tag, "latest");
        assert_eq!(request.cluster_profile, "slipway-cluster");
    }

    #[test]
    fn test_all_violations_are_accumulated() {
        let temp = TempDir::new().unwrap();
        let mut request = raw(&temp);
        request.app_name = "UP_PER".to_string();
        request.port = 0;

        let err = validate(request, &RequestDefaults::default()).unwrap_err();

        assert_eq!(err.violations.len(), 2);
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, Violation::AppName(_))));
        assert!(err.violations.iter().any(|v| matches!(v, Violation::Port(0))));
    }

    #[test]
    fn test_missing_project_path_is_a_violation() {
        let temp = TempDir::new().unwrap();
        let mut request = raw(&temp);
        request.project_path = temp.path().join("does-not-exist");

        let err = validate(request, &RequestDefaults::default()).unwrap_err();
        assert!(matches!(err.violations[0], Violation::ProjectPath(_)));
    }

    #[test]
    fn test_explicit_namespace_must_be_a_label() {
        let temp = TempDir::new().unwrap();
        let mut request = raw(&temp);
        request.namespace = Some("Bad_Namespace".to_string());

        let err = validate(request, &RequestDefaults::default()).unwrap_err();
        assert!(matches!(err.violations[0], Violation::Namespace(_)));
    }

    #[test]
    fn test_empty_tag_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let mut request = raw(&temp);
        request.image_tag = Some(String::new());

        let validated = validate(request, &RequestDefaults::default()).unwrap();
        assert_eq!(validated.image_tag, "latest");
    }

    #[test]
    fn test_dns_label_rules() {
        assert!(is_dns_label("demo"));
        assert!(is_dns_label("demo-2"));
        assert!(is_dns_label(&"a".repeat(63)));

        assert!(!is_dns_label(""));
        assert!(!is_dns_label("UP_PER"));
        assert!(!is_dns_label("-leading"));
        assert!(!is_dns_label("trailing-"));
        assert!(!is_dns_label("has space"));
        assert!(!is_dns_label(&"a".repeat(64)));
    }

    #[test]
    fn test_plan_resolution_is_fixed() {
        let temp = TempDir::new().unwrap();
        let mut request = raw(&temp);
        request.multi_stage = true;
        request.optimize_for_size = true;
        let validated = validate(request, &RequestDefaults::default()).unwrap();

        // Flags influence step behavior, never the plan itself
        assert_eq!(resolve_plan(&validated), STEP_PLAN.to_vec());
    }
}
