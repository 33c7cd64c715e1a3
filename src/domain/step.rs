//! Step descriptors for the fixed deployment pipeline.
//!
//! The pipeline topology is fixed: seven steps, always in the same order.
//! The plan is materialized once when a workflow record is created, so the
//! full sequence is visible to observers before the first step runs.

use serde::{Deserialize, Serialize};

/// One step of the deployment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Scan the project and detect language/framework
    AnalyzeProject,

    /// Render a Dockerfile into the project directory
    GenerateDockerfile,

    /// Build the container image from the generated Dockerfile
    BuildImage,

    /// Make sure the target cluster is reachable, starting it if needed
    EnsureCluster,

    /// Load the built image into the cluster
    LoadImage,

    /// Render the Helm chart for the application
    GenerateChart,

    /// Install the chart into the cluster
    InstallChart,
}

/// The authoritative step order. Never branched at execution time.
pub const STEP_PLAN: [StepKind; 7] = [
    StepKind::AnalyzeProject,
    StepKind::GenerateDockerfile,
    StepKind::BuildImage,
    StepKind::EnsureCluster,
    StepKind::LoadImage,
    StepKind::GenerateChart,
    StepKind::InstallChart,
];

impl StepKind {
    /// Stable snake_case name, used in records and rendered output.
    pub const fn name(self) -> &'static str {
        match self {
            StepKind::AnalyzeProject => "analyze_project",
            StepKind::GenerateDockerfile => "generate_dockerfile",
            StepKind::BuildImage => "build_image",
            StepKind::EnsureCluster => "ensure_cluster",
            StepKind::LoadImage => "load_image",
            StepKind::GenerateChart => "generate_chart",
            StepKind::InstallChart => "install_chart",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_order() {
        let names: Vec<&str> = STEP_PLAN.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "analyze_project",
                "generate_dockerfile",
                "build_image",
                "ensure_cluster",
                "load_image",
                "generate_chart",
                "install_chart",
            ]
        );
    }

    #[test]
    fn test_step_kind_serialization() {
        let json = serde_json::to_string(&StepKind::BuildImage).unwrap();
        assert_eq!(json, "\"build_image\"");

        let parsed: StepKind = serde_json::from_str("\"ensure_cluster\"").unwrap();
        assert_eq!(parsed, StepKind::EnsureCluster);
    }
}
