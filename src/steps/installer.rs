//! Chart install step.
//!
//! Installs the generated chart with `helm upgrade --install`, which is
//! idempotent across workflow re-invocations: an existing release is
//! upgraded in place instead of failing the step.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::domain::{ArtifactKind, PipelineContext, StepError, StepKind, WorkflowRequest};

use super::{run_command, StepExecutor, StepOutcome};

/// Helm chart installer.
#[derive(Debug)]
pub struct ChartInstaller {
    binary: String,
    timeout: Duration,
}

impl ChartInstaller {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.binaries.helm.clone(),
            timeout: Duration::from_secs(config.timeouts.install_seconds),
        }
    }
}

#[async_trait]
impl StepExecutor for ChartInstaller {
    fn kind(&self) -> StepKind {
        StepKind::InstallChart
    }

    #[instrument(skip(self, request, context), fields(app = %request.app_name))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let chart_dir = context.chart_dir.clone().ok_or_else(|| {
            StepError::Deploy("chart directory missing from pipeline context".to_string())
        })?;

        let release = request.release_name().to_string();
        let chart_arg = chart_dir.display().to_string();
        let tag_override = format!("image.tag={}", request.image_tag);
        let wait_timeout = format!("{}s", self.timeout.as_secs());

        let args = [
            "upgrade",
            "--install",
            release.as_str(),
            chart_arg.as_str(),
            "--namespace",
            request.namespace.as_str(),
            "--create-namespace",
            "--set",
            tag_override.as_str(),
            "--wait",
            "--timeout",
            wait_timeout.as_str(),
        ];

        debug!(%release, namespace = %request.namespace, "installing chart");

        // The external timeout gets headroom over helm's own --wait timeout
        let output = run_command(&self.binary, &args, self.timeout + Duration::from_secs(30))
            .await
            .map_err(|e| StepError::Deploy(e.to_string()))?;

        if !output.success() {
            return Err(StepError::Deploy(format!(
                "failed to install release '{}' in namespace '{}': {}",
                release, request.namespace, output.stderr
            )));
        }

        Ok(StepOutcome::new(context.with_release(release.clone()))
            .with_artifact(ArtifactKind::Release, release))
    }
}
