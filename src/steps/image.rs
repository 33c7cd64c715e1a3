//! Image build step.
//!
//! Runs `docker build` against the generated Dockerfile. A nonzero exit
//! from the external tool is a `BuildError` carrying the exit status and
//! stderr.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::domain::{ArtifactKind, PipelineContext, StepError, StepKind, WorkflowRequest};

use super::{run_command, StepExecutor, StepOutcome};

/// Container image builder.
#[derive(Debug)]
pub struct ImageBuilder {
    binary: String,
    timeout: Duration,
}

impl ImageBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.binaries.docker.clone(),
            timeout: Duration::from_secs(config.timeouts.build_seconds),
        }
    }
}

#[async_trait]
impl StepExecutor for ImageBuilder {
    fn kind(&self) -> StepKind {
        StepKind::BuildImage
    }

    #[instrument(skip(self, request, context), fields(app = %request.app_name))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let dockerfile = context
            .dockerfile
            .clone()
            .unwrap_or_else(|| request.project_path.join("Dockerfile"));

        if !dockerfile.is_file() {
            return Err(StepError::Build {
                status: -1,
                stderr: format!("Dockerfile not found: {}", dockerfile.display()),
            });
        }

        let image = request.image_reference();
        let dockerfile_arg = dockerfile.display().to_string();
        let project_arg = request.project_path.display().to_string();
        let args = [
            "build",
            "-t",
            image.as_str(),
            "-f",
            dockerfile_arg.as_str(),
            project_arg.as_str(),
        ];

        debug!(%image, "building image");

        let output = run_command(&self.binary, &args, self.timeout)
            .await
            .map_err(|e| StepError::Build {
                status: -1,
                stderr: e.to_string(),
            })?;

        if !output.success() {
            return Err(StepError::Build {
                status: output.status,
                stderr: output.stderr,
            });
        }

        Ok(StepOutcome::new(context.with_image(image.clone()))
            .with_artifact(ArtifactKind::Image, image))
    }
}
