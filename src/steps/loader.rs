//! Image load step.
//!
//! Pushes the locally built image into the cluster's runtime with
//! `minikube image load`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::domain::{PipelineContext, StepError, StepKind, WorkflowRequest};

use super::{run_command, StepExecutor, StepOutcome};

/// Loads a built image into the target cluster.
#[derive(Debug)]
pub struct ImageLoader {
    binary: String,
    timeout: Duration,
}

impl ImageLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.binaries.minikube.clone(),
            timeout: Duration::from_secs(config.timeouts.image_load_seconds),
        }
    }
}

#[async_trait]
impl StepExecutor for ImageLoader {
    fn kind(&self) -> StepKind {
        StepKind::LoadImage
    }

    #[instrument(skip(self, request, context), fields(profile = %request.cluster_profile))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let image = context.image.clone().ok_or_else(|| {
            StepError::Load("image reference missing from pipeline context".to_string())
        })?;

        let args = [
            "image",
            "load",
            image.as_str(),
            "--profile",
            request.cluster_profile.as_str(),
        ];

        debug!(%image, "loading image into cluster");

        let output = run_command(&self.binary, &args, self.timeout)
            .await
            .map_err(|e| StepError::Load(e.to_string()))?;

        if !output.success() {
            return Err(StepError::Load(format!(
                "failed to load image '{}' into cluster '{}': {}",
                image, request.cluster_profile, output.stderr
            )));
        }

        Ok(StepOutcome::new(context))
    }
}
