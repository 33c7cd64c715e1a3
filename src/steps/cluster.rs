//! Cluster step.
//!
//! Reuse policy: before anything destructive, probe whether a cluster
//! under the requested profile is already reachable (`minikube status`).
//! If it is, the step succeeds immediately with a reused marker and the
//! existing cluster is left untouched. Only an unreachable profile gets
//! a `minikube start`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::domain::{PipelineContext, StepError, StepKind, WorkflowRequest};

use super::{run_command, StepExecutor, StepOutcome};

/// Minikube cluster manager.
#[derive(Debug)]
pub struct ClusterManager {
    binary: String,
    cpus: u32,
    memory: String,
    disk_size: String,
    driver: String,
    start_timeout: Duration,
    status_timeout: Duration,
}

impl ClusterManager {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.binaries.minikube.clone(),
            cpus: config.cluster.cpus,
            memory: config.cluster.memory.clone(),
            disk_size: config.cluster.disk_size.clone(),
            driver: config.cluster.driver.clone(),
            start_timeout: Duration::from_secs(config.timeouts.cluster_start_seconds),
            status_timeout: Duration::from_secs(config.timeouts.cluster_status_seconds),
        }
    }

    /// Whether a cluster under this profile is already reachable.
    ///
    /// A probe that cannot even spawn counts as unreachable; the start
    /// attempt that follows will surface the real error.
    async fn is_reachable(&self, profile: &str) -> bool {
        let args = ["status", "--profile", profile];
        match run_command(&self.binary, &args, self.status_timeout).await {
            Ok(output) => output.success(),
            Err(_) => false,
        }
    }

    async fn start(&self, profile: &str) -> Result<(), StepError> {
        let cpus = self.cpus.to_string();
        let args = [
            "start",
            "--profile",
            profile,
            "--cpus",
            cpus.as_str(),
            "--memory",
            self.memory.as_str(),
            "--disk-size",
            self.disk_size.as_str(),
            "--driver",
            self.driver.as_str(),
        ];

        let output = run_command(&self.binary, &args, self.start_timeout)
            .await
            .map_err(|e| StepError::Cluster(e.to_string()))?;

        if !output.success() {
            return Err(StepError::Cluster(format!(
                "failed to start cluster '{}': {}",
                profile, output.stderr
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl StepExecutor for ClusterManager {
    fn kind(&self) -> StepKind {
        StepKind::EnsureCluster
    }

    #[instrument(skip(self, request, context), fields(profile = %request.cluster_profile))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let profile = &request.cluster_profile;

        if self.is_reachable(profile).await {
            info!(%profile, "cluster already reachable, reusing");
            return Ok(StepOutcome::new(context.with_cluster_reused(true)).reused());
        }

        debug!(%profile, cpus = self.cpus, memory = %self.memory, "starting cluster");
        self.start(profile).await?;

        Ok(StepOutcome::new(context.with_cluster_reused(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(binary: &str) -> ClusterManager {
        ClusterManager {
            binary: binary.to_string(),
            cpus: 2,
            memory: "2048mb".to_string(),
            disk_size: "20gb".to_string(),
            driver: "docker".to_string(),
            start_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_secs(5),
        }
    }

    fn request(temp: &TempDir) -> WorkflowRequest {
        WorkflowRequest {
            project_path: temp.path().to_path_buf(),
            app_name: "demo".to_string(),
            namespace: "default".to_string(),
            image_tag: "latest".to_string(),
            port: 8080,
            optimize_for_size: false,
            multi_stage: false,
            custom_instructions: Vec::new(),
            cluster_profile: "slipway-cluster".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reachable_cluster_is_reused() {
        let temp = TempDir::new().unwrap();
        // `true` exits 0, standing in for a healthy status probe
        let manager = manager("true");

        let outcome = manager
            .execute(&request(&temp), PipelineContext::default())
            .await
            .unwrap();

        assert!(outcome.reused);
        assert!(outcome.context.cluster_reused);
    }

    #[tokio::test]
    async fn test_unreachable_cluster_start_failure_is_cluster_error() {
        let temp = TempDir::new().unwrap();
        // `false` fails both the probe and the start
        let manager = manager("false");

        let result = manager
            .execute(&request(&temp), PipelineContext::default())
            .await;

        assert!(matches!(result, Err(StepError::Cluster(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_probe_counts_as_unreachable() {
        let manager = manager("definitely-not-minikube");
        assert!(!manager.is_reachable("slipway-cluster").await);
    }
}
