//! Command-line interface for slipway.
//!
//! `deploy` runs the full workflow while rendering live progress from the
//! progress store on the side; `analyze` prints what the analyzer sees in
//! a project; `config` shows the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::{summarize, Orchestrator, ProgressStore, WorkflowReport};
use crate::domain::{DeployRequest, StepState, WorkflowState};
use crate::steps::ProjectAnalyzer;

/// slipway - deployment workflow orchestrator for local Kubernetes clusters
#[derive(Parser, Debug)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze, build and deploy a project
    Deploy {
        /// Path to the project root
        project_path: PathBuf,

        /// Application name (DNS label)
        #[arg(short, long)]
        app_name: String,

        /// Target namespace
        #[arg(short, long, env = "SLIPWAY_NAMESPACE")]
        namespace: Option<String>,

        /// Image tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Port the application listens on
        #[arg(short, long, default_value = "80")]
        port: u16,

        /// Prefer smaller base images
        #[arg(long)]
        optimize_size: bool,

        /// Use a multi-stage build template
        #[arg(long)]
        multi_stage: bool,

        /// Extra Dockerfile instruction (repeatable, appended in order)
        #[arg(short = 'i', long = "instruction")]
        instructions: Vec<String>,

        /// Cluster profile to deploy into
        #[arg(long, env = "SLIPWAY_PROFILE")]
        profile: Option<String>,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze a project and print the detected profile
    Analyze {
        /// Path to the project root
        project_path: PathBuf,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Deploy {
                project_path,
                app_name,
                namespace,
                tag,
                port,
                optimize_size,
                multi_stage,
                instructions,
                profile,
                json,
            } => {
                let request = DeployRequest {
                    project_path,
                    app_name,
                    namespace,
                    image_tag: tag,
                    port,
                    optimize_for_size: optimize_size,
                    multi_stage,
                    custom_instructions: instructions,
                    cluster_profile: profile,
                };
                deploy(request, json).await
            }
            Commands::Analyze { project_path } => analyze(&project_path),
            Commands::Config => show_config(),
        }
    }
}

/// Run a deployment, polling the progress store for live rendering.
async fn deploy(request: DeployRequest, json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = Arc::new(ProgressStore::new());
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), &config));

    let id = orchestrator.start_workflow(request)?;
    eprintln!("Workflow {}", id);

    // The workflow runs on its own task; this loop is a plain concurrent
    // reader of the progress store.
    let mut last_states: Vec<StepState> = Vec::new();
    let record = loop {
        let record = store.get(id)?;

        for (idx, step) in record.steps.iter().enumerate() {
            let changed = last_states.get(idx) != Some(&step.state);
            if changed && step.state != StepState::Pending {
                let note = if step.reused { " (reused)" } else { "" };
                eprintln!("  {:<20} {}{}", step.kind.name(), state_label(step.state), note);
            }
        }
        last_states = record.steps.iter().map(|s| s.state).collect();

        if record.is_finished() {
            break record;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    let report = summarize(&record);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }

    if report.overall != WorkflowState::Succeeded {
        anyhow::bail!("deployment did not succeed ({:?})", report.overall);
    }
    Ok(())
}

fn render_report(report: &WorkflowReport) {
    eprintln!();
    eprintln!(
        "Workflow {} finished: {}",
        report.id,
        overall_label(report.overall)
    );

    eprintln!("\nSteps:");
    for step in &report.steps {
        let duration = step
            .duration_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        let note = if step.reused { " (reused)" } else { "" };
        eprintln!(
            "  {:<20} {:<10} {:>10}{}",
            step.step.name(),
            state_label(step.state),
            duration,
            note
        );
    }

    if !report.artifacts.is_empty() {
        eprintln!("\nArtifacts:");
        for artifact in &report.artifacts {
            eprintln!("  {:?}: {}", artifact.kind, artifact.reference);
        }
    }

    if let Some(failure) = &report.first_failure {
        eprintln!("\nFailed at {}: {}", failure.step.name(), failure.error);
    }
}

fn analyze(project_path: &PathBuf) -> Result<()> {
    let profile = ProjectAnalyzer::new().analyze(project_path)?;

    println!("Project: {}", profile.root.display());
    println!("Language: {}", profile.language);
    if let Some(framework) = &profile.framework {
        println!("Framework: {}", framework);
    }
    println!("Files scanned: {}", profile.total_files);
    if !profile.manifests.is_empty() {
        println!("Manifests: {}", profile.manifests.join(", "));
    }
    if !profile.extensions.is_empty() {
        let extensions: Vec<&str> = profile.extensions.iter().map(String::as_str).collect();
        println!("Extensions: {}", extensions.join(", "));
    }
    Ok(())
}

fn show_config() -> Result<()> {
    let config = Config::load()?;

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Namespace: {}", config.defaults.namespace);
    println!("Image tag: {}", config.defaults.image_tag);
    println!("Cluster profile: {}", config.defaults.cluster_profile);
    println!(
        "Cluster shape: {} cpus, {} memory, {} disk, {} driver",
        config.cluster.cpus, config.cluster.memory, config.cluster.disk_size, config.cluster.driver
    );
    println!(
        "Timeouts: build {}s, cluster start {}s, image load {}s, install {}s",
        config.timeouts.build_seconds,
        config.timeouts.cluster_start_seconds,
        config.timeouts.image_load_seconds,
        config.timeouts.install_seconds
    );
    Ok(())
}

fn state_label(state: StepState) -> &'static str {
    match state {
        StepState::Pending => "pending",
        StepState::Running => "running",
        StepState::Succeeded => "succeeded",
        StepState::Failed => "failed",
        StepState::Skipped => "skipped",
    }
}

fn overall_label(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::Running => "running",
        WorkflowState::Succeeded => "succeeded",
        WorkflowState::Failed => "failed",
        WorkflowState::PartiallyFailed => "partially failed",
    }
}
