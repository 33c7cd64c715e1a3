//! Dockerfile generation step.
//!
//! Renders a Dockerfile from the project profile: per-language templates,
//! smaller base variants when `optimize_for_size` is set, a builder plus
//! runtime template when `multi_stage` is set and the language has one.
//! Custom instructions are appended verbatim, in the given order. The
//! output overwrites `<project>/Dockerfile` deterministically, so
//! re-running a workflow never fails on an existing file.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{
    ArtifactKind, Language, PipelineContext, ProjectProfile, StepError, StepKind,
    WorkflowRequest,
};

use super::{StepExecutor, StepOutcome};

const DEFAULT_GO_VERSION: &str = "1.21";

/// Dockerfile generator.
#[derive(Debug, Default)]
pub struct DockerfileGenerator;

impl DockerfileGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the Dockerfile content for a profile.
    pub fn render(&self, profile: &ProjectProfile, request: &WorkflowRequest) -> String {
        let port = request.port;
        let size = request.optimize_for_size;
        let multi = request.multi_stage;

        let mut content = match profile.language {
            Language::Python => python_dockerfile(profile, port, size),
            Language::Node => node_dockerfile(profile, port, size),
            Language::Go => go_dockerfile(port, size, multi),
            Language::Rust => rust_dockerfile(port, size, multi),
            Language::Java => java_dockerfile(profile, port, size, multi),
            Language::Ruby | Language::Php | Language::Unknown => generic_dockerfile(port),
        };

        if !request.custom_instructions.is_empty() {
            content.push_str("\n# Custom instructions\n");
            for instruction in &request.custom_instructions {
                content.push_str(instruction);
                content.push('\n');
            }
        }

        content
    }
}

#[async_trait]
impl StepExecutor for DockerfileGenerator {
    fn kind(&self) -> StepKind {
        StepKind::GenerateDockerfile
    }

    #[instrument(skip(self, request, context), fields(app = %request.app_name))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let profile = context.profile.as_ref().ok_or_else(|| {
            StepError::Generation("project profile missing from pipeline context".to_string())
        })?;

        let content = self.render(profile, request);
        let path = request.project_path.join("Dockerfile");

        tokio::fs::write(&path, &content).await.map_err(|e| {
            StepError::Generation(format!("failed to write {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), language = %profile.language, "dockerfile written");

        let reference = path.display().to_string();
        Ok(StepOutcome::new(context.with_dockerfile(path))
            .with_artifact(ArtifactKind::Dockerfile, reference))
    }
}

fn python_dockerfile(profile: &ProjectProfile, port: u16, size: bool) -> String {
    let base = if size { "python:3.11-slim" } else { "python:3.11" };

    let mut main_file = "app.py";
    if profile.has_file("main.py") {
        main_file = "main.py";
    } else if profile.has_file("server.py") {
        main_file = "server.py";
    }

    format!(
        "FROM {base}\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY requirements.txt .\n\
         RUN pip install --no-cache-dir -r requirements.txt\n\
         \n\
         COPY . .\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"python\", \"{main_file}\"]\n"
    )
}

fn node_dockerfile(profile: &ProjectProfile, port: u16, size: bool) -> String {
    let base = if size { "node:18-alpine" } else { "node:18" };

    let mut main_file = "index.js";
    if profile.has_file("server.js") {
        main_file = "server.js";
    } else if profile.has_file("app.js") {
        main_file = "app.js";
    }

    format!(
        "FROM {base}\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY package*.json ./\n\
         RUN npm ci --only=production\n\
         \n\
         COPY . .\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"node\", \"{main_file}\"]\n"
    )
}

fn go_dockerfile(port: u16, size: bool, multi: bool) -> String {
    let version = DEFAULT_GO_VERSION;

    if multi {
        return format!(
            "FROM golang:{version}-alpine AS builder\n\
             \n\
             WORKDIR /app\n\
             COPY go.mod go.sum ./\n\
             RUN go mod download\n\
             \n\
             COPY . .\n\
             RUN CGO_ENABLED=0 GOOS=linux go build -o main .\n\
             \n\
             FROM alpine:latest\n\
             RUN apk --no-cache add ca-certificates\n\
             WORKDIR /root/\n\
             \n\
             COPY --from=builder /app/main .\n\
             \n\
             EXPOSE {port}\n\
             \n\
             CMD [\"./main\"]\n"
        );
    }

    let base = if size {
        format!("golang:{version}-alpine")
    } else {
        format!("golang:{version}")
    };

    format!(
        "FROM {base}\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY go.mod go.sum ./\n\
         RUN go mod download\n\
         \n\
         COPY . .\n\
         RUN go build -o main .\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"./main\"]\n"
    )
}

fn rust_dockerfile(port: u16, size: bool, multi: bool) -> String {
    if multi {
        return format!(
            "FROM rust:1.70 AS builder\n\
             \n\
             WORKDIR /app\n\
             COPY Cargo.toml Cargo.lock ./\n\
             RUN cargo fetch\n\
             \n\
             COPY . .\n\
             RUN cargo build --release\n\
             \n\
             FROM debian:bullseye-slim\n\
             RUN apt-get update && apt-get install -y ca-certificates && rm -rf /var/lib/apt/lists/*\n\
             WORKDIR /app\n\
             \n\
             COPY --from=builder /app/target/release/* ./\n\
             \n\
             EXPOSE {port}\n\
             \n\
             CMD [\"./main\"]\n"
        );
    }

    let base = if size { "rust:1.70-slim" } else { "rust:1.70" };

    format!(
        "FROM {base}\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY Cargo.toml Cargo.lock ./\n\
         RUN cargo fetch\n\
         \n\
         COPY . .\n\
         RUN cargo build --release\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"./target/release/main\"]\n"
    )
}

fn java_dockerfile(profile: &ProjectProfile, port: u16, size: bool, multi: bool) -> String {
    let base = if size { "openjdk:11-jre-slim" } else { "openjdk:11" };

    if profile.has_manifest("pom.xml") {
        if multi {
            return format!(
                "FROM maven:3.8-openjdk-11 AS builder\n\
                 \n\
                 WORKDIR /app\n\
                 COPY pom.xml .\n\
                 RUN mvn dependency:go-offline\n\
                 \n\
                 COPY . .\n\
                 RUN mvn package -DskipTests\n\
                 \n\
                 FROM {base}\n\
                 WORKDIR /app\n\
                 \n\
                 COPY --from=builder /app/target/*.jar app.jar\n\
                 \n\
                 EXPOSE {port}\n\
                 \n\
                 CMD [\"java\", \"-jar\", \"app.jar\"]\n"
            );
        }
        return format!(
            "FROM maven:3.8-openjdk-11\n\
             \n\
             WORKDIR /app\n\
             \n\
             COPY pom.xml .\n\
             RUN mvn dependency:go-offline\n\
             \n\
             COPY . .\n\
             RUN mvn package -DskipTests\n\
             \n\
             EXPOSE {port}\n\
             \n\
             CMD [\"java\", \"-jar\", \"target/*.jar\"]\n"
        );
    }

    format!(
        "FROM {base}\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY . .\n\
         RUN ./gradlew build\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"java\", \"-jar\", \"build/libs/*.jar\"]\n"
    )
}

fn generic_dockerfile(port: u16) -> String {
    format!(
        "FROM alpine:latest\n\
         \n\
         WORKDIR /app\n\
         \n\
         COPY . .\n\
         \n\
         EXPOSE {port}\n\
         \n\
         CMD [\"./app\"]\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn profile(language: Language, files: &[&str], manifests: &[&str]) -> ProjectProfile {
        ProjectProfile {
            root: PathBuf::from("/proj"),
            language,
            framework: None,
            manifests: manifests.iter().map(|s| s.to_string()).collect(),
            files: files.iter().map(|s| s.to_string()).collect(),
            extensions: BTreeSet::new(),
            total_files: files.len(),
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

    #[test]
    fn test_size_flag_selects_slim_base() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        let prof = profile(Language::Python, &["main.py"], &["requirements.txt"]);

        let generator = DockerfileGenerator::new();
        assert!(generator.render(&prof, &req).starts_with("FROM python:3.11\n"));

        req.optimize_for_size = true;
        assert!(generator
            .render(&prof, &req)
            .starts_with("FROM python:3.11-slim\n"));
    }

    #[test]
    fn test_multi_stage_go_template() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.multi_stage = true;
        let prof = profile(Language::Go, &["main.go"], &["go.mod"]);

        let content = DockerfileGenerator::new().render(&prof, &req);

        assert!(content.contains("AS builder"));
        assert!(content.contains("COPY --from=builder"));
        assert!(content.contains("EXPOSE 8080"));
    }

    #[test]
    fn test_main_file_detection() {
        let temp = TempDir::new().unwrap();
        let req = request(&temp);
        let prof = profile(Language::Python, &["server.py"], &["requirements.txt"]);

        let content = DockerfileGenerator::new().render(&prof, &req);
        assert!(content.contains("CMD [\"python\", \"server.py\"]"));
    }

    #[test]
    fn test_custom_instructions_appended_in_order() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.custom_instructions = vec![
            "RUN apt-get update".to_string(),
            "ENV MODE=production".to_string(),
        ];
        let prof = profile(Language::Node, &["index.js"], &["package.json"]);

        let content = DockerfileGenerator::new().render(&prof, &req);

        let run = content.find("RUN apt-get update").unwrap();
        let env = content.find("ENV MODE=production").unwrap();
        assert!(content.contains("# Custom instructions"));
        assert!(run < env);
    }

    #[tokio::test]
    async fn test_execute_overwrites_existing_dockerfile() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Dockerfile"), "FROM stale\n").unwrap();

        let req = request(&temp);
        let context = PipelineContext::default()
            .with_profile(profile(Language::Node, &["index.js"], &["package.json"]));

        let outcome = DockerfileGenerator::new()
            .execute(&req, context)
            .await
            .unwrap();

        let written = std::fs::read_to_string(temp.path().join("Dockerfile")).unwrap();
        assert!(written.starts_with("FROM node:18\n"));
        assert_eq!(outcome.artifacts[0].kind, ArtifactKind::Dockerfile);
        assert!(outcome.context.dockerfile.is_some());
    }

    #[tokio::test]
    async fn test_execute_without_profile_is_generation_error() {
        let temp = TempDir::new().unwrap();
        let req = request(&temp);

        let result = DockerfileGenerator::new()
            .execute(&req, PipelineContext::default())
            .await;

        assert!(matches!(result, Err(StepError::Generation(_))));
    }
}
