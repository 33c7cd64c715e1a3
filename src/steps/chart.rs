//! Chart generation step.
//!
//! Writes a minimal Helm chart under `<project>/helm/<app>`: Chart.yaml,
//! values.yaml, a deployment and service template, and the helpers file.
//! The requested port becomes both the container port and the service
//! port. Re-running overwrites the chart deterministically.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{ArtifactKind, PipelineContext, StepError, StepKind, WorkflowRequest};

use super::{StepExecutor, StepOutcome};

const CHART_VERSION: &str = "0.1.0";
const APP_VERSION: &str = "1.0.0";

/// Helm chart generator.
#[derive(Debug, Default)]
pub struct ChartGenerator;

impl ChartGenerator {
    pub fn new() -> Self {
        Self
    }

    async fn write_chart(&self, chart_dir: &Path, request: &WorkflowRequest) -> Result<(), StepError> {
        let templates_dir = chart_dir.join("templates");
        tokio::fs::create_dir_all(&templates_dir)
            .await
            .map_err(|e| write_error(&templates_dir, e))?;

        let app = &request.app_name;
        let files = [
            (chart_dir.join("Chart.yaml"), chart_yaml(app)),
            (chart_dir.join("values.yaml"), values_yaml(request)),
            (templates_dir.join("deployment.yaml"), deployment_yaml(app, request.port)),
            (templates_dir.join("service.yaml"), service_yaml(app)),
            (templates_dir.join("_helpers.tpl"), helpers_tpl(app)),
        ];

        for (path, content) in files {
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| write_error(&path, e))?;
        }

        Ok(())
    }
}

fn write_error(path: &Path, err: std::io::Error) -> StepError {
    StepError::Generation(format!("failed to write {}: {}", path.display(), err))
}

#[async_trait]
impl StepExecutor for ChartGenerator {
    fn kind(&self) -> StepKind {
        StepKind::GenerateChart
    }

    #[instrument(skip(self, request, context), fields(app = %request.app_name))]
    async fn execute(
        &self,
        request: &WorkflowRequest,
        context: PipelineContext,
    ) -> Result<StepOutcome, StepError> {
        let chart_dir = request
            .project_path
            .join("helm")
            .join(&request.app_name);

        self.write_chart(&chart_dir, request).await?;

        debug!(chart = %chart_dir.display(), "chart written");

        let reference = chart_dir.display().to_string();
        Ok(StepOutcome::new(context.with_chart_dir(chart_dir))
            .with_artifact(ArtifactKind::ChartDir, reference))
    }
}

fn chart_yaml(app: &str) -> String {
    format!(
        "apiVersion: v2\n\
         name: {app}\n\
         description: A Helm chart for {app}\n\
         type: application\n\
         version: {CHART_VERSION}\n\
         appVersion: {APP_VERSION}\n"
    )
}

fn values_yaml(request: &WorkflowRequest) -> String {
    format!(
        r#"# Default values for {app}
replicaCount: 1

image:
  repository: {app}
  pullPolicy: IfNotPresent
  tag: {tag}

service:
  type: ClusterIP
  port: {port}

ingress:
  enabled: false

resources: {{}}

autoscaling:
  enabled: false
  minReplicas: 1
  maxReplicas: 100
  targetCPUUtilizationPercentage: 80

nodeSelector: {{}}

tolerations: []

affinity: {{}}
"#,
        app = request.app_name,
        tag = request.image_tag,
        port = request.port,
    )
}

fn deployment_yaml(app: &str, port: u16) -> String {
    format!(
        r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{{{ include "{app}.fullname" . }}}}
  labels:
    {{{{- include "{app}.labels" . | nindent 4 }}}}
spec:
  {{{{- if not .Values.autoscaling.enabled }}}}
  replicas: {{{{ .Values.replicaCount }}}}
  {{{{- end }}}}
  selector:
    matchLabels:
      {{{{- include "{app}.selectorLabels" . | nindent 6 }}}}
  template:
    metadata:
      labels:
        {{{{- include "{app}.selectorLabels" . | nindent 8 }}}}
    spec:
      containers:
        - name: {{{{ .Chart.Name }}}}
          image: "{{{{ .Values.image.repository }}}}:{{{{ .Values.image.tag | default .Chart.AppVersion }}}}"
          imagePullPolicy: {{{{ .Values.image.pullPolicy }}}}
          ports:
            - name: http
              containerPort: {port}
              protocol: TCP
          livenessProbe:
            httpGet:
              path: /
              port: http
          readinessProbe:
            httpGet:
              path: /
              port: http
          resources:
            {{{{- toYaml .Values.resources | nindent 12 }}}}
"#
    )
}

fn service_yaml(app: &str) -> String {
    format!(
        r#"apiVersion: v1
kind: Service
metadata:
  name: {{{{ include "{app}.fullname" . }}}}
  labels:
    {{{{- include "{app}.labels" . | nindent 4 }}}}
spec:
  type: {{{{ .Values.service.type }}}}
  ports:
    - port: {{{{ .Values.service.port }}}}
      targetPort: http
      protocol: TCP
      name: http
  selector:
    {{{{- include "{app}.selectorLabels" . | nindent 4 }}}}
"#
    )
}

fn helpers_tpl(app: &str) -> String {
    format!(
        r#"{{{{/*
Expand the name of the chart.
*/}}}}
{{{{- define "{app}.name" -}}}}
{{{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" }}}}
{{{{- end }}}}

{{{{/*
Create a default fully qualified app name, truncated at 63 chars to fit
Kubernetes name fields.
*/}}}}
{{{{- define "{app}.fullname" -}}}}
{{{{- if .Values.fullnameOverride }}}}
{{{{- .Values.fullnameOverride | trunc 63 | trimSuffix "-" }}}}
{{{{- else }}}}
{{{{- $name := default .Chart.Name .Values.nameOverride }}}}
{{{{- if contains $name .Release.Name }}}}
{{{{- .Release.Name | trunc 63 | trimSuffix "-" }}}}
{{{{- else }}}}
{{{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" }}}}
{{{{- end }}}}
{{{{- end }}}}
{{{{- end }}}}

{{{{/*
Create chart name and version as used by the chart label.
*/}}}}
{{{{- define "{app}.chart" -}}}}
{{{{- printf "%s-%s" .Chart.Name .Chart.Version | replace "+" "_" | trunc 63 | trimSuffix "-" }}}}
{{{{- end }}}}

{{{{/*
Common labels
*/}}}}
{{{{- define "{app}.labels" -}}}}
helm.sh/chart: {{{{ include "{app}.chart" . }}}}
{{{{ include "{app}.selectorLabels" . }}}}
{{{{- if .Chart.AppVersion }}}}
app.kubernetes.io/version: {{{{ .Chart.AppVersion | quote }}}}
{{{{- end }}}}
app.kubernetes.io/managed-by: {{{{ .Release.Service }}}}
{{{{- end }}}}

{{{{/*
Selector labels
*/}}}}
{{{{- define "{app}.selectorLabels" -}}}}
app.kubernetes.io/name: {{{{ include "{app}.name" . }}}}
app.kubernetes.io/instance: {{{{ .Release.Name }}}}
{{{{- end }}}}
"#
    )
}
