//! Configuration for slipway.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SLIPWAY_PROFILE, SLIPWAY_NAMESPACE)
//! 2. Config file (.slipway/config.yaml)
//! 3. Defaults
//!
//! Config file discovery searches the current directory and parents for
//! .slipway/config.yaml. The resolved configuration is loaded once and
//! passed down explicitly; there is no process-wide singleton.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

/// Raw config file schema (matches the YAML structure).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
    #[serde(default)]
    pub binaries: BinariesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSection {
    pub namespace: Option<String>,
    pub image_tag: Option<String>,
    pub cluster_profile: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterSection {
    pub cpus: Option<u32>,
    pub memory: Option<String>,
    pub disk_size: Option<String>,
    pub driver: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeoutsSection {
    pub build_seconds: Option<u64>,
    pub cluster_start_seconds: Option<u64>,
    pub cluster_status_seconds: Option<u64>,
    pub image_load_seconds: Option<u64>,
    pub install_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BinariesSection {
    pub docker: Option<String>,
    pub minikube: Option<String>,
    pub helm: Option<String>,
}

/// Defaults filled into a request during validation.
#[derive(Debug, Clone)]
pub struct RequestDefaults {
    /// Namespace used when the request leaves it unset
    pub namespace: String,
    /// Image tag used when the request leaves it unset
    pub image_tag: String,
    /// Cluster profile used when the request leaves it unset
    pub cluster_profile: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            image_tag: "latest".to_string(),
            cluster_profile: "slipway-cluster".to_string(),
        }
    }
}

/// Shape of a cluster created by `ensure_cluster`.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    pub cpus: u32,
    pub memory: String,
    pub disk_size: String,
    pub driver: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            cpus: 2,
            memory: "2048mb".to_string(),
            disk_size: "20gb".to_string(),
            driver: "docker".to_string(),
        }
    }
}

/// Per-tool timeouts in seconds.
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub build_seconds: u64,
    pub cluster_start_seconds: u64,
    pub cluster_status_seconds: u64,
    pub image_load_seconds: u64,
    pub install_seconds: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            build_seconds: 600,
            cluster_start_seconds: 300,
            cluster_status_seconds: 30,
            image_load_seconds: 180,
            install_seconds: 300,
        }
    }
}

/// External tool binaries.
#[derive(Debug, Clone)]
pub struct Binaries {
    pub docker: String,
    pub minikube: String,
    pub helm: String,
}

impl Default for Binaries {
    fn default() -> Self {
        Self {
            docker: "docker".to_string(),
            minikube: "minikube".to_string(),
            helm: "helm".to_string(),
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub defaults: RequestDefaults,
    pub cluster: ClusterSettings,
    pub timeouts: Timeouts,
    pub binaries: Binaries,
    /// Path of the config file that was used, when one was found
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();

        let mut config = match config_file {
            Some(ref path) => {
                let file = load_config_file(path)?;
                Self::from_file(file, Some(path.clone()))
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = load_config_file(path)?;
        let mut config = Self::from_file(file, Some(path.to_path_buf()));
        config.apply_env();
        Ok(config)
    }

    fn from_file(file: ConfigFile, config_file: Option<PathBuf>) -> Self {
        let base = Self::default();
        Self {
            defaults: RequestDefaults {
                namespace: file.defaults.namespace.unwrap_or(base.defaults.namespace),
                image_tag: file.defaults.image_tag.unwrap_or(base.defaults.image_tag),
                cluster_profile: file
                    .defaults
                    .cluster_profile
                    .unwrap_or(base.defaults.cluster_profile),
            },
            cluster: ClusterSettings {
                cpus: file.cluster.cpus.unwrap_or(base.cluster.cpus),
                memory: file.cluster.memory.unwrap_or(base.cluster.memory),
                disk_size: file.cluster.disk_size.unwrap_or(base.cluster.disk_size),
                driver: file.cluster.driver.unwrap_or(base.cluster.driver),
            },
            timeouts: Timeouts {
                build_seconds: file
                    .timeouts
                    .build_seconds
                    .unwrap_or(base.timeouts.build_seconds),
                cluster_start_seconds: file
                    .timeouts
                    .cluster_start_seconds
                    .unwrap_or(base.timeouts.cluster_start_seconds),
                cluster_status_seconds: file
                    .timeouts
                    .cluster_status_seconds
                    .unwrap_or(base.timeouts.cluster_status_seconds),
                image_load_seconds: file
                    .timeouts
                    .image_load_seconds
                    .unwrap_or(base.timeouts.image_load_seconds),
                install_seconds: file
                    .timeouts
                    .install_seconds
                    .unwrap_or(base.timeouts.install_seconds),
            },
            binaries: Binaries {
                docker: file.binaries.docker.unwrap_or(base.binaries.docker),
                minikube: file.binaries.minikube.unwrap_or(base.binaries.minikube),
                helm: file.binaries.helm.unwrap_or(base.binaries.helm),
            },
            config_file,
        }
    }

    fn apply_env(&mut self) {
        if let Ok(profile) = std::env::var("SLIPWAY_PROFILE") {
            if !profile.is_empty() {
                self.defaults.cluster_profile = profile;
            }
        }
        if let Ok(namespace) = std::env::var("SLIPWAY_NAMESPACE") {
            if !namespace.is_empty() {
                self.defaults.namespace = namespace;
            }
        }
    }
}

/// Find a config file by searching the current directory and parents.
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".slipway").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse a config file.
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
