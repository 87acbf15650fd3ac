//! Project configuration (`helmdeploy.yaml`)
//!
//! ```yaml
//! project:
//!   artifactId: my-service
//!   version: 1.2.3-SNAPSHOT
//!   properties:
//!     image.tag: latest
//! chart:
//!   name: my-service
//! repos:
//!   - name: chartRepo
//!     url: https://charts.example.com
//!     serverId: chartmuseum
//! deploy:
//!   skipSnapshots: false
//! ```
//!
//! A workspace file lists `modules` instead; each module directory holds its
//! own `helmdeploy.yaml`.

use helmdeploy_core::{BuildLayout, ChartIdentity, ExclusionSet, ProjectProperties, PropertyResolver};
use helmdeploy_repo::{Registry, RegistryClientKind, Repo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "helmdeploy.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: Option<ProjectSection>,

    #[serde(default)]
    pub chart: ChartSection,

    #[serde(default)]
    pub repos: Vec<Repo>,

    #[serde(default)]
    pub registries: Vec<Registry>,

    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub helm: HelmSection,

    /// Files excluded from substitution (`glob:` or `regex:` prefixed)
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Values files passed to lint and template, relative to the base directory
    #[serde(default)]
    pub values_files: Vec<PathBuf>,

    #[serde(default)]
    pub lint: LintSection,

    #[serde(default)]
    pub template: TemplateSection,

    /// Skip every goal
    #[serde(default)]
    pub skip: bool,

    /// Module directories of a workspace, relative to this file
    #[serde(default)]
    pub modules: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectSection {
    pub artifact_id: String,
    pub version: String,

    /// Defaults to the directory holding the configuration file
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Build property bag, lowest substitution precedence
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChartSection {
    /// Defaults to the artifact id
    #[serde(default)]
    pub name: Option<String>,

    /// Defaults to the project version
    #[serde(default)]
    pub version: Option<String>,

    /// Defaults to `src/main/helm/{name}`
    #[serde(default)]
    pub folder: Option<PathBuf>,

    #[serde(default)]
    pub app_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeploySection {
    #[serde(default)]
    pub repo_name: Option<String>,

    #[serde(default)]
    pub registry_url: Option<String>,

    #[serde(default = "default_true")]
    pub skip_snapshots: bool,

    #[serde(default)]
    pub deploy_at_end: bool,

    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub registry_client: RegistryClientKind,

    /// Plain HTTP for the native OCI client
    #[serde(default)]
    pub insecure_registry: bool,

    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            repo_name: None,
            registry_url: None,
            skip_snapshots: true,
            deploy_at_end: false,
            skip: false,
            registry_client: RegistryClientKind::default(),
            insecure_registry: false,
            timeout: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelmSection {
    #[serde(default = "default_helm_executable")]
    pub executable: PathBuf,

    #[serde(default = "default_helm_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub skip_dependency_update: bool,
}

impl Default for HelmSection {
    fn default() -> Self {
        Self {
            executable: default_helm_executable(),
            timeout: default_helm_timeout(),
            skip_dependency_update: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LintSection {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub skip: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateSection {
    /// Defaults to `{outputDir}/test-classes/helm.yaml`
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub skip: bool,
}

fn default_true() -> bool {
    true
}

fn default_http_timeout() -> Duration {
    helmdeploy_repo::DEFAULT_HTTP_TIMEOUT
}

fn default_helm_executable() -> PathBuf {
    PathBuf::from("helm")
}

fn default_helm_timeout() -> Duration {
    helmdeploy_core::DEFAULT_HELM_TIMEOUT
}

impl ProjectConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config_with_help(
                format!("Cannot read {}: {}", path.display(), e),
                format!("Create a {} or pass --config", CONFIG_FILE),
            )
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("Invalid {}: {}", path.display(), e)))
    }

    /// Resolve the build units described by the file at `path`
    pub fn load_units(path: &Path) -> Result<Vec<BuildUnit>> {
        let config = Self::load_from(path)?;
        let dir = std::path::absolute(config_dir(path))?;

        if config.modules.is_empty() {
            return Ok(vec![BuildUnit::resolve(config, &dir)?]);
        }

        let mut units = Vec::with_capacity(config.modules.len());
        for module in &config.modules {
            let module_dir = dir.join(module);
            let module_config = Self::load_from(&module_dir.join(CONFIG_FILE))?;
            if !module_config.modules.is_empty() {
                return Err(CliError::config(format!(
                    "Module {} declares modules of its own; nested workspaces are not supported",
                    module.display()
                )));
            }
            units.push(BuildUnit::resolve(module_config, &module_dir)?);
        }
        Ok(units)
    }
}

fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// One chart to build, with every default applied
#[derive(Debug, Clone)]
pub struct BuildUnit {
    pub config: ProjectConfig,
    pub project: ProjectSection,
    pub chart: ChartIdentity,
    pub layout: BuildLayout,
    pub chart_folder: PathBuf,
}

impl BuildUnit {
    fn resolve(config: ProjectConfig, dir: &Path) -> Result<Self> {
        let project = config.project.clone().ok_or_else(|| {
            CliError::config_with_help(
                format!("No project section in {}", dir.join(CONFIG_FILE).display()),
                "Add project.artifactId and project.version, or list modules",
            )
        })?;

        let base_dir = match &project.base_dir {
            Some(base) => dir.join(base),
            None => dir.to_path_buf(),
        };
        let layout = BuildLayout::new(base_dir, project.output_dir.clone());

        let name = config
            .chart
            .name
            .clone()
            .unwrap_or_else(|| project.artifact_id.clone());
        let version = config
            .chart
            .version
            .clone()
            .unwrap_or_else(|| project.version.clone());
        let chart = ChartIdentity::new(name, version)
            .map_err(|e| CliError::config(e.to_string()))?;

        let chart_folder = match &config.chart.folder {
            Some(folder) => layout.resolve(folder),
            None => layout.default_chart_folder(&chart),
        };

        Ok(Self {
            config,
            project,
            chart,
            layout,
            chart_folder,
        })
    }

    /// Substitution resolver: project, overrides, environment, properties
    pub fn property_resolver(&self, overrides: &BTreeMap<String, String>) -> PropertyResolver {
        PropertyResolver::standard(
            ProjectProperties {
                artifact_id: self.project.artifact_id.clone(),
                version: self.project.version.clone(),
                chart_name: self.chart.name.clone(),
                chart_version: self.chart.version.clone(),
            },
            overrides.clone(),
            self.project.properties.clone(),
        )
    }

    pub fn exclusions(&self) -> Result<ExclusionSet> {
        ExclusionSet::parse(&self.config.exclusions).map_err(|e| CliError::config(e.to_string()))
    }

    /// Values files resolved against the base directory
    pub fn values_files(&self) -> Vec<PathBuf> {
        self.config
            .values_files
            .iter()
            .map(|f| self.layout.resolve(f))
            .collect()
    }

    pub fn template_output(&self) -> PathBuf {
        match &self.config.template.output_file {
            Some(file) => self.layout.resolve(file),
            None => self.layout.output_dir.join("test-classes").join("helm.yaml"),
        }
    }

    pub fn has_sources(&self) -> bool {
        self.chart_folder.is_dir()
    }
}

/// Parse `key=value` command line overrides
pub fn parse_overrides(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| {
                    CliError::config_with_help(
                        format!("Invalid property override '{}'", pair),
                        "Use --property key=value",
                    )
                })
        })
        .collect()
}
