//! Chart repository and OCI registry definitions
//!
//! Both lists come from the project configuration. They are validated as a
//! whole before any request is built, so configuration mistakes surface
//! before the first byte goes over the network.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::error::{RepoError, Result};

/// Name given to a repo entry that does not set one
pub const DEFAULT_REPO_NAME: &str = "chartRepo";

/// Chart repository backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoType {
    /// ChartMuseum: `POST /api/charts`, snapshots deleted first
    #[default]
    #[serde(rename = "CHARTMUSEUM", alias = "chartmuseum")]
    ChartMuseum,

    /// Artifactory helm repository: `PUT /{name}-{version}.tgz`
    #[serde(rename = "ARTIFACTORY", alias = "artifactory")]
    Artifactory,
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoType::ChartMuseum => write!(f, "CHARTMUSEUM"),
            RepoType::Artifactory => write!(f, "ARTIFACTORY"),
        }
    }
}

/// A chart repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Repo {
    /// Unique name; also used for `helm repo add`
    #[serde(default = "default_repo_name")]
    pub name: String,

    #[serde(default, rename = "type")]
    pub repo_type: RepoType,

    #[serde(default)]
    pub url: Option<String>,

    /// Reference to a server entry of the settings store
    #[serde(default)]
    pub server_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Forward credentials to chart downloads on other domains (`--pass-credentials`)
    #[serde(default)]
    pub pass_credentials: bool,

    /// Replace an existing local repo entry (`--force-update`)
    #[serde(default = "default_true")]
    pub force_update: bool,
}

fn default_repo_name() -> String {
    DEFAULT_REPO_NAME.to_string()
}

fn default_true() -> bool {
    true
}

impl Repo {
    pub fn new(name: impl Into<String>, repo_type: RepoType, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_type,
            url: Some(url.into()),
            server_id: None,
            username: None,
            password: None,
            pass_credentials: false,
            force_update: true,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// URL without trailing slash; only meaningful after validation
    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or_default().trim_end_matches('/')
    }

    /// Problems with this entry on its own
    pub fn violations(&self) -> Vec<ConfigViolation> {
        let subject = format!("repo '{}'", self.name);
        let mut violations = Vec::new();

        match self.url.as_deref().map(str::trim) {
            None | Some("") => violations.push(ConfigViolation::new(&subject, "Repo URL must be set")),
            Some(url) => {
                if let Err(reason) = check_http_url(url) {
                    violations.push(ConfigViolation::new(&subject, reason));
                }
            }
        }

        if self.server_id.is_some() {
            if self.username.is_some() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Repo username must not be set when serverId is used",
                ));
            }
            if self.password.is_some() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Repo password must not be set when serverId is used",
                ));
            }
        }

        violations
    }
}

/// An OCI registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Registry {
    /// `oci://host/path` (the scheme may be omitted)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub server_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Registry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            server_id: None,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Remote reference for `helm push`, always `oci://` prefixed, no trailing slash
    pub fn remote(&self) -> String {
        let url = self.url.as_deref().unwrap_or_default().trim().trim_end_matches('/');
        if url.starts_with("oci://") {
            url.to_string()
        } else {
            format!("oci://{}", url)
        }
    }

    /// Registry host used for `helm registry login`
    pub fn host(&self) -> String {
        self.remote()
            .trim_start_matches("oci://")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Whether a configured URL designates this registry
    pub fn matches_url(&self, url: &str) -> bool {
        let other = Registry::new(url);
        self.remote() == other.remote()
    }

    /// Problems with this entry on its own
    pub fn violations(&self) -> Vec<ConfigViolation> {
        let subject = match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => format!("registry '{}'", url),
            _ => "registry".to_string(),
        };
        let mut violations = Vec::new();

        match self.url.as_deref().map(str::trim) {
            None | Some("") => {
                violations.push(ConfigViolation::new(&subject, "Registry URL must be set"))
            }
            Some(_) => {
                if self.host().is_empty() {
                    violations.push(ConfigViolation::new(&subject, "Registry URL has no host"));
                }
            }
        }

        if self.server_id.is_some() {
            if self.username.is_some() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Registry username may not be set when serverId is used",
                ));
            }
            if self.password.is_some() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Registry password may not be set when serverId is used",
                ));
            }
        } else {
            if self.username.is_none() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Please specify either username or serverId",
                ));
            }
            if self.password.is_none() {
                violations.push(ConfigViolation::new(
                    &subject,
                    "Please specify either password or serverId",
                ));
            }
        }

        violations
    }
}

/// A single configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    /// What the problem is about, e.g. `repo 'chartRepo'`
    pub subject: String,
    pub message: String,
}

impl ConfigViolation {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Validate every repo entry and the uniqueness of their names
pub fn validate_repos(repos: &[Repo]) -> Vec<ConfigViolation> {
    let mut violations: Vec<ConfigViolation> = repos.iter().flat_map(Repo::violations).collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for repo in repos {
        *counts.entry(repo.name.as_str()).or_default() += 1;
    }
    for (name, count) in counts {
        if count > 1 {
            violations.push(ConfigViolation::new(
                format!("repo '{}'", name),
                format!("Multiple repos found with name '{}'", name),
            ));
        }
    }

    violations
}

/// Validate every registry entry
pub fn validate_registries(registries: &[Registry]) -> Vec<ConfigViolation> {
    registries.iter().flat_map(Registry::violations).collect()
}

/// Validate both lists, failing with every violation at once
pub fn validate(repos: &[Repo], registries: &[Registry]) -> Result<()> {
    let violations: Vec<ConfigViolation> = validate_repos(repos)
        .into_iter()
        .chain(validate_registries(registries))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(RepoError::ValidationFailed {
            violations: violations
                .iter()
                .map(|v| format!("  - {}", v))
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }
}

/// Where a chart should be published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTarget<'a> {
    Repo(&'a Repo),
    Registry(&'a Registry),
}

/// Pick the publication target
///
/// At most one of `repo_name` and `registry_url` may be given. When neither
/// is given the single configured repo or registry is used.
pub fn select_target<'a>(
    repos: &'a [Repo],
    registries: &'a [Registry],
    repo_name: Option<&str>,
    registry_url: Option<&str>,
) -> Result<DeployTarget<'a>> {
    match (repo_name, registry_url) {
        (Some(_), Some(_)) => Err(RepoError::InvalidConfig {
            message: "Only one of repoName and registryUrl may be specified".to_string(),
        }),
        (Some(name), None) => repos
            .iter()
            .find(|r| r.name == name)
            .map(DeployTarget::Repo)
            .ok_or_else(|| RepoError::RepositoryNotFound {
                name: name.to_string(),
            }),
        (None, Some(url)) => registries
            .iter()
            .find(|r| r.matches_url(url))
            .map(DeployTarget::Registry)
            .ok_or_else(|| RepoError::RegistryNotFound {
                url: url.to_string(),
            }),
        (None, None) => match (repos, registries) {
            ([repo], []) => Ok(DeployTarget::Repo(repo)),
            ([], [registry]) => Ok(DeployTarget::Registry(registry)),
            ([], []) => Err(RepoError::InvalidConfig {
                message: "No repo or registry configured to deploy to".to_string(),
            }),
            _ => Err(RepoError::InvalidConfig {
                message: format!(
                    "{} repos and {} registries configured; specify repoName or registryUrl",
                    repos.len(),
                    registries.len()
                ),
            }),
        },
    }
}

fn check_http_url(url: &str) -> std::result::Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid repo URL '{}': {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Repo URL '{}' must use http or https, not '{}'",
            url, other
        )),
    }
}
