//! Chart deployment requests
//!
//! A request is built once per deploy invocation from validated
//! configuration and is immutable afterwards.

use helmdeploy_core::{BuildLayout, ChartIdentity};
use std::fmt;
use std::path::PathBuf;

use crate::config::{self, DeployTarget, Registry, Repo, RepoType};
use crate::credentials::{CredentialResolver, Credentials};
use crate::error::Result;

/// HTTP method used to upload to a chart repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMethod {
    Post,
    Put,
}

impl PublishMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMethod::Post => "POST",
            PublishMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for PublishMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload to a ChartMuseum or Artifactory repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRequest {
    pub chart: ChartIdentity,
    pub archive: PathBuf,
    pub repo_name: String,
    /// Base URL without trailing slash
    pub repo_url: String,
    pub repo_type: RepoType,
    pub credentials: Option<Credentials>,
}

impl RepositoryRequest {
    pub fn publish_method(&self) -> PublishMethod {
        match self.repo_type {
            RepoType::ChartMuseum => PublishMethod::Post,
            RepoType::Artifactory => PublishMethod::Put,
        }
    }

    pub fn publish_url(&self) -> String {
        match self.repo_type {
            RepoType::ChartMuseum => format!("{}/api/charts", self.repo_url),
            RepoType::Artifactory => format!("{}/{}", self.repo_url, self.chart.archive_file_name()),
        }
    }

    /// Only ChartMuseum supports deleting a chart version
    pub fn delete_url(&self) -> Option<String> {
        match self.repo_type {
            RepoType::ChartMuseum => Some(format!(
                "{}/api/charts/{}/{}",
                self.repo_url, self.chart.name, self.chart.version
            )),
            RepoType::Artifactory => None,
        }
    }
}

/// Push to an OCI registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRequest {
    pub chart: ChartIdentity,
    pub archive: PathBuf,
    /// `oci://host/path`
    pub remote: String,
    pub host: String,
    pub credentials: Option<Credentials>,
}

/// Everything needed to publish one chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartDeploymentRequest {
    Repository(RepositoryRequest),
    Registry(RegistryRequest),
}

impl ChartDeploymentRequest {
    pub fn chart(&self) -> &ChartIdentity {
        match self {
            ChartDeploymentRequest::Repository(r) => &r.chart,
            ChartDeploymentRequest::Registry(r) => &r.chart,
        }
    }

    pub fn archive(&self) -> &PathBuf {
        match self {
            ChartDeploymentRequest::Repository(r) => &r.archive,
            ChartDeploymentRequest::Registry(r) => &r.archive,
        }
    }

    /// Human-readable destination for logs
    pub fn destination(&self) -> String {
        match self {
            ChartDeploymentRequest::Repository(r) => r.publish_url(),
            ChartDeploymentRequest::Registry(r) => r.remote.clone(),
        }
    }
}

/// Where and what to deploy
#[derive(Debug, Clone, Copy)]
pub struct RequestSpec<'a> {
    pub chart: &'a ChartIdentity,
    pub layout: &'a BuildLayout,
    pub repos: &'a [Repo],
    pub registries: &'a [Registry],
    pub repo_name: Option<&'a str>,
    pub registry_url: Option<&'a str>,
}

/// Validate configuration, select the target and resolve its credentials
///
/// Every check happens here, before any network activity.
pub fn build_request(
    spec: RequestSpec<'_>,
    credentials: &CredentialResolver,
) -> Result<ChartDeploymentRequest> {
    config::validate(spec.repos, spec.registries)?;

    let target = config::select_target(spec.repos, spec.registries, spec.repo_name, spec.registry_url)?;
    let archive = spec.layout.archive_path(spec.chart);

    let request = match target {
        DeployTarget::Repo(repo) => ChartDeploymentRequest::Repository(RepositoryRequest {
            chart: spec.chart.clone(),
            archive,
            repo_name: repo.name.clone(),
            repo_url: repo.base_url().to_string(),
            repo_type: repo.repo_type,
            credentials: credentials.resolve(
                repo.username.as_deref(),
                repo.password.as_deref(),
                repo.server_id.as_deref(),
            )?,
        }),
        DeployTarget::Registry(registry) => ChartDeploymentRequest::Registry(RegistryRequest {
            chart: spec.chart.clone(),
            archive,
            remote: registry.remote(),
            host: registry.host(),
            credentials: credentials.resolve(
                registry.username.as_deref(),
                registry.password.as_deref(),
                registry.server_id.as_deref(),
            )?,
        }),
    };

    tracing::debug!("Built deploy request for {} -> {}", spec.chart, request.destination());
    Ok(request)
}
