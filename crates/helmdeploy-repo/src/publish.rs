//! The publish protocol for a single request

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{RepoError, Result};
use crate::http::ChartRepoClient;
use crate::registry::RegistryClient;
use crate::request::ChartDeploymentRequest;

/// How a request reaches the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Synchronous single-request path; a missing archive is an error
    Immediate,
    /// Deploy-at-end flush; a missing archive is skipped
    Deferred,
}

/// Result of publishing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { location: String },
    SkippedMissingArchive,
}

/// Publishes a deployment request
#[async_trait]
pub trait ChartPublisher: Send + Sync {
    async fn publish(&self, request: &ChartDeploymentRequest, mode: PublishMode) -> Result<PublishOutcome>;
}

/// Publisher backed by the repository HTTP client and a registry backend
pub struct Publisher {
    http: ChartRepoClient,
    registry: Arc<dyn RegistryClient>,
}

impl Publisher {
    pub fn new(http: ChartRepoClient, registry: Arc<dyn RegistryClient>) -> Self {
        Self { http, registry }
    }
}

#[async_trait]
impl ChartPublisher for Publisher {
    async fn publish(&self, request: &ChartDeploymentRequest, mode: PublishMode) -> Result<PublishOutcome> {
        let archive = request.archive();
        if !archive.is_file() {
            return match mode {
                PublishMode::Immediate => Err(RepoError::ArchiveNotFound {
                    path: archive.clone(),
                }),
                PublishMode::Deferred => {
                    tracing::warn!(
                        "File {} not found, skipping deployment of {}",
                        archive.display(),
                        request.chart()
                    );
                    Ok(PublishOutcome::SkippedMissingArchive)
                }
            };
        }

        match request {
            ChartDeploymentRequest::Repository(repo) => {
                if repo.chart.is_snapshot() && repo.delete_url().is_some() {
                    tracing::info!("Deleting snapshot {} from {} if present", repo.chart, repo.repo_name);
                    self.http.delete_if_exists(repo).await;
                }

                let bytes = tokio::fs::read(&repo.archive).await?;
                self.http.upload(repo, bytes).await?;
                Ok(PublishOutcome::Published {
                    location: repo.publish_url(),
                })
            }
            ChartDeploymentRequest::Registry(registry) => {
                tracing::info!("Pushing {} to {}", registry.chart, registry.remote);
                let location = self.registry.push(registry).await?;
                Ok(PublishOutcome::Published { location })
            }
        }
    }
}
