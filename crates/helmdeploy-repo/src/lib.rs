//! helmdeploy chart publication
//!
//! This crate turns a packaged chart into a published one:
//!
//! - **Repositories**: ChartMuseum (`POST /api/charts`) and Artifactory (`PUT`)
//! - **OCI registries**: through `helm push` or a native OCI client
//! - **Snapshots**: deleted from ChartMuseum before being re-published
//! - **Deploy at end**: deferred requests published once by the last unit
//!
//! ## Example
//!
//! ```rust,no_run
//! use helmdeploy_core::{BuildLayout, ChartIdentity, HelmCli};
//! use helmdeploy_repo::{
//!     ChartRepoClient, CredentialResolver, DEFAULT_HTTP_TIMEOUT, DeployCoordinator,
//!     DeployInvocation, HelmRegistryClient, Publisher, Repo, RepoType, RequestSpec,
//!     build_request,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chart = ChartIdentity::new("mychart", "1.2.3")?;
//! let layout = BuildLayout::new(".", "target");
//! let repos = vec![Repo::new("chartRepo", RepoType::ChartMuseum, "https://charts.example.com")];
//!
//! let request = build_request(
//!     RequestSpec {
//!         chart: &chart,
//!         layout: &layout,
//!         repos: &repos,
//!         registries: &[],
//!         repo_name: None,
//!         registry_url: None,
//!     },
//!     &CredentialResolver::default(),
//! )?;
//!
//! let publisher = Publisher::new(
//!     ChartRepoClient::new(DEFAULT_HTTP_TIMEOUT)?,
//!     Arc::new(HelmRegistryClient::new(Arc::new(HelmCli::default()), layout.helm_dir())),
//! );
//! DeployCoordinator::single(Arc::new(publisher))
//!     .deploy(DeployInvocation { request, skip_snapshots: false, deploy_at_end: false })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Redirects are never followed, so credentials stay on the configured origin
//! - Registry passwords reach helm on stdin, never on the command line

pub mod barrier;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod http;
pub mod oci;
pub mod publish;
pub mod registry;
pub mod request;

// Re-exports for convenience
pub use barrier::{Arrival, DeployBarrier};
pub use config::{
    ConfigViolation, DEFAULT_REPO_NAME, DeployTarget, Registry, Repo, RepoType, select_target,
    validate, validate_registries, validate_repos,
};
pub use coordinator::{DeployCoordinator, DeployInvocation, DeployOutcome, DeployReport};
pub use credentials::{
    CredentialResolver, Credentials, DefaultSecretDecryptor, SETTINGS_ENV, SecretDecryptor,
    Server, ServerStore,
};
pub use error::{RepoError, Result};
pub use http::{ChartRepoClient, DEFAULT_HTTP_TIMEOUT};
pub use oci::NativeOciClient;
pub use publish::{ChartPublisher, PublishMode, PublishOutcome, Publisher};
pub use registry::{
    HelmRegistryClient, RegistryClient, RegistryClientKind, create_registry_client,
};
pub use request::{
    ChartDeploymentRequest, PublishMethod, RegistryRequest, RepositoryRequest, RequestSpec,
    build_request,
};
