//! Native OCI registry push
//!
//! Pushes the chart archive as a single Helm content layer, without going
//! through the helm binary. Selected with `registryClient: native`.

use async_trait::async_trait;
use oci_distribution::Reference;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol, Config, ImageLayer};
use oci_distribution::secrets::RegistryAuth;

use crate::error::{RepoError, Result};
use crate::registry::{RegistryClient, oci_tag_reference};
use crate::request::RegistryRequest;

/// Media types for Helm charts in OCI
pub mod media_types {
    /// Helm chart config
    pub const HELM_CONFIG: &str = "application/vnd.cncf.helm.config.v1+json";
    /// Helm chart content layer
    pub const HELM_CONTENT: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";
}

/// OCI registry client speaking the distribution API directly
pub struct NativeOciClient {
    client: Client,
}

impl NativeOciClient {
    /// `insecure` talks plain HTTP, for local registries
    pub fn new(insecure: bool) -> Self {
        let config = ClientConfig {
            protocol: if insecure {
                ClientProtocol::Http
            } else {
                ClientProtocol::Https
            },
            ..Default::default()
        };
        Self {
            client: Client::new(config),
        }
    }

    /// Parse `oci://registry/repo:tag` or `registry/repo:tag`
    pub fn parse_reference(reference: &str) -> Result<Reference> {
        let clean = reference.trim_start_matches("oci://");
        Reference::try_from(clean).map_err(|e| RepoError::InvalidOciReference {
            reference: format!("{}: {}", reference, e),
        })
    }
}

impl Default for NativeOciClient {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl RegistryClient for NativeOciClient {
    async fn push(&self, request: &RegistryRequest) -> Result<String> {
        let tag_reference = oci_tag_reference(request);
        let reference = Self::parse_reference(&tag_reference)?;

        let archive = tokio::fs::read(&request.archive).await?;
        let config = Config {
            data: chart_config(request)?,
            media_type: media_types::HELM_CONFIG.to_string(),
            annotations: None,
        };
        let layers = vec![ImageLayer {
            data: archive,
            media_type: media_types::HELM_CONTENT.to_string(),
            annotations: None,
        }];

        let auth = match &request.credentials {
            Some(creds) => RegistryAuth::Basic(creds.username.clone(), creds.password.clone()),
            None => RegistryAuth::Anonymous,
        };

        let response = self
            .client
            .push(&reference, &layers, config, &auth, None)
            .await
            .map_err(|e| RepoError::OciPushFailed {
                message: e.to_string(),
            })?;

        tracing::info!("Pushed {} ({})", tag_reference, response.manifest_url);
        Ok(tag_reference)
    }
}

/// Helm config blob built from the archive's `Chart.yaml`
fn chart_config(request: &RegistryRequest) -> Result<Vec<u8>> {
    let metadata = helmdeploy_core::read_chart_metadata(&request.archive)?;
    let mut config = serde_json::json!({
        "apiVersion": "v2",
        "name": metadata.name,
        "version": metadata.version,
    });
    if let Some(app_version) = metadata.app_version {
        config["appVersion"] = serde_json::Value::String(app_version);
    }
    Ok(serde_json::to_vec(&config)?)
}
