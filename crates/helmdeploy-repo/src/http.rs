//! HTTP client for ChartMuseum and Artifactory repositories
//!
//! Redirects are never followed so credentials cannot leak to another origin;
//! a 3xx answer to an upload is reported like any other non-2xx status.

use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{RepoError, Result};
use crate::request::{PublishMethod, RepositoryRequest};

/// Default bound on a single HTTP request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Chart repository HTTP client
#[derive(Debug, Clone)]
pub struct ChartRepoClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ChartRepoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(concat!("helmdeploy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    /// Upload the archive with the backend's method; anything but 2xx fails
    pub async fn upload(&self, request: &RepositoryRequest, archive: Vec<u8>) -> Result<()> {
        let url = request.publish_url();
        let method = request.publish_method();
        tracing::info!(
            "Uploading {} ({} bytes, sha256 {}) to {}",
            request.chart.archive_file_name(),
            archive.len(),
            hex::encode(Sha256::digest(&archive)),
            url
        );

        let builder = match method {
            PublishMethod::Post => self.client.post(&url),
            PublishMethod::Put => self.client.put(&url),
        };
        let builder = authorize(builder, request.credentials.as_ref())
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(archive);

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            tracing::info!("{} {} returned {}", method, url, status.as_u16());
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RepoError::PublishFailed {
            method: method.to_string(),
            url,
            status: status.as_u16(),
            body,
        })
    }

    /// Delete the chart version if the backend supports it
    ///
    /// Returns whether the repository reported a deletion. Failures of any
    /// kind are logged and swallowed.
    pub async fn delete_if_exists(&self, request: &RepositoryRequest) -> bool {
        let Some(url) = request.delete_url() else {
            return false;
        };

        let builder = authorize(self.client.delete(&url), request.credentials.as_ref());
        match builder.send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                tracing::info!("Chart {} deleted", request.chart);
                true
            }
            Ok(response) => {
                tracing::debug!(
                    "Delete of {} returned {}, continuing",
                    url,
                    response.status().as_u16()
                );
                false
            }
            Err(e) => {
                tracing::debug!("Delete of {} failed: {}, continuing", url, e);
                false
            }
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> RepoError {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            RepoError::from(e)
        }
    }
}

fn authorize(builder: reqwest::RequestBuilder, credentials: Option<&Credentials>) -> reqwest::RequestBuilder {
    match credentials {
        Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
        None => builder,
    }
}
