//! Error types for chart publication

use std::path::PathBuf;
use thiserror::Error;

/// Chart publication errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Invalid repository configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid repository configuration:\n{violations}")]
    ValidationFailed { violations: String },

    #[error("Repository not found: {name}")]
    RepositoryNotFound { name: String },

    #[error("Registry not configured: {url}")]
    RegistryNotFound { url: String },

    #[error("Invalid settings file {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    // ============ Authentication Errors ============
    #[error("Failed to decrypt password of server '{server_id}': {message}")]
    DecryptionFailed { server_id: String, message: String },

    // ============ Publish Errors ============
    #[error("File {path} not found. Chart must be created in package phase first.")]
    ArchiveNotFound { path: PathBuf },

    #[error("Unexpected status code when {method}ing to chart repo {url}: {status}{}", format_body(.body))]
    PublishFailed {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ OCI Errors ============
    #[error("Invalid OCI reference: {reference}")]
    InvalidOciReference { reference: String },

    #[error("OCI push failed: {message}")]
    OciPushFailed { message: String },

    // ============ Deploy-at-end Errors ============
    #[error("Deploy barrier expected {total} unit(s) but another one arrived after the flush")]
    BarrierOverflow { total: usize },

    #[error("Deploy barrier lock poisoned")]
    BarrierPoisoned,

    // ============ Wrapped Errors ============
    #[error(transparent)]
    Core(#[from] helmdeploy_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for publication operations
pub type Result<T> = std::result::Result<T, RepoError>;

fn format_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(" - {}", body)
    }
}

impl RepoError {
    /// Whether this error was raised before any network activity
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RepoError::InvalidConfig { .. }
                | RepoError::ValidationFailed { .. }
                | RepoError::RepositoryNotFound { .. }
                | RepoError::RegistryNotFound { .. }
                | RepoError::InvalidSettings { .. }
                | RepoError::InvalidOciReference { .. }
        )
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_failed_message() {
        let err = RepoError::PublishFailed {
            method: "POST".to_string(),
            url: "https://charts.example.com/api/charts".to_string(),
            status: 409,
            body: "{\"error\":\"file already exists\"}\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status code when POSTing to chart repo https://charts.example.com/api/charts: 409 - {\"error\":\"file already exists\"}"
        );

        let err = RepoError::PublishFailed {
            method: "PUT".to_string(),
            url: "https://repo/charts/foo-2.0.0.tgz".to_string(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status code when PUTing to chart repo https://repo/charts/foo-2.0.0.tgz: 500"
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(RepoError::RepositoryNotFound { name: "x".into() }.is_configuration_error());
        assert!(!RepoError::Timeout { seconds: 30 }.is_configuration_error());
    }
}
