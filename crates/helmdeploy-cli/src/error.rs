//! CLI error types with exit code handling
//!
//! Library errors are wrapped here, at the goal boundary, with the goal's
//! context prefix and sorted into exit codes.

use helmdeploy_core::CoreError;
use helmdeploy_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// Goal context prefixes
pub mod context {
    pub const PACKAGE: &str = "Error creating helm chart";
    pub const LINT: &str = "Error rendering helm lint";
    pub const TEMPLATE: &str = "Error rendering helm templates";
    pub const DEPLOY: &str = "Error creating/publishing helm chart";
}

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Project configuration, settings or arguments are invalid
    #[error("{message}")]
    #[diagnostic(code(helmdeploy::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The repository or registry rejected the chart
    #[error("{message}")]
    #[diagnostic(code(helmdeploy::cli::publish))]
    Publish { message: String },

    /// A helm invocation failed
    #[error("{message}")]
    #[diagnostic(code(helmdeploy::cli::helm))]
    Helm {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("{message}")]
    #[diagnostic(code(helmdeploy::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(helmdeploy::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Publish { .. } => exit_codes::PUBLISH_ERROR,
            CliError::Helm { .. } => exit_codes::HELM_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Wrap a core error with a goal context
    pub fn core(context: &str, err: CoreError) -> Self {
        let message = format!("{}: {}", context, err);
        match err {
            CoreError::ChartFolderNotFound { .. }
            | CoreError::EmptyChartFolder { .. }
            | CoreError::InvalidExclusion { .. }
            | CoreError::InvalidChart { .. } => Self::Config {
                message,
                help: None,
            },
            CoreError::HelmSpawn { .. } => Self::Helm {
                message,
                help: Some("Install helm or set helm.executable in helmdeploy.yaml".to_string()),
            },
            CoreError::HelmFailed { stderr, .. } => Self::Helm {
                message,
                help: (!stderr.trim().is_empty()).then(|| stderr.trim().to_string()),
            },
            CoreError::HelmTimeout { .. } => Self::Helm {
                message,
                help: Some("Raise helm.timeout in helmdeploy.yaml".to_string()),
            },
            CoreError::Io(_) => Self::Io { message },
            CoreError::ArchiveNotFound { .. }
            | CoreError::InvalidArchive { .. }
            | CoreError::NotUtf8 { .. }
            | CoreError::YamlParse(_) => Self::Other { message },
        }
    }

    /// Wrap a publication error with a goal context
    pub fn repo(context: &str, err: RepoError) -> Self {
        if let RepoError::Core(core) = err {
            return Self::core(context, core);
        }

        let message = format!("{}: {}", context, err);
        if err.is_configuration_error() || matches!(err, RepoError::DecryptionFailed { .. }) {
            return Self::Config {
                message,
                help: None,
            };
        }

        match err {
            RepoError::PublishFailed { .. }
            | RepoError::NetworkError { .. }
            | RepoError::Timeout { .. }
            | RepoError::OciPushFailed { .. } => Self::Publish { message },
            RepoError::Io(_) => Self::Io { message },
            _ => Self::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helm_failure_is_wrapped() {
        let err = CliError::core(
            context::PACKAGE,
            CoreError::HelmFailed {
                command: "helm package mychart --version 1.2.3".to_string(),
                code: 1,
                stderr: "Error: Chart.yaml file is missing\n".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::HELM_ERROR);
        insta::assert_snapshot!(err.to_string(), @"Error creating helm chart: When executing 'helm package mychart --version 1.2.3' got result code '1'");
    }

    #[test]
    fn test_publish_failure_is_wrapped() {
        let err = CliError::repo(
            context::DEPLOY,
            RepoError::PublishFailed {
                method: "PUT".to_string(),
                url: "https://repo/charts/foo-2.0.0.tgz".to_string(),
                status: 403,
                body: "forbidden".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::PUBLISH_ERROR);
        assert!(err.to_string().starts_with("Error creating/publishing helm chart: "));
    }

    #[test]
    fn test_nested_core_error_keeps_its_kind() {
        let err = CliError::repo(
            context::DEPLOY,
            RepoError::Core(CoreError::ChartFolderNotFound {
                path: PathBuf::from("/p/src/main/helm/x"),
            }),
        );
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_configuration_errors() {
        let err = CliError::repo(
            context::DEPLOY,
            RepoError::RepositoryNotFound {
                name: "missing".to_string(),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let err = CliError::repo(
            context::DEPLOY,
            RepoError::ArchiveNotFound {
                path: PathBuf::from("target/helm/x-1.tgz"),
            },
        );
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }
}
