//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No helm files found in {path}")]
    EmptyChartFolder { path: PathBuf },

    #[error("Chart folder not found: {path}")]
    ChartFolderNotFound { path: PathBuf },

    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidExclusion { pattern: String, message: String },

    #[error("File {path} is not valid UTF-8 and cannot be substituted")]
    NotUtf8 { path: PathBuf },

    #[error(
        "File {path} not found. Chart must be created in package phase first."
    )]
    ArchiveNotFound { path: PathBuf },

    #[error("Invalid chart archive {path}: {message}")]
    InvalidArchive { path: PathBuf, message: String },

    #[error("Invalid chart identity: {message}")]
    InvalidChart { message: String },

    #[error("Failed to start helm ({program}): {source}")]
    HelmSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("When executing '{command}' got result code '{code}'")]
    HelmFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Helm command '{command}' timed out after {seconds}s")]
    HelmTimeout { command: String, seconds: u64 },

    #[error("Failed to parse Chart.yaml: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
