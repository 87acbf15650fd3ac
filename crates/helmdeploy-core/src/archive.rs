//! Inspection of packaged chart archives
//!
//! The archive itself is produced by `helm package` and treated as opaque
//! bytes by the publish protocol. After packaging we only peek at the
//! top-level `Chart.yaml` to confirm helm produced what was asked for.

use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::chart::ChartIdentity;
use crate::error::{CoreError, Result};

/// The subset of `Chart.yaml` we care about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: Option<String>,
}

/// Read `<chart>/Chart.yaml` from a `.tgz` chart archive
pub fn read_chart_metadata(archive_path: &Path) -> Result<ChartMetadata> {
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_path_buf();
        let components: Vec<_> = path.components().collect();
        if components.len() == 2 && path.file_name().is_some_and(|n| n == "Chart.yaml") {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(serde_yaml::from_str(&content)?);
        }
    }

    Err(CoreError::InvalidArchive {
        path: archive_path.to_path_buf(),
        message: "no Chart.yaml at the chart root".to_string(),
    })
}

/// Compare the archive's metadata with the expected identity
///
/// Returns human-readable mismatches, empty when everything lines up.
pub fn verify_archive(archive_path: &Path, chart: &ChartIdentity) -> Result<Vec<String>> {
    let metadata = read_chart_metadata(archive_path)?;
    let mut mismatches = Vec::new();

    if metadata.name != chart.name {
        mismatches.push(format!(
            "archive contains chart '{}', expected '{}'",
            metadata.name, chart.name
        ));
    }
    if metadata.version != chart.version {
        mismatches.push(format!(
            "archive has version '{}', expected '{}'",
            metadata.version, chart.version
        ));
    }

    Ok(mismatches)
}

/// Fail with the "package first" error when the archive is missing
pub fn ensure_archive_exists(archive_path: &Path) -> Result<()> {
    if archive_path.is_file() {
        Ok(())
    } else {
        Err(CoreError::ArchiveNotFound {
            path: archive_path.to_path_buf(),
        })
    }
}
