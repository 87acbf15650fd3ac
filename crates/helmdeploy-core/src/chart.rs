//! Chart identity and the on-disk build layout
//!
//! Packaging and deployment never hand the archive to each other directly.
//! Both sides derive the same path from the chart name and version:
//! `{output_dir}/helm/{name}-{version}.tgz`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Version suffix marking a chart that may be republished under the same coordinates
pub const SNAPSHOT_SUFFIX: &str = "SNAPSHOT";

/// Name and version of a chart
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartIdentity {
    pub name: String,
    pub version: String,
}

impl ChartIdentity {
    /// Create a chart identity, rejecting empty or path-like names
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let version = version.into();

        if name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: "chart name must not be empty".to_string(),
            });
        }
        if name.contains('/') || name.contains('\\') {
            return Err(CoreError::InvalidChart {
                message: format!("chart name '{}' must not contain path separators", name),
            });
        }
        if version.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: format!("chart '{}' has an empty version", name),
            });
        }

        Ok(Self { name, version })
    }

    /// Whether this is a snapshot version
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// File name of the packaged chart, e.g. `mychart-1.2.3.tgz`
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

impl fmt::Display for ChartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Directory layout of a single build unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Project base directory; relative paths in configuration resolve against it
    pub base_dir: PathBuf,
    /// Build output directory (`target` by default)
    pub output_dir: PathBuf,
}

impl BuildLayout {
    pub fn new(base_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let output_dir = output_dir.into();
        let output_dir = if output_dir.is_absolute() {
            output_dir
        } else {
            base_dir.join(output_dir)
        };
        Self {
            base_dir,
            output_dir,
        }
    }

    /// `{output_dir}/helm`, the working directory of every helm invocation
    pub fn helm_dir(&self) -> PathBuf {
        self.output_dir.join("helm")
    }

    /// Directory receiving the substituted chart sources
    pub fn chart_work_dir(&self, chart: &ChartIdentity) -> PathBuf {
        self.helm_dir().join(&chart.name)
    }

    /// Expected location of the packaged chart
    pub fn archive_path(&self, chart: &ChartIdentity) -> PathBuf {
        self.helm_dir().join(chart.archive_file_name())
    }

    /// Default chart source folder: `{base_dir}/src/main/helm/{name}`
    pub fn default_chart_folder(&self, chart: &ChartIdentity) -> PathBuf {
        self.base_dir
            .join("src")
            .join("main")
            .join("helm")
            .join(&chart.name)
    }

    /// Resolve a configured path against the base directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_detection() {
        assert!(ChartIdentity::new("foo", "1.0.0-SNAPSHOT").unwrap().is_snapshot());
        assert!(ChartIdentity::new("foo", "1.0-SNAPSHOT").unwrap().is_snapshot());
        assert!(!ChartIdentity::new("foo", "1.0.0").unwrap().is_snapshot());
        assert!(!ChartIdentity::new("foo", "1.0.0-rc1").unwrap().is_snapshot());
        assert!(!ChartIdentity::new("foo", "1.0.0-snapshot").unwrap().is_snapshot());
    }

    #[test]
    fn test_invalid_identity() {
        assert!(ChartIdentity::new("", "1.0.0").is_err());
        assert!(ChartIdentity::new("a/b", "1.0.0").is_err());
        assert!(ChartIdentity::new("foo", " ").is_err());
    }

    #[test]
    fn test_archive_path() {
        let chart = ChartIdentity::new("mychart", "1.2.3").unwrap();
        let layout = BuildLayout::new("/work/app", "target");

        assert_eq!(chart.archive_file_name(), "mychart-1.2.3.tgz");
        assert_eq!(layout.helm_dir(), PathBuf::from("/work/app/target/helm"));
        assert_eq!(
            layout.archive_path(&chart),
            PathBuf::from("/work/app/target/helm/mychart-1.2.3.tgz")
        );
        assert_eq!(
            layout.chart_work_dir(&chart),
            PathBuf::from("/work/app/target/helm/mychart")
        );
        assert_eq!(
            layout.default_chart_folder(&chart),
            PathBuf::from("/work/app/src/main/helm/mychart")
        );
    }

    #[test]
    fn test_absolute_output_dir_kept() {
        let layout = BuildLayout::new("/work/app", "/tmp/out");
        assert_eq!(layout.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(layout.resolve(Path::new("values.yaml")), PathBuf::from("/work/app/values.yaml"));
        assert_eq!(layout.resolve(Path::new("/abs/values.yaml")), PathBuf::from("/abs/values.yaml"));
    }
}
