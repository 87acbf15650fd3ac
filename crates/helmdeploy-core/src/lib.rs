//! helmdeploy core - building blocks shared by every goal
//!
//! This crate provides:
//! - `ChartIdentity` / `BuildLayout`: chart coordinates and where their files live
//! - `PropertyResolver`: ordered property lookup for placeholder substitution
//! - `substitute`: the placeholder substitution engine
//! - `ExclusionSet`: glob/regex rules excluding files from substitution
//! - `HelmRunner`: the seam through which every helm invocation passes

pub mod archive;
pub mod chart;
pub mod error;
pub mod exclusion;
pub mod helm;
pub mod properties;
pub mod substitution;

pub use archive::{ChartMetadata, ensure_archive_exists, read_chart_metadata, verify_archive};
pub use chart::{BuildLayout, ChartIdentity, SNAPSHOT_SUFFIX};
pub use error::{CoreError, Result};
pub use exclusion::{ExclusionRule, ExclusionSet};
pub use helm::{DEFAULT_HELM_TIMEOUT, HelmCli, HelmCommand, HelmOutput, HelmRunner};
pub use properties::{
    EnvironmentSource, MapSource, ProjectProperties, PropertyResolver, PropertySource,
    ResolvedProperty,
};
pub use substitution::{
    LineSubstitution, PlaceholderToken, SubstitutionReport, UnresolvedProperty, is_candidate,
    scan, substitute, substitute_line,
};
