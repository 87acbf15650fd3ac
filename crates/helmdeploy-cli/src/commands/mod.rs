//! CLI goals

pub mod deploy;
pub mod lint;
pub mod package;
pub mod template;

use helmdeploy_core::HelmCli;
use helmdeploy_repo::{CredentialResolver, ServerStore};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::BuildUnit;
use crate::error::{CliError, Result};

/// Options shared by every goal
#[derive(Debug, Clone, Default)]
pub struct GoalContext {
    /// `--property key=value` overrides
    pub overrides: BTreeMap<String, String>,
    /// Explicit settings store location
    pub settings: Option<PathBuf>,
}

impl GoalContext {
    pub fn credential_resolver(&self) -> Result<CredentialResolver> {
        let store = ServerStore::load(self.settings.as_deref())
            .map_err(|e| CliError::config(e.to_string()))?;
        Ok(CredentialResolver::new(store))
    }
}

/// The helm binary configured for a unit
pub fn helm_for(unit: &BuildUnit) -> HelmCli {
    HelmCli::new(&unit.config.helm.executable).with_timeout(unit.config.helm.timeout)
}

/// Whether a goal should run for this unit; logs why not
pub fn should_run(unit: &BuildUnit, goal: &str, goal_skip: bool) -> bool {
    if unit.config.skip || goal_skip {
        tracing::info!("helm-{} has been skipped", goal);
        return false;
    }
    if !unit.has_sources() {
        tracing::warn!(
            "No sources found in {}, skipping helm {}.",
            unit.chart_folder.display(),
            goal
        );
        return false;
    }
    true
}
