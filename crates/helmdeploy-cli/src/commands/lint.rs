//! Lint command - `helm lint` on the packaged chart sources

use console::style;
use helmdeploy_core::{HelmCommand, HelmRunner};

use super::{helm_for, should_run};
use crate::config::BuildUnit;
use crate::error::{CliError, Result, context};

pub async fn run(units: &[BuildUnit], strict: bool) -> Result<()> {
    for unit in units {
        if !should_run(unit, "lint", unit.config.lint.skip) {
            continue;
        }
        require_work_dir(unit, context::LINT)?;

        let command = HelmCommand::lint(
            &unit.layout.helm_dir(),
            &unit.chart.name,
            strict || unit.config.lint.strict,
            &unit.values_files(),
        );
        let output = helm_for(unit)
            .run(&command)
            .await
            .map_err(|e| CliError::core(context::LINT, e))?;

        for line in output.stdout_lossy().lines() {
            tracing::info!("Output: {}", line);
        }
        println!("{} {}", style("✓").green(), unit.chart);
    }
    Ok(())
}

/// Lint and template work on the substituted sources left by `package`
pub(crate) fn require_work_dir(unit: &BuildUnit, context: &str) -> Result<()> {
    let work_dir = unit.layout.chart_work_dir(&unit.chart);
    if work_dir.is_dir() {
        Ok(())
    } else {
        Err(CliError::config_with_help(
            format!("{}: chart sources not found in {}", context, work_dir.display()),
            "Run `helmdeploy package` first",
        ))
    }
}
