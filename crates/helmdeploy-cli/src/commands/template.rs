//! Template command - render the chart with `helm template` into a file

use console::style;
use helmdeploy_core::{CoreError, HelmCommand, HelmRunner};
use std::path::Path;

use super::lint::require_work_dir;
use super::{helm_for, should_run};
use crate::config::BuildUnit;
use crate::error::{CliError, Result, context};

pub async fn run(units: &[BuildUnit], output: Option<&Path>) -> Result<()> {
    if output.is_some() && units.len() > 1 {
        return Err(CliError::config(
            "--output cannot be used with a workspace of several modules",
        ));
    }

    for unit in units {
        if !should_run(unit, "template", unit.config.template.skip) {
            continue;
        }
        require_work_dir(unit, context::TEMPLATE)?;
        let core = |e: CoreError| CliError::core(context::TEMPLATE, e);

        let command = HelmCommand::template(
            &unit.layout.helm_dir(),
            &unit.chart.name,
            &unit.values_files(),
        );
        let rendered = helm_for(unit).run(&command).await.map_err(core)?;

        let target = match output {
            Some(path) => unit.layout.resolve(path),
            None => unit.template_output(),
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| core(e.into()))?;
        }
        std::fs::write(&target, &rendered.stdout).map_err(|e| core(e.into()))?;

        tracing::info!("Rendered helm template to '{}'", target.display());
        println!("{} {}", style("Rendered").green().bold(), target.display());
    }
    Ok(())
}
