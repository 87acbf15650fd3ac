//! Package command - substitute placeholders and run `helm package`

use console::style;
use helmdeploy_core::{
    CoreError, HelmCommand, HelmRunner, ensure_archive_exists, substitute, verify_archive,
};
use helmdeploy_repo::validate;

use super::{GoalContext, helm_for, should_run};
use crate::config::BuildUnit;
use crate::error::{CliError, Result, context};

pub async fn run(units: &[BuildUnit], ctx: &GoalContext) -> Result<()> {
    for unit in units {
        package_unit(unit, ctx).await?;
    }
    Ok(())
}

async fn package_unit(unit: &BuildUnit, ctx: &GoalContext) -> Result<()> {
    if !should_run(unit, "package", false) {
        return Ok(());
    }
    let core = |e: CoreError| CliError::core(context::PACKAGE, e);

    validate(&unit.config.repos, &unit.config.registries)
        .map_err(|e| CliError::repo(context::PACKAGE, e))?;

    println!(
        "{} {} v{}",
        style("Packaging").cyan().bold(),
        unit.chart.name,
        unit.chart.version
    );

    let work_dir = unit.layout.chart_work_dir(&unit.chart);
    if work_dir.exists() {
        tracing::info!("Clear target directory to ensure clean target package");
        std::fs::remove_dir_all(&work_dir).map_err(|e| core(e.into()))?;
    }
    std::fs::create_dir_all(&work_dir).map_err(|e| core(e.into()))?;
    tracing::info!("Created target helm directory {}", work_dir.display());

    let resolver = unit.property_resolver(&ctx.overrides);
    let exclusions = unit.exclusions()?;
    let report = substitute(&unit.chart_folder, &work_dir, &resolver, &exclusions).map_err(core)?;
    println!(
        "  {} {} file(s), {} copied, {} unresolved placeholder(s)",
        style("Substituted").green(),
        report.substituted.len(),
        report.copied.len(),
        report.unresolved.len()
    );

    let helm = helm_for(unit);
    let helm_dir = unit.layout.helm_dir();
    let credentials = ctx.credential_resolver()?;

    for repo in &unit.config.repos {
        let creds = credentials
            .resolve(
                repo.username.as_deref(),
                repo.password.as_deref(),
                repo.server_id.as_deref(),
            )
            .map_err(|e| CliError::repo(context::PACKAGE, e))?;
        let command = HelmCommand::repo_add(
            &helm_dir,
            &repo.name,
            repo.base_url(),
            creds.as_ref().map(|c| (c.username.as_str(), c.password.as_str())),
            repo.pass_credentials,
            repo.force_update,
        );
        helm.run(&command).await.map_err(core)?;
    }

    for registry in &unit.config.registries {
        let creds = credentials
            .resolve(
                registry.username.as_deref(),
                registry.password.as_deref(),
                registry.server_id.as_deref(),
            )
            .map_err(|e| CliError::repo(context::PACKAGE, e))?;
        if let Some(creds) = creds {
            let command = HelmCommand::registry_login(
                &helm_dir,
                &registry.host(),
                &creds.username,
                &creds.password,
            );
            helm.run(&command).await.map_err(core)?;
        }
    }

    if unit.config.helm.skip_dependency_update {
        tracing::debug!("Skipping helm dependency update");
    } else {
        helm.run(&HelmCommand::dependency_update(&work_dir))
            .await
            .map_err(core)?;
    }

    let command = HelmCommand::package(
        &helm_dir,
        &unit.chart.name,
        &unit.chart.version,
        unit.config.chart.app_version.as_deref(),
    );
    helm.run(&command).await.map_err(core)?;

    let archive = unit.layout.archive_path(&unit.chart);
    ensure_archive_exists(&archive).map_err(core)?;
    match verify_archive(&archive, &unit.chart) {
        Ok(mismatches) => {
            for mismatch in mismatches {
                tracing::warn!("{}: {}", archive.display(), mismatch);
            }
        }
        Err(e) => tracing::warn!("Could not inspect {}: {}", archive.display(), e),
    }

    tracing::info!("Successfully packaged chart and saved it to: {}", archive.display());
    println!("  {} {}", style("Created").green().bold(), archive.display());
    Ok(())
}
