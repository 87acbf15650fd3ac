//! Deploy command - publish packaged charts
//!
//! Every module of the run is a participating unit. Requests are built and
//! validated for all of them before the first network call, then the units
//! deploy concurrently against one shared barrier.

use console::style;
use helmdeploy_repo::{
    ChartRepoClient, DeployBarrier, DeployCoordinator, DeployInvocation, DeployOutcome,
    PublishOutcome, Publisher, RepoError, RequestSpec, build_request, create_registry_client,
};
use std::sync::Arc;

use super::{GoalContext, helm_for};
use crate::config::BuildUnit;
use crate::error::{CliError, Result, context};

/// Command line overrides of the `deploy` section
#[derive(Debug, Clone, Default)]
pub struct DeployArgs {
    pub repo_name: Option<String>,
    pub registry_url: Option<String>,
    pub deploy_at_end: bool,
    pub include_snapshots: bool,
}

pub async fn run(units: Vec<BuildUnit>, ctx: &GoalContext, args: &DeployArgs) -> Result<()> {
    let repo_err = |e: RepoError| CliError::repo(context::DEPLOY, e);

    let active: Vec<BuildUnit> = units
        .into_iter()
        .filter(|unit| {
            let skipped = unit.config.skip || unit.config.deploy.skip;
            if skipped {
                tracing::info!("helm-deploy has been skipped for {}", unit.chart);
            }
            !skipped
        })
        .collect();
    if active.is_empty() {
        return Ok(());
    }

    let credentials = ctx.credential_resolver()?;
    let barrier = Arc::new(DeployBarrier::new(active.len()));

    let mut invocations = Vec::with_capacity(active.len());
    for unit in &active {
        let deploy = &unit.config.deploy;
        // A target chosen on the command line replaces the configured one
        let (repo_name, registry_url) = if args.repo_name.is_some() || args.registry_url.is_some() {
            (args.repo_name.as_deref(), args.registry_url.as_deref())
        } else {
            (deploy.repo_name.as_deref(), deploy.registry_url.as_deref())
        };

        let request = build_request(
            RequestSpec {
                chart: &unit.chart,
                layout: &unit.layout,
                repos: &unit.config.repos,
                registries: &unit.config.registries,
                repo_name,
                registry_url,
            },
            &credentials,
        )
        .map_err(repo_err)?;

        let publisher = Publisher::new(
            ChartRepoClient::new(deploy.timeout).map_err(repo_err)?,
            create_registry_client(
                deploy.registry_client,
                Arc::new(helm_for(unit)),
                unit.layout.helm_dir(),
                deploy.insecure_registry,
            ),
        );
        let coordinator = DeployCoordinator::new(Arc::new(publisher), Arc::clone(&barrier));
        let invocation = DeployInvocation {
            request,
            skip_snapshots: deploy.skip_snapshots && !args.include_snapshots,
            deploy_at_end: deploy.deploy_at_end || args.deploy_at_end,
        };
        invocations.push((coordinator, invocation));
    }

    let handles: Vec<_> = invocations
        .into_iter()
        .map(|(coordinator, invocation)| {
            tokio::spawn(async move { coordinator.deploy(invocation).await })
        })
        .collect();

    let mut first_error = None;
    for handle in handles {
        let result = handle
            .await
            .map_err(|e| CliError::Other {
                message: format!("{}: deploy task failed: {}", context::DEPLOY, e),
            })
            .and_then(|r| r.map_err(repo_err));

        match result {
            Ok(report) => {
                print_outcome(&report.chart.to_string(), &report.outcome);
                for (chart, outcome) in &report.flushed {
                    print_published(&chart.to_string(), outcome);
                }
            }
            Err(e) => {
                tracing::error!("{}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_outcome(chart: &str, outcome: &DeployOutcome) {
    match outcome {
        DeployOutcome::SnapshotSkipped => println!(
            "{} {} is a snapshot and 'skipSnapshots' is enabled. Not publishing.",
            style("Skipped").yellow(),
            chart
        ),
        DeployOutcome::Deferred => println!("{} {} until all modules are ready", style("Deferred").cyan(), chart),
        DeployOutcome::Published(outcome) => print_published(chart, outcome),
    }
}

fn print_published(chart: &str, outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Published { location } => {
            println!("{} {} to {}", style("Published").green().bold(), chart, location)
        }
        PublishOutcome::SkippedMissingArchive => {
            println!("{} {}: archive not found", style("Skipped").yellow(), chart)
        }
    }
}
