//! helmdeploy CLI - package Helm charts and publish them to chart repositories

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod exit_codes;
mod telemetry;

use commands::GoalContext;
use commands::deploy::DeployArgs;
use config::{CONFIG_FILE, ProjectConfig, parse_overrides};
use error::Result;

#[derive(Parser)]
#[command(name = "helmdeploy")]
#[command(author = "helmdeploy Contributors")]
#[command(version)]
#[command(about = "Package Helm charts and publish them to ChartMuseum, Artifactory or OCI registries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project configuration file
    #[arg(short, long, global = true, env = "HELMDEPLOY_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Settings store holding server credentials
    #[arg(long, global = true, env = "HELMDEPLOY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Override a substitution property (key=value)
    #[arg(short = 'p', long = "property", global = true)]
    properties: Vec<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Substitute placeholders and package the chart
    Package,

    /// Run `helm lint` on the packaged chart sources
    Lint {
        /// Treat lint warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Render the chart into a YAML file
    Template {
        /// Output file (default: <outputDir>/test-classes/helm.yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Publish the packaged chart
    Deploy {
        /// Repository to publish to
        #[arg(long, conflicts_with = "registry_url")]
        repo_name: Option<String>,

        /// OCI registry to push to
        #[arg(long)]
        registry_url: Option<String>,

        /// Defer publication until every module reached deploy
        #[arg(long)]
        deploy_at_end: bool,

        /// Publish snapshot versions even when skipSnapshots is set
        #[arg(long)]
        include_snapshots: bool,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    telemetry::init_tracing(cli.debug, cli.log_json);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let ctx = GoalContext {
        overrides: parse_overrides(&cli.properties)?,
        settings: cli.settings,
    };
    let units = ProjectConfig::load_units(&cli.config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Package => commands::package::run(&units, &ctx).await,
            Commands::Lint { strict } => commands::lint::run(&units, strict).await,
            Commands::Template { output } => {
                commands::template::run(&units, output.as_deref()).await
            }
            Commands::Deploy {
                repo_name,
                registry_url,
                deploy_at_end,
                include_snapshots,
            } => {
                let args = DeployArgs {
                    repo_name,
                    registry_url,
                    deploy_at_end,
                    include_snapshots,
                };
                commands::deploy::run(units, &ctx, &args).await
            }
        }
    })
}
