//! # som-cli
//!
//! Command line interface of the model checker.
//!
//! `modelcheck check` runs a batch over IFC files and directories and
//! prints a summary; `modelcheck summary` reads a stored run back from the
//! issue database. Exit code 0 means every file was checked, 2 means some
//! files failed or the run was interrupted, 1 is an error that stopped the
//! batch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use som_pipeline::{BatchOrchestrator, ModelcheckConfig, load_run_summary};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "modelcheck")]
#[command(about = "Check IFC models against a classification schema")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check IFC files or directories of IFC files
    Check {
        /// Files or directories; directories are expanded one level deep
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Schema project file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Property set holding the identifier
        #[arg(long)]
        pset: Option<String>,

        /// Attribute holding the identifier
        #[arg(long)]
        attribute: Option<String>,

        /// Export the issues of the run (.json for JSON, otherwise CSV)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Show the stored results of a run
    Summary {
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags shared by both subcommands
#[derive(Args)]
struct Overrides {
    /// Project name
    #[arg(short, long)]
    project: Option<String>,

    /// Issue database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Run date (YYYY-MM-DD); defaults to today for `check` and to the
    /// latest run for `summary`
    #[arg(long)]
    run_date: Option<NaiveDate>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Load the config file if one was given and apply command line flags on top.
fn merge_config(
    config_path: Option<&PathBuf>,
    schema: Option<PathBuf>,
    overrides: &Overrides,
) -> anyhow::Result<ModelcheckConfig> {
    let mut config = match config_path {
        Some(path) => ModelcheckConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let Some(project) = overrides.project.clone() else {
                bail!("--project is required without --config");
            };
            ModelcheckConfig::new(project, schema.clone().unwrap_or_default())
        }
    };

    if let Some(schema) = schema {
        config.schema = schema;
    }
    if let Some(project) = &overrides.project {
        config.project.clone_from(project);
    }
    if let Some(database) = &overrides.database {
        config.database = Some(database.clone());
    }
    if let Some(run_date) = overrides.run_date {
        config.run_date = Some(run_date);
    }
    Ok(config)
}

async fn check(
    mut config: ModelcheckConfig,
    paths: &[PathBuf],
    pset: Option<String>,
    attribute: Option<String>,
    export: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    if config.schema.as_os_str().is_empty() {
        bail!("--schema is required without --config");
    }
    if let Some(pset) = pset {
        config.identification.property_set = pset;
    }
    if let Some(attribute) = attribute {
        config.identification.attribute = attribute;
    }
    if export.is_some() {
        config.export = export;
    }

    let orchestrator = BatchOrchestrator::new(config);
    let cancel = orchestrator.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current file is rolled back");
            cancel.cancel();
        }
    });

    let summary = orchestrator.run(paths).await?;
    print!("{summary}");
    Ok(if summary.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

async fn summary(config: &ModelcheckConfig) -> anyhow::Result<ExitCode> {
    let database = config.database_path();
    info!("Reading {}", database.display());
    match load_run_summary(&database, &config.project, config.run_date).await? {
        Some(summary) => print!("{summary}"),
        None => println!("No runs recorded for project {}", config.project),
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            paths,
            overrides,
            schema,
            pset,
            attribute,
            export,
        } => {
            let config = merge_config(cli.config.as_ref(), schema, &overrides)?;
            check(config, &paths, pset, attribute, export).await
        }
        Commands::Summary { overrides } => {
            let config = merge_config(cli.config.as_ref(), None, &overrides)?;
            summary(&config).await
        }
    }
}
