//! Taskweave CLI - plan, validate and dry-run task graphs.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use taskweave_execution::{ExecutionEngine, Planner};
use taskweave_tools::EchoCapability;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{load_tasks, Config};

#[derive(Parser)]
#[command(name = "taskweave")]
#[command(about = "Plan and run dependent task graphs", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print the execution plan
    Plan(Inputs),
    /// Validate the task list; exits non-zero when invalid
    Validate(Inputs),
    /// Dry run: every tool echoes its inputs
    Run(Inputs),
    /// List known tools
    Catalog {
        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Inputs {
    /// Task list (JSON array)
    #[arg(long)]
    tasks: PathBuf,

    /// Config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Inputs {
    fn planner(&self) -> Result<Planner> {
        let config = Config::load_or_default(self.config.as_deref())?;
        Ok(Planner::new(Arc::new(config.registry())).with_limits(config.limits))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Plan(inputs) => {
            let planner = inputs.planner()?;
            let plan = planner.plan(load_tasks(&inputs.tasks)?);
            print_json(&plan)?;
        }
        Commands::Validate(inputs) => {
            let planner = inputs.planner()?;
            let plan = planner.plan(load_tasks(&inputs.tasks)?);
            print_json(&plan.validation)?;
            if !plan.validation.valid {
                bail!("{} issue(s) found", plan.validation.total_issues());
            }
        }
        Commands::Run(inputs) => {
            let config = Config::load_or_default(inputs.config.as_deref())?;
            let mut registry = config.registry();
            registry.bind_all(Arc::new(EchoCapability));
            let registry = Arc::new(registry);

            let planner = Planner::new(registry.clone()).with_limits(config.limits);
            let plan = planner.plan_or_fallback(load_tasks(&inputs.tasks)?);
            if plan.fallback {
                info!("Running degraded plan ({} tasks)", plan.sequence.len());
            }

            let result = ExecutionEngine::new(registry)
                .with_config(config.engine())
                .execute(&plan)
                .await?;
            print_json(&result)?;
        }
        Commands::Catalog { config } => {
            let config = Config::load_or_default(config.as_deref())?;
            let registry = config.registry();
            print_json(&registry.list())?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!("Logging initialized with level: {}", level);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
