use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use weather_ops::{error_chain, PipelineConfig, Task, WeatherOps};

/// Weather batch ETL: ingest, transform and load into BigQuery.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML file overriding the default paths and warehouse identifiers.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect the historical CSV and a live API batch into the raw zone.
    Fetch,
    /// Rebuild the curated Parquet artifact from the raw zone.
    Transform,
    /// Replace the warehouse table with the curated artifact.
    Load,
    /// Run fetch, transform and load in order, retrying failed tasks.
    Run,
}

impl Commands {
    fn task(&self) -> Option<Task> {
        match self {
            Commands::Fetch => Some(Task::FetchWeatherData),
            Commands::Transform => Some(Task::TransformWeatherData),
            Commands::Load => Some(Task::LoadToBigQuery),
            Commands::Run => None,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    Ok(match path {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(cli.config.as_ref())?;
    let ops = WeatherOps::new(config);

    let succeeded = match cli.command.task() {
        Some(task) => match ops.run_task(task).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Task {} failed: {}", task, error_chain(&e));
                false
            }
        },
        None => ops.run_all().await.succeeded(),
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
