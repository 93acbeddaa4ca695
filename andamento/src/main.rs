mod commands;
mod config;
mod logging;
mod progress;

use clap::Parser;
use commands::{CliError, Command};
use config::{Config, ConfigError};
use logging::TelemetryError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "andamento", version, about = "Latest movement lookup for TJAM court processes")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(thiserror::Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Command(#[from] CliError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, StartupError> {
    let config = Config::load(cli.config.as_deref())?;
    let _telemetry = logging::init(&config.logging, config.metrics.as_ref())?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Reported while the Sentry client is still alive.
    let result = rt.block_on(commands::dispatch(cli.command, config));
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }

    Ok(result?)
}
