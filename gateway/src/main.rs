mod app;
mod config;
mod logging;
mod metrics;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "gateway", about = "Biodiversity catalog and federated search gateway")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the gateway
    Serve {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Load and validate a config file without starting anything
    CheckConfig {
        #[arg(long, short)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Serve { config } => serve(&config),
        CliCommand::CheckConfig { config } => check_config(&config),
    }
}

fn serve(path: &Path) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let _logging = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(metrics_config) = &config.metrics {
        if let Err(e) = metrics::init(metrics_config) {
            tracing::error!(error = %e, "Failed to initialize metrics");
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        listener = %config.listener.address(),
        admin_listener = %config.admin_listener.address(),
        "Starting gateway"
    );

    match runtime.block_on(app::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

fn check_config(path: &Path) -> ExitCode {
    match Config::from_file(path) {
        Ok(config) => {
            println!("{}: ok", path.display());
            println!("  listener:       {}", config.listener.address());
            println!("  admin listener: {}", config.admin_listener.address());
            println!(
                "  participants:   {}",
                config
                    .federation
                    .participants
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!(
                "  catalog:        {}",
                if config.catalog.is_some() { "enabled" } else { "disabled" }
            );
            println!(
                "  metrics:        {}",
                if config.metrics.is_some() { "statsd" } else { "disabled" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}
