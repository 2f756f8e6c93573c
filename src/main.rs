// ABOUTME: Entry point for the bitswan-gitops CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use bitswan_gitops::config::{self, Config};
use bitswan_gitops::error::Result;
use bitswan_gitops::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = output_mode(&cli);
    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { gitops_dir, force } => {
            config::init_config(&cwd, gitops_dir.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            deployment_id,
            archive,
            port,
        } => {
            let config = Config::resolve(cli.config.as_deref(), &cwd)?;
            commands::deploy(&config, &deployment_id, &archive, port, output).await
        }
        Commands::Status => {
            let config = Config::resolve(cli.config.as_deref(), &cwd)?;
            commands::status(&config, output)
        }
        Commands::Route {
            deployment_id,
            port,
        } => {
            let config = Config::resolve(cli.config.as_deref(), &cwd)?;
            commands::route(&config, &deployment_id, port, output).await
        }
        Commands::Prune => {
            let config = Config::resolve(cli.config.as_deref(), &cwd)?;
            commands::prune(&config, output).await
        }
    }
}
