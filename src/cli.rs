// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bitswan-gitops")]
#[command(about = "Content-addressed artifact deployments tracked in a git ledger")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discover gitops.yml, then the environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a gitops.yml template to the current directory
    Init {
        /// Directory holding the ledger and artifacts
        #[arg(long)]
        gitops_dir: Option<String>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy a ZIP archive to a deployment slot
    Deploy {
        /// Deployment slot id
        deployment_id: String,

        /// Path to the ZIP archive
        archive: PathBuf,

        /// Port the slot listens on, for the proxy route
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show deployment slots recorded in the ledger
    Status,

    /// Register the proxy route for a deployment slot
    Route {
        /// Deployment slot id
        deployment_id: String,

        /// Port the slot listens on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Delete artifacts no slot references
    Prune,
}
