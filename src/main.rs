use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ter::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ter::AppCommand {
    fn from(cmd: Commands) -> ter::AppCommand {
        match cmd {
            Commands::Compute => ter::AppCommand::Compute,
            Commands::History => ter::AppCommand::History,
            Commands::Import { table, file } => ter::AppCommand::Import { table, path: file },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compute the TER for a date range (default)
    Compute,
    /// Display previous TER runs
    History,
    /// Replace a table with the rows of a CSV file
    Import {
        /// Name of the table to replace
        table: String,
        /// CSV file whose first row is the header
        file: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ter::cli::setup::setup(),
        Some(cmd) => ter::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => ter::run_command(ter::AppCommand::Compute, cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
