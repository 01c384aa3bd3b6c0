pub mod cli;
pub mod core;
pub mod store;

use anyhow::Result;
use crate::core::config::AppConfig;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Compute,
    History,
    Import { table: String, path: PathBuf },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("TER calculator starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let workbook = store::open_workbook(&config.workbook_config()?)?;

    match command {
        AppCommand::Compute => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            cli::compute::run(&config, workbook.as_ref(), &mut input, &mut output).await?;
            Ok(())
        }
        AppCommand::History => cli::history::run(&config, workbook.as_ref()).await,
        AppCommand::Import { table, path } => {
            cli::import::run(&config, workbook.as_ref(), &table, &path).await?;
            Ok(())
        }
    }
}
