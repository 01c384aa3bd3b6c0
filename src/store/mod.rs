pub mod csv_dir;
pub mod disk;
pub mod memory;

use crate::core::config::WorkbookConfig;
use crate::core::workbook::Workbook;
use anyhow::Result;
use csv_dir::CsvWorkbook;
use disk::FjallWorkbook;
use std::sync::Arc;
use tracing::debug;

/// Opens the workbook backend described by the configuration.
pub fn open_workbook(config: &WorkbookConfig) -> Result<Arc<dyn Workbook>> {
    debug!("Opening workbook: {config:?}");
    let workbook: Arc<dyn Workbook> = match config {
        WorkbookConfig::Csv { path } => Arc::new(CsvWorkbook::new(path)?),
        WorkbookConfig::Fjall { path } => Arc::new(FjallWorkbook::new(path)?),
    };
    Ok(workbook)
}
