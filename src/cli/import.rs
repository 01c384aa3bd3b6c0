use crate::core::config::AppConfig;
use crate::core::records;
use crate::core::workbook::{RowWrite, Workbook};
use crate::store::csv_dir::read_csv_rows;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

/// Replaces a table with the rows of a CSV file.
///
/// Source tables are parsed first so that malformed data never reaches the workbook.
pub async fn run(
    config: &AppConfig,
    workbook: &dyn Workbook,
    table: &str,
    csv_path: &Path,
) -> Result<usize> {
    let rows = read_csv_rows(csv_path)?;
    if rows.is_empty() {
        bail!("{} has no rows", csv_path.display());
    }

    let tables = &config.tables;
    if table == tables.net_asset_values {
        records::parse_navs(table, &rows)?;
    } else if table == tables.budget {
        records::parse_fixed_expenses(table, &rows)?;
    } else if table == tables.prospectus_rates {
        records::parse_variable_rates(table, &rows)?;
    }

    let count = rows.len() - 1;
    workbook
        .apply(&[RowWrite::Replace {
            table: table.to_string(),
            rows,
        }])
        .await
        .with_context(|| format!("Failed to import into table '{table}'"))?;

    info!("Imported {} rows into '{}'", count, table);
    println!("Imported {count} rows into '{table}'.");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{FundConfig, TableNames};
    use crate::store::memory::MemoryWorkbook;
    use tempfile::TempDir;

    fn config() -> AppConfig {
        AppConfig {
            fund: FundConfig {
                number: "F001".to_string(),
                name: "Growth Fund".to_string(),
            },
            workbook: None,
            tables: TableNames::default(),
            day_base: None,
            result_row: 1,
        }
    }

    #[tokio::test]
    async fn test_import_source_table() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("navs.csv");
        std::fs::write(&path, "Date,Net Asset Value\n01/01/2024,\"1,000\"\n02/01/2024,990\n")?;
        let workbook = MemoryWorkbook::new();

        let count = run(&config(), &workbook, "net asset values", &path).await?;
        assert_eq!(count, 2);
        assert_eq!(workbook.read_rows("net asset values").await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_rates() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("rates.csv");
        std::fs::write(&path, "Expense Type,Rate\nManagement fee,high\n")?;
        let workbook = MemoryWorkbook::new();

        let result = run(&config(), &workbook, "prospectus rates", &path).await;
        assert!(result.is_err());
        assert!(workbook.read_rows("prospectus rates").await.is_err());
        Ok(())
    }
}
