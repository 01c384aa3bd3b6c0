//! Workbook stored as a directory of CSV files, one per table.
use crate::core::workbook::{RowWrite, Workbook};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create directory: {}", root.display()))?;
        Ok(Self { root })
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        check_table_name(table)?;
        Ok(self.root.join(format!("{table}.csv")))
    }

    fn staging_path(&self, table: &str) -> Result<PathBuf> {
        check_table_name(table)?;
        Ok(self.root.join(format!(".{table}.csv.tmp")))
    }
}

/// Table names become file names inside the workbook directory; names that could
/// resolve elsewhere or clash with staging files are refused.
fn check_table_name(table: &str) -> Result<()> {
    if table.trim().is_empty()
        || table.starts_with('.')
        || table.contains(['/', '\\', '\0'])
    {
        bail!("Invalid table name: '{table}'");
    }
    Ok(())
}

pub fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn write_csv_rows(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        if row.is_empty() {
            writer.write_record([""])?;
        } else {
            writer.write_record(row)?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl Workbook for CsvWorkbook {
    async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.table_path(table)?.exists())
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let path = self.table_path(table)?;
        debug!("Reading table '{}' from {}", table, path.display());
        read_csv_rows(&path).with_context(|| format!("Failed to read table '{table}'"))
    }

    async fn apply(&self, writes: &[RowWrite]) -> Result<()> {
        let mut staged: BTreeMap<&str, Vec<Vec<String>>> = BTreeMap::new();
        for write in writes {
            let table = write.table();
            if !staged.contains_key(table) {
                let path = self.table_path(table)?;
                let rows = if path.exists() {
                    read_csv_rows(&path)?
                } else {
                    Vec::new()
                };
                staged.insert(table, rows);
            }
            if let Some(rows) = staged.get_mut(table) {
                write.apply_to(rows);
            }
        }

        // Stage every table before replacing any of them.
        let mut written = Vec::new();
        for (table, rows) in &staged {
            let staging = self.staging_path(table)?;
            if let Err(e) = write_csv_rows(&staging, rows) {
                for path in written.iter().chain(std::iter::once(&staging)) {
                    let _ = fs::remove_file(path);
                }
                return Err(e);
            }
            written.push(staging);
        }

        for (table, staging) in staged.keys().zip(written) {
            let path = self.table_path(table)?;
            if let Err(e) = fs::rename(&staging, &path) {
                warn!("Table '{}' could not be replaced after earlier tables were", table);
                return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
            }
            debug!("Wrote table '{}' to {}", table, path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reads_quoted_thousands() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join("net asset values.csv"),
            "Date,Net Asset Value\n01/01/2024,\"1,000.50\"\n",
        )?;
        let workbook = CsvWorkbook::new(dir.path())?;

        let rows = workbook.read_rows("net asset values").await?;
        assert_eq!(rows, vec![row(&["Date", "Net Asset Value"]), row(&["01/01/2024", "1,000.50"])]);
        assert!(workbook.read_rows("budget").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_creates_and_appends() -> Result<()> {
        let dir = TempDir::new()?;
        let workbook = CsvWorkbook::new(dir.path())?;

        workbook
            .apply(&[
                RowWrite::Overwrite {
                    table: "TER".to_string(),
                    row: 2,
                    values: row(&["F001", "1,234.00"]),
                },
                RowWrite::Append {
                    table: "run history".to_string(),
                    values: row(&["F001", "1,234.00"]),
                },
            ])
            .await?;
        workbook
            .apply(&[RowWrite::Append {
                table: "run history".to_string(),
                values: row(&["F002", "5.00"]),
            }])
            .await?;

        let result = workbook.read_rows("TER").await?;
        assert_eq!(result.len(), 3);
        assert_eq!(result[2], row(&["F001", "1,234.00"]));

        let history = workbook.read_rows("run history").await?;
        assert_eq!(history, vec![row(&["F001", "1,234.00"]), row(&["F002", "5.00"])]);
        assert!(!dir.path().join(".run history.csv.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_table_names_outside_root() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path().join("workbook");
        let workbook = CsvWorkbook::new(&root)?;

        for table in ["../x", "a/b", "..", ".hidden", ""] {
            let result = workbook
                .apply(&[RowWrite::Replace {
                    table: table.to_string(),
                    rows: vec![row(&["Item", "Amount"])],
                }])
                .await;
            assert!(result.is_err(), "{table} should be refused");
            assert!(workbook.read_rows(table).await.is_err());
            assert!(workbook.has_table(table).await.is_err());
        }
        assert!(!dir.path().join("x.csv").exists());
        assert_eq!(fs::read_dir(&root)?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_table() -> Result<()> {
        let dir = TempDir::new()?;
        let workbook = CsvWorkbook::new(dir.path())?;
        fs::write(dir.path().join("budget.csv"), "Item,Amount\nOld,1\n")?;

        workbook
            .apply(&[RowWrite::Replace {
                table: "budget".to_string(),
                rows: vec![row(&["Item", "Amount"]), row(&["Audit", "3650"])],
            }])
            .await?;

        let rows = workbook.read_rows("budget").await?;
        assert_eq!(rows[1], row(&["Audit", "3650"]));
        Ok(())
    }
}
