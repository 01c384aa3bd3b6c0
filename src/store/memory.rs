use crate::core::workbook::{RowWrite, Workbook};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct MemoryTables {
    tables: HashMap<String, Vec<Vec<String>>>,
    read_only: HashSet<String>,
}

/// In-memory workbook, mainly used as a test double.
#[derive(Clone, Default)]
pub struct MemoryWorkbook {
    inner: Arc<Mutex<MemoryTables>>,
}

impl MemoryWorkbook {
    /// Creates a new MemoryWorkbook instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workbook pre-populated with the given tables.
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Vec<String>>)>,
        S: Into<String>,
    {
        let inner = MemoryTables {
            tables: tables.into_iter().map(|(n, r)| (n.into(), r)).collect(),
            read_only: HashSet::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Makes every later write touching `table` fail.
    pub async fn deny_writes(&self, table: &str) {
        let mut inner = self.inner.lock().await;
        inner.read_only.insert(table.to_string());
    }
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    async fn has_table(&self, table: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.contains_key(table))
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| anyhow!("Table not found: {table}"))
    }

    async fn apply(&self, writes: &[RowWrite]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(write) = writes.iter().find(|w| inner.read_only.contains(w.table())) {
            bail!("Table is read-only: {}", write.table());
        }

        // Stage on a copy so that nothing changes unless every write applies.
        let mut staged = inner.tables.clone();
        for write in writes {
            let rows = staged.entry(write.table().to_string()).or_default();
            write.apply_to(rows);
            debug!(table = write.table(), "Staged write");
        }
        inner.tables = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_and_apply() {
        let workbook = MemoryWorkbook::with_tables([("budget", vec![row(&["Item", "Amount"])])]);

        assert_eq!(workbook.read_rows("budget").await.unwrap().len(), 1);
        assert!(workbook.read_rows("missing").await.is_err());

        workbook
            .apply(&[RowWrite::Append {
                table: "budget".to_string(),
                values: row(&["Audit", "100"]),
            }])
            .await
            .unwrap();
        let rows = workbook.read_rows("budget").await.unwrap();
        assert_eq!(rows[1], row(&["Audit", "100"]));
    }

    #[tokio::test]
    async fn test_denied_write_is_all_or_nothing() {
        let workbook = MemoryWorkbook::new();
        workbook.deny_writes("run history").await;

        let result = workbook
            .apply(&[
                RowWrite::Overwrite {
                    table: "TER".to_string(),
                    row: 1,
                    values: row(&["x"]),
                },
                RowWrite::Append {
                    table: "run history".to_string(),
                    values: row(&["x"]),
                },
            ])
            .await;

        assert!(result.is_err());
        assert!(workbook.read_rows("TER").await.is_err());
    }
}
