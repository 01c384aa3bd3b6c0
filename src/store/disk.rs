//! Workbook stored in a fjall keyspace.
//!
//! Each table is a partition keyed by big-endian row index, with rows stored as JSON
//! arrays of cells.
use crate::core::workbook::{RowWrite, Workbook};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub struct FjallWorkbook {
    keyspace: Keyspace,
}

/// Maps a table name onto the characters fjall accepts for partitions.
///
/// ASCII alphanumerics are kept and every other byte becomes `_XX`, so distinct
/// table names never share a partition.
fn partition_name(table: &str) -> Result<String> {
    if table.is_empty() {
        bail!("Invalid table name: '{table}'");
    }
    let mut name = String::with_capacity(table.len());
    for byte in table.bytes() {
        if byte.is_ascii_alphanumeric() {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02X}"));
        }
    }
    if u8::try_from(name.len()).is_err() {
        bail!("Table name is too long: '{table}'");
    }
    Ok(name)
}

fn row_key(index: u64) -> Vec<u8> {
    index.to_be_bytes().to_vec()
}

impl FjallWorkbook {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", path.display()))?;
        Ok(Self { keyspace })
    }

    fn partition(&self, table: &str) -> Result<PartitionHandle> {
        self.keyspace
            .open_partition(&partition_name(table)?, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open table '{table}'"))
    }

    fn read_partition(table: &str, partition: &PartitionHandle) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        for item in partition.iter() {
            let (_, value) = item?;
            let row: Vec<String> = serde_json::from_slice(&value)
                .with_context(|| format!("Corrupt row in table '{table}'"))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

#[async_trait]
impl Workbook for FjallWorkbook {
    async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.keyspace.partition_exists(&partition_name(table)?))
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>> {
        if !self.has_table(table).await? {
            bail!("Table not found: {table}");
        }
        let partition = self.partition(table)?;
        let rows = Self::read_partition(table, &partition)?;
        debug!("Read {} rows from table '{}'", rows.len(), table);
        Ok(rows)
    }

    async fn apply(&self, writes: &[RowWrite]) -> Result<()> {
        // Resolve the final contents of each touched table so that every key is
        // written at most once in the batch.
        let mut staged: HashMap<&str, (PartitionHandle, usize, Vec<Vec<String>>)> =
            HashMap::new();
        for write in writes {
            let table = write.table();
            if !staged.contains_key(table) {
                let partition = self.partition(table)?;
                let rows = Self::read_partition(table, &partition)?;
                staged.insert(table, (partition, rows.len(), rows));
            }
            if let Some((_, _, rows)) = staged.get_mut(table) {
                write.apply_to(rows);
            }
        }

        let mut batch = self.keyspace.batch();
        for (partition, previous_len, rows) in staged.values() {
            for (index, row) in rows.iter().enumerate() {
                batch.insert(partition, row_key(index as u64), serde_json::to_vec(row)?);
            }
            for index in rows.len()..*previous_len {
                batch.remove(partition, row_key(index as u64));
            }
        }

        batch.commit().context("Failed to commit workbook writes")?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist workbook")?;
        debug!("Committed {} writes", writes.len());
        Ok(())
    }
}
