//! Tabular storage abstractions

use anyhow::Result;
use async_trait::async_trait;

/// A single mutation of a named table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowWrite {
    /// Replace the row at `row` (0 is the header), padding the table with empty rows if
    /// it is shorter.
    Overwrite {
        table: String,
        row: usize,
        values: Vec<String>,
    },
    /// Add a row after the last one.
    Append { table: String, values: Vec<String> },
    /// Replace the whole table, header included.
    Replace {
        table: String,
        rows: Vec<Vec<String>>,
    },
}

impl RowWrite {
    pub fn table(&self) -> &str {
        match self {
            RowWrite::Overwrite { table, .. }
            | RowWrite::Append { table, .. }
            | RowWrite::Replace { table, .. } => table,
        }
    }

    /// Applies the write to an in-memory copy of a table.
    pub fn apply_to(&self, rows: &mut Vec<Vec<String>>) {
        match self {
            RowWrite::Overwrite { row, values, .. } => {
                if rows.len() <= *row {
                    rows.resize(*row + 1, Vec::new());
                }
                rows[*row] = values.clone();
            }
            RowWrite::Append { values, .. } => rows.push(values.clone()),
            RowWrite::Replace { rows: new_rows, .. } => *rows = new_rows.clone(),
        }
    }
}

/// A collection of worksheets holding rows of text cells.
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Whether the table exists at all.
    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Reads every row of a table, header included.
    async fn read_rows(&self, table: &str) -> Result<Vec<Vec<String>>>;

    /// Applies all writes as one unit: either every write lands or none does.
    async fn apply(&self, writes: &[RowWrite]) -> Result<()>;
}
