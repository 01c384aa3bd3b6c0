use super::ui;
use crate::core::config::AppConfig;
use crate::core::workbook::Workbook;
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

/// Prints every recorded run, oldest first.
pub async fn run(config: &AppConfig, workbook: &dyn Workbook) -> Result<()> {
    let table = &config.tables.history;
    let rows = if workbook.has_table(table).await? {
        workbook.read_rows(table).await?
    } else {
        debug!("Table '{}' does not exist yet", table);
        Vec::new()
    };

    match render_history(&rows) {
        Some(table) => println!("{table}"),
        None => println!("No runs recorded yet."),
    }
    Ok(())
}

/// Renders the history table; the first row is the header.
pub fn render_history(rows: &[Vec<String>]) -> Option<String> {
    let (header, entries) = rows.split_first()?;
    if entries.is_empty() {
        return None;
    }

    let mut table = ui::new_styled_table();
    table.set_header(header.iter().map(|h| ui::header_cell(h)).collect::<Vec<_>>());

    let last_column = header.len().saturating_sub(1);
    for entry in entries {
        table.add_row(
            entry
                .iter()
                .enumerate()
                .map(|(i, value)| match i {
                    0..=3 => Cell::new(value),
                    i if i == last_column => ui::ratio_cell(value),
                    _ => ui::amount_cell(value),
                })
                .collect::<Vec<_>>(),
        );
    }
    Some(table.to_string())
}
