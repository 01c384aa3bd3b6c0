use super::{prompt, ui};
use crate::core::config::AppConfig;
use crate::core::records::Snapshot;
use crate::core::ter::{self, ReportRow, RunOutcome, TerBreakdown};
use crate::core::workbook::Workbook;
use anyhow::{Result, bail};
use comfy_table::Cell;
use std::io::{BufRead, Write};
use tracing::info;

/// Loads the tables, asks for a date range, then computes and saves the TER.
pub async fn run<R: BufRead, W: Write>(
    config: &AppConfig,
    workbook: &dyn Workbook,
    input: &mut R,
    output: &mut W,
) -> Result<RunOutcome> {
    info!(fund = %config.fund.number, "Computing total expense ratio");

    let spinner = ui::new_spinner("Loading tables...");
    let snapshot = Snapshot::load(workbook, &config.tables).await;
    spinner.finish_and_clear();
    let snapshot = snapshot?;

    if snapshot.navs.is_empty() {
        bail!(
            "Table '{}' has no net asset values",
            config.tables.net_asset_values
        );
    }

    let range = prompt::prompt_for_range(input, output, &snapshot.available_dates())?;
    let outcome = ter::run_pipeline(workbook, config, &snapshot, &range).await?;

    match &outcome {
        RunOutcome::NoData { from, to } => {
            writeln!(
                output,
                "{}",
                ui::style_text(
                    &format!(
                        "No net asset values recorded between {from} and {to}. Nothing was saved."
                    ),
                    ui::StyleType::Error
                )
            )?;
        }
        RunOutcome::Persisted { row, breakdown } => {
            writeln!(output, "\n{}", display_report(row, breakdown))?;
        }
    }
    Ok(outcome)
}

fn display_report(row: &ReportRow, breakdown: &TerBreakdown) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Measure"), ui::header_cell("Value")]);

    let rates = breakdown
        .variable_rates
        .iter()
        .map(|rate| format!("{rate:.4}"))
        .collect::<Vec<_>>()
        .join(", ");

    let period = format!("{} - {}", row.from_date, row.to_date);
    let day_count = row.day_count.to_string();
    for (label, value) in [
        ("Period", period.as_str()),
        ("Days", day_count.as_str()),
        ("Average NAV", row.average_nav.as_str()),
        ("Fixed Expenses", row.fixed_expenses.as_str()),
        ("Variable Rates", rates.as_str()),
        ("Variable Expenses", row.variable_expenses.as_str()),
    ] {
        table.add_row(vec![Cell::new(label), ui::amount_cell(value)]);
    }
    table.add_row(vec![Cell::new("TER"), ui::ratio_cell(&row.ter)]);

    format!(
        "Fund: {}\n\n{table}",
        ui::style_text(
            &format!("{} {}", row.fund_number, row.fund_name),
            ui::StyleType::Title
        )
    )
}
