//! Composes the TER report for a range and persists it.
use crate::core::analytics;
use crate::core::config::{AppConfig, FundConfig};
use crate::core::error::TerError;
use crate::core::range::DateRange;
use crate::core::records::Snapshot;
use crate::core::workbook::{RowWrite, Workbook};
use anyhow::{Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

pub const REPORT_HEADER: [&str; 9] = [
    "Fund Number",
    "Fund Name",
    "From Date",
    "To Date",
    "Days",
    "Average NAV",
    "Fixed Expenses",
    "Variable Expenses",
    "TER",
];

/// Unformatted figures behind a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerBreakdown {
    pub day_count: i64,
    pub average_nav: Decimal,
    pub fixed_total: Decimal,
    pub variable_rates: Vec<Decimal>,
    pub variable_total: Decimal,
    pub ratio: Decimal,
}

/// The persisted output of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub fund_number: String,
    pub fund_name: String,
    pub from_date: String,
    pub to_date: String,
    pub day_count: i64,
    pub average_nav: String,
    pub fixed_expenses: String,
    pub variable_expenses: String,
    pub ter: String,
}

impl ReportRow {
    pub fn new(fund: &FundConfig, range: &DateRange, breakdown: &TerBreakdown) -> Self {
        ReportRow {
            fund_number: fund.number.clone(),
            fund_name: fund.name.clone(),
            from_date: range.from_text.clone(),
            to_date: range.to_text.clone(),
            day_count: breakdown.day_count,
            average_nav: format_amount(breakdown.average_nav),
            fixed_expenses: format_amount(breakdown.fixed_total),
            variable_expenses: format_amount(breakdown.variable_total),
            ter: format_ratio(breakdown.ratio),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.fund_number.clone(),
            self.fund_name.clone(),
            self.from_date.clone(),
            self.to_date.clone(),
            self.day_count.to_string(),
            self.average_nav.clone(),
            self.fixed_expenses.clone(),
            self.variable_expenses.clone(),
            self.ter.clone(),
        ]
    }
}

/// Formats a currency amount as `1,234.56`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Formats a ratio already expressed in percent as `0.1234%`.
pub fn format_ratio(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.4}%")
}

/// Runs the aggregation and composition steps for a validated range.
pub fn compute_breakdown(
    snapshot: &Snapshot,
    range: &DateRange,
    configured_day_base: Option<u32>,
) -> Result<TerBreakdown, TerError> {
    let day_base = analytics::day_base(configured_day_base, snapshot.navs.len())?;
    let day_count = range.day_count();
    let average_nav = analytics::average_nav(&snapshot.navs, range)?;
    let fixed_total =
        analytics::prorate_fixed_expenses(&snapshot.fixed_expenses, day_base, day_count)?;
    let variable =
        analytics::variable_expenses(&snapshot.variable_rates, average_nav, day_base, day_count)?;
    let ratio = analytics::expense_ratio(fixed_total, variable.total, average_nav)?;

    debug!(
        %day_base,
        day_count,
        %average_nav,
        %fixed_total,
        variable_total = %variable.total,
        %ratio,
        "Computed expense ratio"
    );
    Ok(TerBreakdown {
        day_count,
        average_nav,
        fixed_total,
        variable_rates: variable.rates,
        variable_total: variable.total,
        ratio,
    })
}

/// Writes that record a report: the current-result row and a history entry.
///
/// The result table's header is rewritten every time; the history header is only
/// added to an empty history.
pub fn report_writes(config: &AppConfig, row: &ReportRow, history_is_empty: bool) -> Vec<RowWrite> {
    let header: Vec<String> = REPORT_HEADER.iter().map(|h| h.to_string()).collect();
    let cells = row.to_cells();
    let mut writes = vec![
        RowWrite::Overwrite {
            table: config.tables.result.clone(),
            row: 0,
            values: header.clone(),
        },
        RowWrite::Overwrite {
            table: config.tables.result.clone(),
            row: config.result_row,
            values: cells.clone(),
        },
    ];
    if history_is_empty {
        writes.push(RowWrite::Append {
            table: config.tables.history.clone(),
            values: header,
        });
    }
    writes.push(RowWrite::Append {
        table: config.tables.history.clone(),
        values: cells,
    });
    writes
}

pub async fn persist_report(
    workbook: &dyn Workbook,
    config: &AppConfig,
    row: &ReportRow,
) -> Result<()> {
    // A missing history table is created by the append.
    let history = &config.tables.history;
    let history_is_empty = if workbook.has_table(history).await? {
        workbook
            .read_rows(history)
            .await
            .with_context(|| format!("Failed to read table '{history}'"))?
            .is_empty()
    } else {
        true
    };

    workbook
        .apply(&report_writes(config, row, history_is_empty))
        .await
        .with_context(|| {
            format!(
                "Failed to save result to '{}' and '{}'",
                config.tables.result, config.tables.history
            )
        })?;
    info!(fund = %row.fund_number, ter = %row.ter, "Saved TER result");
    Ok(())
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No NAV falls within the range; nothing was written.
    NoData { from: String, to: String },
    Persisted {
        row: ReportRow,
        breakdown: TerBreakdown,
    },
}

/// Computes and persists the report for a validated range.
///
/// An empty aggregation ends the run without writing anything; every other failure
/// aborts it.
pub async fn run_pipeline(
    workbook: &dyn Workbook,
    config: &AppConfig,
    snapshot: &Snapshot,
    range: &DateRange,
) -> Result<RunOutcome> {
    let breakdown = match compute_breakdown(snapshot, range, config.day_base) {
        Ok(breakdown) => breakdown,
        Err(TerError::EmptyAggregation { from, to }) => {
            info!(%from, %to, "No net asset values in range");
            return Ok(RunOutcome::NoData { from, to });
        }
        Err(e) => return Err(e.into()),
    };

    let row = ReportRow::new(&config.fund, range, &breakdown);
    persist_report(workbook, config, &row).await?;
    Ok(RunOutcome::Persisted { row, breakdown })
}
