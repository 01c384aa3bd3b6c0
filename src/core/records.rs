//! Typed records parsed from the source tables.
//!
//! Every table starts with a header row. NAV and rate columns are located by header
//! name; the budget table keeps its amount in the second column.
use crate::core::config::TableNames;
use crate::core::error::TerError;
use crate::core::workbook::Workbook;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

pub const DATE_FORMAT: &str = "%d/%m/%Y";

const DATE_COLUMN: &str = "Date";
const NAV_COLUMN: &str = "Net Asset Value";
const EXPENSE_TYPE_COLUMN: &str = "Expense Type";
const RATE_COLUMN: &str = "Rate";
const BUDGET_LABEL_INDEX: usize = 0;
const BUDGET_AMOUNT_INDEX: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavRecord {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedExpenseLine {
    pub label: String,
    pub annual_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExpenseRate {
    pub expense_type: String,
    /// Decimal fraction rounded to 4 places
    pub rate: Decimal,
}

/// Frozen view of the source tables for a single run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub navs: Vec<NavRecord>,
    pub fixed_expenses: Vec<FixedExpenseLine>,
    pub variable_rates: Vec<VariableExpenseRate>,
}

impl Snapshot {
    /// Reads and parses the three source tables once.
    pub async fn load(workbook: &dyn Workbook, tables: &TableNames) -> Result<Self> {
        let nav_rows = workbook
            .read_rows(&tables.net_asset_values)
            .await
            .with_context(|| format!("Failed to read table '{}'", tables.net_asset_values))?;
        let budget_rows = workbook
            .read_rows(&tables.budget)
            .await
            .with_context(|| format!("Failed to read table '{}'", tables.budget))?;
        let rate_rows = workbook
            .read_rows(&tables.prospectus_rates)
            .await
            .with_context(|| format!("Failed to read table '{}'", tables.prospectus_rates))?;

        let snapshot = Snapshot {
            navs: parse_navs(&tables.net_asset_values, &nav_rows)?,
            fixed_expenses: parse_fixed_expenses(&tables.budget, &budget_rows)?,
            variable_rates: parse_variable_rates(&tables.prospectus_rates, &rate_rows)?,
        };
        debug!(
            navs = snapshot.navs.len(),
            fixed_expenses = snapshot.fixed_expenses.len(),
            variable_rates = snapshot.variable_rates.len(),
            "Loaded table snapshot"
        );
        Ok(snapshot)
    }

    /// Distinct dates with a recorded NAV.
    pub fn available_dates(&self) -> BTreeSet<NaiveDate> {
        self.navs.iter().map(|nav| nav.date).collect()
    }
}

/// Whether `text` is shaped exactly like `dd/mm/yyyy`.
fn has_date_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'/',
            _ => b.is_ascii_digit(),
        })
}

/// Parses a strict `dd/mm/yyyy` date; chrono alone would also take `1/1/24` or
/// a signed year.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if !has_date_shape(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

/// Parses an amount like `"1,234.56"`.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).ok()
}

/// Normalizes `"12.5%"` or `"0.125"` to a decimal fraction rounded to 4 places.
pub fn normalize_rate(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let rate = if text.contains('%') {
        let stripped: String = text.chars().filter(|c| *c != '%').collect();
        Decimal::from_str(stripped.trim()).ok()? / Decimal::ONE_HUNDRED
    } else {
        Decimal::from_str(text).ok()?
    };
    Some(rate.round_dp(4))
}

fn column_index(
    table: &str,
    header: Option<&Vec<String>>,
    column: &str,
) -> Result<usize, TerError> {
    header
        .and_then(|cells| cells.iter().position(|cell| cell.trim() == column))
        .ok_or_else(|| TerError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn cell<'a>(
    table: &str,
    row_index: usize,
    row: &'a [String],
    col: usize,
) -> Result<&'a str, TerError> {
    row.get(col)
        .map(String::as_str)
        .ok_or_else(|| TerError::MalformedRecord {
            table: table.to_string(),
            row: row_index,
            reason: format!("missing column {col}"),
        })
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Data rows after the header. Blank rows are rejected so that every data row is
/// counted.
fn data_rows<'a>(
    table: &'a str,
    rows: &'a [Vec<String>],
) -> impl Iterator<Item = Result<(usize, &'a [String]), TerError>> + 'a {
    rows.iter().enumerate().skip(1).map(move |(i, row)| {
        if is_blank(row) {
            Err(TerError::MalformedRecord {
                table: table.to_string(),
                row: i,
                reason: "blank row".to_string(),
            })
        } else {
            Ok((i, row.as_slice()))
        }
    })
}

pub fn parse_navs(table: &str, rows: &[Vec<String>]) -> Result<Vec<NavRecord>, TerError> {
    let date_col = column_index(table, rows.first(), DATE_COLUMN)?;
    let nav_col = column_index(table, rows.first(), NAV_COLUMN)?;

    data_rows(table, rows)
        .map(|entry| {
            let (i, row) = entry?;
            let date_text = cell(table, i, row, date_col)?;
            let date = parse_date(date_text).ok_or_else(|| TerError::MalformedRecord {
                table: table.to_string(),
                row: i,
                reason: format!("invalid date '{date_text}'"),
            })?;
            let value_text = cell(table, i, row, nav_col)?;
            let value = parse_amount(value_text).ok_or_else(|| TerError::MalformedRecord {
                table: table.to_string(),
                row: i,
                reason: format!("invalid net asset value '{value_text}'"),
            })?;
            Ok(NavRecord { date, value })
        })
        .collect()
}

pub fn parse_fixed_expenses(
    table: &str,
    rows: &[Vec<String>],
) -> Result<Vec<FixedExpenseLine>, TerError> {
    data_rows(table, rows)
        .map(|entry| {
            let (i, row) = entry?;
            let label = row
                .get(BUDGET_LABEL_INDEX)
                .map(|l| l.trim().to_string())
                .unwrap_or_default();
            let amount_text = cell(table, i, row, BUDGET_AMOUNT_INDEX)?;
            let cleaned: String = amount_text.trim().chars().filter(|c| *c != ',').collect();
            let annual_amount = cleaned.parse::<i64>().map_err(|_| TerError::MalformedRecord {
                table: table.to_string(),
                row: i,
                reason: format!("invalid annual amount '{amount_text}'"),
            })?;
            Ok(FixedExpenseLine {
                label,
                annual_amount,
            })
        })
        .collect()
}

pub fn parse_variable_rates(
    table: &str,
    rows: &[Vec<String>],
) -> Result<Vec<VariableExpenseRate>, TerError> {
    let type_col = column_index(table, rows.first(), EXPENSE_TYPE_COLUMN)?;
    let rate_col = column_index(table, rows.first(), RATE_COLUMN)?;

    data_rows(table, rows)
        .map(|entry| {
            let (i, row) = entry?;
            let expense_type = cell(table, i, row, type_col)?.trim().to_string();
            let rate_text = cell(table, i, row, rate_col)?;
            let rate = normalize_rate(rate_text).ok_or_else(|| TerError::MalformedRecord {
                table: table.to_string(),
                row: i,
                reason: format!("invalid rate '{rate_text}'"),
            })?;
            Ok(VariableExpenseRate { expense_type, rate })
        })
        .collect()
}
