//! Interactive date range entry.
use super::ui;
use crate::core::range::{DateRange, validate_range};
use crate::core::records::DATE_FORMAT;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use tracing::debug;

fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed before a valid date range was entered");
    }
    Ok(line.trim().to_string())
}

/// Asks for a from/to date pair until a valid range is entered.
///
/// Every validation failure is reported and the question repeated. Only the end of
/// input stops the loop.
pub fn prompt_for_range<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    available: &BTreeSet<NaiveDate>,
) -> Result<DateRange> {
    writeln!(output, "Select date range for your TER:")?;
    if let (Some(first), Some(last)) = (available.first(), available.last()) {
        writeln!(
            output,
            "{}",
            ui::style_text(
                &format!(
                    "Net asset values are available from {} to {}",
                    first.format(DATE_FORMAT),
                    last.format(DATE_FORMAT)
                ),
                ui::StyleType::Subtle
            )
        )?;
    }

    loop {
        let from = read_answer(input, output, "From Date (dd/mm/yyyy): ")?;
        let to = read_answer(input, output, "To Date (dd/mm/yyyy): ")?;

        match validate_range(&from, &to, available) {
            Ok(range) => {
                debug!(from = %range.from, to = %range.to, "Accepted date range");
                return Ok(range);
            }
            Err(e) => {
                debug!(error = %e, "Rejected date range");
                writeln!(
                    output,
                    "{}",
                    ui::style_text(&format!("{e}. Please try again."), ui::StyleType::Error)
                )?;
            }
        }
    }
}
