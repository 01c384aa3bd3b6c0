//! Date range validation against the dates present in the NAV table.
use crate::core::error::TerError;
use crate::core::records::parse_date;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A validated, inclusive date range together with the text it was entered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub from_text: String,
    pub to_text: String,
}

impl DateRange {
    /// Inclusive number of calendar days in the range.
    pub fn day_count(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Validates a `dd/mm/yyyy` date pair.
///
/// Both dates must parse, `from` must be strictly before `to`, and both must have a
/// recorded NAV.
pub fn validate_range(
    from_text: &str,
    to_text: &str,
    available: &BTreeSet<NaiveDate>,
) -> Result<DateRange, TerError> {
    let from_text = from_text.trim();
    let to_text = to_text.trim();
    let from = parse_date(from_text).ok_or_else(|| TerError::Format(from_text.to_string()))?;
    let to = parse_date(to_text).ok_or_else(|| TerError::Format(to_text.to_string()))?;

    if from >= to {
        return Err(TerError::RangeOrder {
            from: from_text.to_string(),
            to: to_text.to_string(),
        });
    }
    for (date, text) in [(from, from_text), (to, to_text)] {
        if !available.contains(&date) {
            return Err(TerError::UnavailableDate(text.to_string()));
        }
    }

    Ok(DateRange {
        from,
        to,
        from_text: from_text.to_string(),
        to_text: to_text.to_string(),
    })
}
