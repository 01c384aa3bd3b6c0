//! Domain errors raised while validating input and computing a TER.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerError {
    #[error("'{0}' is not a valid date, expected dd/mm/yyyy")]
    Format(String),

    #[error("From date {from} must be before To date {to}")]
    RangeOrder { from: String, to: String },

    #[error("No net asset value is recorded for {0}")]
    UnavailableDate(String),

    #[error("No net asset values fall between {from} and {to}")]
    EmptyAggregation { from: String, to: String },

    #[error("Malformed record in '{table}' at row {row}: {reason}")]
    MalformedRecord {
        table: String,
        row: usize,
        reason: String,
    },

    #[error("Table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("Annual day-count base must be greater than zero")]
    InvalidDayBase,

    #[error("Average net asset value is zero, cannot compute a ratio")]
    ZeroAverageNav,

    #[error("Amounts are too large to compute the {0}")]
    AmountOverflow(String),
}

impl TerError {
    /// Whether the error comes from user input and can be fixed by asking again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TerError::Format(_) | TerError::RangeOrder { .. } | TerError::UnavailableDate(_)
        )
    }
}
