//! Core business logic abstractions

pub mod analytics;
pub mod config;
pub mod error;
pub mod log;
pub mod range;
pub mod records;
pub mod ter;
pub mod workbook;

// Re-export main types for cleaner imports
pub use error::TerError;
pub use range::{DateRange, validate_range};
pub use records::Snapshot;
pub use ter::{ReportRow, RunOutcome};
pub use workbook::{RowWrite, Workbook};
