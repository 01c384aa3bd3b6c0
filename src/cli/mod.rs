pub mod compute;
pub mod history;
pub mod import;
pub mod prompt;
pub mod setup;
pub mod ui;
