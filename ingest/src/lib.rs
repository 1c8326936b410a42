//! Getting records into memory: where they live and how to read them.

pub mod config;
pub mod loader;

pub use config::PulseConfig;
pub use loader::{load_or_empty, load_records, LoadMode, LoadReport, LoadStats, RecordIssue};
