//! Multi-profile runs over a credentials file
mod report;
mod runner;
mod selection;

pub use report::{ProfileReport, ProfileSummary, RunReport};
pub use runner::Orchestrator;
pub use selection::ProfileSelection;
