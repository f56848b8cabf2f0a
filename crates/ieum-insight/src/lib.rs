//! Ieum Insight crate - wellbeing report analysis.
//!
//! Sends a report window's conversation log to the analysis assistant,
//! parses its semi-structured answer into indicator results and a
//! qualitative summary, and completes the report.

pub mod analysis;
pub mod error;
pub mod parser;

pub use analysis::{apply_analysis, ReportAnalysisConfig, ReportAnalysisCoordinator};
pub use error::InsightError;
pub use parser::{ReportAnalysisParser, SUMMARY_KEY};
