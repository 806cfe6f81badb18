//! Playstore Insights - Google Play apps & reviews analysis
//!
//! Loads the apps and user reviews CSV files, cleans the formatted numeric
//! columns and computes the grouped views behind the market study charts.

pub mod config;
pub mod data;
pub mod report;
pub mod stats;

pub use config::AnalysisConfig;
pub use report::{analyze, build_report, AnalysisReport, ReportError};
