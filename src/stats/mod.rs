//! Stats module - Descriptive statistics and group comparisons

mod calculator;

pub use calculator::{GroupComparison, GroupStats, StatsCalculator, SIGNIFICANCE_THRESHOLD};
