//! Analysis settings. Defaults reproduce the original Google Play study.

use crate::data::model::POPULAR_CATEGORIES;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Histogram bin count must be at least 1")]
    NoBins,
    #[error("Price threshold '{name}' must be a non-negative number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub apps_path: PathBuf,
    pub reviews_path: PathBuf,
    /// Categories with fewer complete (rated and sized) apps are left out of the
    /// size vs. rating analysis.
    pub min_category_size: usize,
    /// Apps above this price are listed individually.
    pub expensive_price: f64,
    /// Upper bound used to drop junk-priced apps from the per-category pricing.
    pub affordable_price: f64,
    pub popular_categories: Vec<String>,
    pub histogram_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            apps_path: PathBuf::from("apps.csv"),
            reviews_path: PathBuf::from("user_reviews.csv"),
            min_category_size: 250,
            expensive_price: 200.0,
            affordable_price: 100.0,
            popular_categories: POPULAR_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            histogram_bins: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.histogram_bins == 0 {
            return Err(ConfigError::NoBins);
        }
        for (name, value) in [
            ("expensive_price", self.expensive_price),
            ("affordable_price", self.affordable_price),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}
