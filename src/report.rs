//! Runs the whole pipeline and collects every analysis into one report.
//!
//! The report holds plain data (counts, points, summaries) so any chart
//! renderer can consume it; nothing here draws.

use crate::config::{AnalysisConfig, ConfigError};
use crate::data::cleaner::{clean_apps, clean_reviews, CleanError};
use crate::data::loader::{deduplicate, load_apps, load_reviews, LoaderError};
use crate::data::model::{
    AppType, Sentiment, APP, CATEGORY, INSTALLS, PRICE, RATING, SENTIMENT_POLARITY, SIZE, TYPE,
};
use crate::data::processor::{Aggregator, HistogramBin, ProcessorError};
use crate::stats::{GroupComparison, GroupStats, StatsCalculator};
use log::{info, warn};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Clean(#[from] CleanError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// An app listed by name with its category and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedApp {
    pub category: String,
    pub app: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub total_apps: usize,
    pub duplicates_removed: usize,
    pub num_categories: usize,
    /// Largest category first.
    pub category_counts: Vec<(String, usize)>,
    pub average_rating: Option<f64>,
    pub rating_histogram: Vec<HistogramBin>,
    /// `(size, rating)` of apps in categories meeting the minimum size.
    pub size_vs_rating: Vec<(f64, f64)>,
    /// `(price, rating)` of paid apps with both rating and size present.
    pub paid_price_vs_rating: Vec<(f64, f64)>,
    pub price_by_popular_category: BTreeMap<String, GroupStats>,
    pub apps_above_threshold: Vec<PricedApp>,
    pub price_by_category_under_threshold: BTreeMap<String, GroupStats>,
    pub installs_by_type: GroupComparison,
    pub polarity_by_type: GroupComparison,
    pub joined_reviews: usize,
    pub sentiment_counts: BTreeMap<Sentiment, usize>,
}

/// Load both files named in `config` and analyse them.
pub fn build_report(config: &AnalysisConfig) -> Result<AnalysisReport, ReportError> {
    config.validate()?;
    let raw_apps = load_apps(&config.apps_path)?;
    let raw_reviews = load_reviews(&config.reviews_path)?;
    analyze(&raw_apps, &raw_reviews, config)
}

/// Analyse already loaded, still uncleaned tables.
pub fn analyze(
    raw_apps: &DataFrame,
    raw_reviews: &DataFrame,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, ReportError> {
    let unique = deduplicate(raw_apps)?;
    let duplicates_removed = raw_apps.height() - unique.height();
    let apps = clean_apps(&unique)?;
    let reviews = clean_reviews(raw_reviews)?;
    info!(
        "{} unique apps ({} duplicates removed)",
        apps.height(),
        duplicates_removed
    );

    let category_counts = Aggregator::sorted_category_counts(&apps)?;

    let large_categories =
        Aggregator::filter_min_group_size(&apps, CATEGORY, config.min_category_size)?;
    let complete = Aggregator::with_rating_and_size(&apps)?;
    let paid = Aggregator::apps_of_type(&complete, AppType::Paid)?;

    let popular = Aggregator::in_categories(&apps, &config.popular_categories)?;
    let affordable = Aggregator::priced_below(&popular, config.affordable_price)?;
    let expensive = Aggregator::apps_priced_above(&popular, config.expensive_price)?;

    let joined = Aggregator::join_and_filter(&apps, &reviews)?;
    info!("{} reviews joined to apps", joined.height());

    Ok(AnalysisReport {
        total_apps: apps.height(),
        duplicates_removed,
        num_categories: category_counts.len(),
        category_counts,
        average_rating: Aggregator::average_rating(&apps)?,
        rating_histogram: Aggregator::rating_histogram(&apps, config.histogram_bins)?,
        size_vs_rating: Aggregator::points(&large_categories, SIZE, RATING)?,
        paid_price_vs_rating: Aggregator::points(&paid, PRICE, RATING)?,
        price_by_popular_category: price_by_category(&popular, &config.popular_categories)?,
        apps_above_threshold: priced_apps(&expensive)?,
        price_by_category_under_threshold: price_by_category(
            &affordable,
            &config.popular_categories,
        )?,
        installs_by_type: compare_by_type(&apps, INSTALLS)?,
        polarity_by_type: compare_by_type(&joined, SENTIMENT_POLARITY)?,
        joined_reviews: joined.height(),
        sentiment_counts: Aggregator::sentiment_counts(&joined)?,
    })
}

/// Price statistics for each listed category that has at least one app.
fn price_by_category(
    apps: &DataFrame,
    categories: &[String],
) -> Result<BTreeMap<String, GroupStats>, ReportError> {
    let mut stats = BTreeMap::new();
    for category in categories {
        let prices = StatsCalculator::get_values_for_group(apps, CATEGORY, PRICE, category)?;
        if prices.is_empty() {
            continue;
        }
        let mut gs = StatsCalculator::compute_descriptive_stats(&prices);
        gs.group_name = category.clone();
        stats.insert(category.clone(), gs);
    }
    Ok(stats)
}

/// Rows missing a category, name or price are skipped.
fn priced_apps(projection: &DataFrame) -> Result<Vec<PricedApp>, ReportError> {
    let categories = projection.column(CATEGORY)?.str()?;
    let apps = projection.column(APP)?.str()?;
    let prices = projection.column(PRICE)?.f64()?;

    let priced: Vec<PricedApp> = categories
        .into_iter()
        .zip(apps.into_iter())
        .zip(prices.into_iter())
        .filter_map(|((category, app), price)| {
            Some(PricedApp {
                category: category?.to_string(),
                app: app?.to_string(),
                price: price?,
            })
        })
        .collect();

    let skipped = projection.height() - priced.len();
    if skipped > 0 {
        warn!("Skipped {} priced apps with a missing category, name or price", skipped);
    }
    Ok(priced)
}

/// Paid vs. Free comparison of `value_col`; Free is the control group.
/// A missing column yields a comparison with no groups.
fn compare_by_type(df: &DataFrame, value_col: &str) -> Result<GroupComparison, ReportError> {
    if df.column(value_col).is_err() {
        warn!("No '{}' column; skipping the comparison by type", value_col);
        return Ok(GroupComparison {
            value_column: value_col.to_string(),
            control_group: AppType::Free.to_string(),
            group_stats: BTreeMap::new(),
        });
    }

    Ok(StatsCalculator::compare_groups(
        df,
        TYPE,
        value_col,
        AppType::Free.as_str(),
    )?)
}

fn fmt_value(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn write_comparison(f: &mut fmt::Formatter<'_>, comparison: &GroupComparison) -> fmt::Result {
    for group in comparison.get_ordered_groups() {
        let gs = &comparison.group_stats[&group];
        write!(
            f,
            "   {:<6} n={:<6} mean={:<12} median={:<12} q1={:<10} q3={}",
            group,
            gs.count,
            fmt_value(gs.mean),
            fmt_value(gs.median),
            fmt_value(gs.p25),
            fmt_value(gs.p75)
        )?;
        if let Some(p) = gs.p_value {
            write!(f, "  p={}", fmt_value(p))?;
            if gs.is_significant {
                write!(f, " *")?;
            }
        }
        writeln!(f)?;
    }
    Ok(())
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Apps: {} ({} duplicates removed)",
            self.total_apps, self.duplicates_removed
        )?;
        writeln!(f)?;

        writeln!(f, "Categories: {}", self.num_categories)?;
        for (category, count) in &self.category_counts {
            writeln!(f, "   {:<24} {}", category, count)?;
        }
        writeln!(f)?;

        match self.average_rating {
            Some(avg) => writeln!(f, "Average rating: {:.2}", avg)?,
            None => writeln!(f, "Average rating: n/a")?,
        }
        let last = self.rating_histogram.len().saturating_sub(1);
        for (i, bin) in self.rating_histogram.iter().enumerate() {
            let close = if i == last { ']' } else { ')' };
            writeln!(
                f,
                "   [{:.2}, {:.2}{}  {}",
                bin.lower, bin.upper, close, bin.count
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "Size vs. rating points (large categories): {}",
            self.size_vs_rating.len()
        )?;
        writeln!(
            f,
            "Price vs. rating points (paid apps): {}",
            self.paid_price_vs_rating.len()
        )?;
        writeln!(f)?;

        writeln!(f, "Price by popular category:")?;
        for (category, gs) in &self.price_by_popular_category {
            writeln!(
                f,
                "   {:<12} n={:<5} mean={:<8} p95={}",
                category,
                gs.count,
                fmt_value(gs.mean),
                fmt_value(gs.p95)
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Apps above the price threshold: {}", self.apps_above_threshold.len())?;
        for app in &self.apps_above_threshold {
            writeln!(f, "   {:<12} {:<40} ${:.2}", app.category, app.app, app.price)?;
        }
        writeln!(f)?;

        writeln!(f, "Price by category after removing junk apps:")?;
        for (category, gs) in &self.price_by_category_under_threshold {
            writeln!(
                f,
                "   {:<12} n={:<5} mean={}",
                category,
                gs.count,
                fmt_value(gs.mean)
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Installs by type:")?;
        write_comparison(f, &self.installs_by_type)?;
        writeln!(f)?;

        writeln!(f, "Reviews joined: {}", self.joined_reviews)?;
        for (sentiment, count) in &self.sentiment_counts {
            writeln!(f, "   {:<10} {}", sentiment.as_str(), count)?;
        }
        writeln!(f, "Sentiment polarity by type:")?;
        write_comparison(f, &self.polarity_by_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_apps() -> DataFrame {
        df!(
            "App" => ["Chess", "Chess", "Sudoku", "Gold Game", "Pill Timer", "Scanner"],
            "Category" => ["GAME", "GAME", "GAME", "GAME", "MEDICAL", "COMMUNICATION"],
            "Rating" => [Some("4.5"), Some("4.5"), Some("4.0"), Some("3.0"), None, Some("4.8")],
            "Size" => [Some("19.0"), Some("19.0"), Some("3.1"), Some("8.0"), Some("1.0"), None],
            "Installs" => ["10,000+", "10,000+", "500+", "10+", "1,000+", "100,000+"],
            "Type" => ["Free", "Free", "Paid", "Paid", "Paid", "Free"],
            "Price" => ["0", "0", "$1.99", "$299.99", "$9.99", "0"]
        )
        .unwrap()
    }

    fn raw_reviews() -> DataFrame {
        df!(
            "App" => ["Chess", "Chess", "Sudoku", "Sudoku"],
            "Review" => [Some("Love it"), Some("Too slow"), Some("Nice"), None],
            "Sentiment" => [Some("Positive"), Some("Negative"), Some("Positive"), Some("Neutral")],
            "Sentiment_Polarity" => [Some("0.8"), Some("-0.3"), Some("0.5"), None],
            "Sentiment_Subjectivity" => [Some("0.6"), Some("0.4"), Some("0.9"), None]
        )
        .unwrap()
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            min_category_size: 2,
            histogram_bins: 3,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn reports_every_analysis() {
        let report = analyze(&raw_apps(), &raw_reviews(), &small_config()).unwrap();

        assert_eq!(report.total_apps, 5);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.num_categories, 3);
        assert_eq!(report.category_counts[0], ("GAME".to_string(), 3));

        // Three complete GAME apps; COMMUNICATION has no size and MEDICAL no rating.
        assert_eq!(report.size_vs_rating.len(), 3);
        assert_eq!(report.paid_price_vs_rating, vec![(1.99, 4.0), (299.99, 3.0)]);

        assert_eq!(
            report.apps_above_threshold,
            vec![PricedApp {
                category: "GAME".to_string(),
                app: "Gold Game".to_string(),
                price: 299.99,
            }]
        );
        assert!(report.price_by_popular_category.contains_key("MEDICAL"));
        assert!(!report.price_by_popular_category.contains_key("COMMUNICATION"));
        assert_eq!(report.price_by_category_under_threshold["GAME"].count, 2);

        assert_eq!(report.joined_reviews, 3);
        assert_eq!(report.sentiment_counts[&Sentiment::Positive], 2);
        assert_eq!(report.polarity_by_type.group_stats["Free"].count, 2);
        assert_eq!(report.polarity_by_type.group_stats["Paid"].count, 1);

        let installs = &report.installs_by_type.group_stats;
        assert_eq!(installs["Free"].count, 2);
        assert_eq!(installs["Paid"].count, 3);
    }

    #[test]
    fn missing_polarity_skips_the_comparison() {
        let reviews = df!(
            "App" => ["Chess"],
            "Review" => ["Love it"],
            "Sentiment" => ["Positive"]
        )
        .unwrap();

        let report = analyze(&raw_apps(), &reviews, &small_config()).unwrap();
        assert_eq!(report.joined_reviews, 1);
        assert!(report.polarity_by_type.group_stats.is_empty());
    }

    #[test]
    fn malformed_installs_abort_the_report() {
        let apps = df!(
            "App" => ["Chess"],
            "Category" => ["GAME"],
            "Rating" => ["4.5"],
            "Size" => ["19.0"],
            "Installs" => ["Free"],
            "Type" => ["Free"],
            "Price" => ["0"]
        )
        .unwrap();

        let result = analyze(&apps, &raw_reviews(), &small_config());
        assert!(matches!(result, Err(ReportError::Clean(CleanError::Parse { .. }))));
    }

    #[test]
    fn priced_apps_skip_incomplete_rows() {
        let projection = df!(
            "Category" => [Some("GAME"), None, Some("FAMILY"), Some("MEDICAL")],
            "App" => [Some("Gold Game"), Some("Orphan"), None, Some("Pill Timer")],
            "Price" => [Some(299.99), Some(250.0), Some(399.99), None]
        )
        .unwrap();

        assert_eq!(
            priced_apps(&projection).unwrap(),
            vec![PricedApp {
                category: "GAME".to_string(),
                app: "Gold Game".to_string(),
                price: 299.99,
            }]
        );
    }

    #[test]
    fn last_histogram_bin_is_printed_closed() {
        let report = analyze(&raw_apps(), &raw_reviews(), &small_config()).unwrap();
        let text = report.to_string();

        // Ratings span 3.0 to 4.8 over three bins.
        assert!(text.contains("[3.00, 3.60)  1"));
        assert!(text.contains("[4.20, 4.80]  2"));
        assert!(!text.contains("4.80)"));
    }

    #[test]
    fn text_summary_mentions_each_section() {
        let report = analyze(&raw_apps(), &raw_reviews(), &small_config()).unwrap();
        let text = report.to_string();

        assert!(text.contains("Apps: 5 (1 duplicates removed)"));
        assert!(text.contains("Gold Game"));
        assert!(text.contains("Installs by type:"));
        assert!(text.contains("Sentiment polarity by type:"));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = analyze(&raw_apps(), &raw_reviews(), &small_config()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["total_apps"], 5);
        assert_eq!(json["category_counts"][0][0], "GAME");
        assert_eq!(json["sentiment_counts"]["Positive"], 2);
    }
}
