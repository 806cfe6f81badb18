//! Playstore Insights - Google Play apps & reviews analysis
//!
//! Command line entry point: runs the cleaning and aggregation pipeline and
//! prints the report as text or JSON.

use anyhow::{Context, Result};
use clap::Parser;
use playstore_insights::{build_report, AnalysisConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "playstore-insights")]
#[command(about = "Clean and summarise the Google Play apps and user reviews datasets", long_about = None)]
struct Cli {
    /// Apps metadata CSV
    #[arg(long, default_value = "apps.csv")]
    apps: PathBuf,

    /// User reviews CSV
    #[arg(long, default_value = "user_reviews.csv")]
    reviews: PathBuf,

    /// Minimum apps per category for the size vs. rating analysis
    #[arg(long, default_value_t = 250)]
    min_category_size: usize,

    /// Number of rating histogram bins
    #[arg(long, default_value_t = 10)]
    bins: usize,

    /// Apps priced above this are listed individually
    #[arg(long, default_value_t = 200.0)]
    expensive_price: f64,

    /// Apps priced at or above this are left out of the per-category pricing
    #[arg(long, default_value_t = 100.0)]
    affordable_price: f64,

    /// Comma-separated category allow-list for the pricing analysis
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            apps_path: self.apps,
            reviews_path: self.reviews,
            min_category_size: self.min_category_size,
            expensive_price: self.expensive_price,
            affordable_price: self.affordable_price,
            popular_categories: self.categories.unwrap_or(defaults.popular_categories),
            histogram_bins: self.bins,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let json = cli.json;
    let config = cli.into_config();

    let report = build_report(&config).with_context(|| {
        format!(
            "analysing {} and {}",
            config.apps_path.display(),
            config.reviews_path.display()
        )
    })?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialising report")?
        );
    } else {
        print!("{}", report);
    }

    Ok(())
}
