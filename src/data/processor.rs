//! Data Processor Module
//! Grouping, filtering and joining over the cleaned tables.
//!
//! Every operation takes its input by reference and returns a new table.

use super::model::{
    AppType, Sentiment, APP, CATEGORY, PRICE, RATING, REVIEW, SENTIMENT, SIZE, TYPE,
};
use log::{debug, warn};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Histogram requires at least one bin")]
    NoBins,
}

/// One bar of a histogram. `upper` is exclusive except for the last bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Aggregations consumed by the reporting layer.
pub struct Aggregator;

impl Aggregator {
    /// Count rows per distinct value of `key`. Null keys are not counted.
    pub fn group_counts(df: &DataFrame, key: &str) -> Result<HashMap<String, usize>, ProcessorError> {
        let keys = df.column(key)?.cast(&DataType::String)?;
        let mut counts: HashMap<String, usize> = HashMap::new();

        for value in keys.str()?.into_iter().flatten() {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }

        Ok(counts)
    }

    /// Number of apps per category.
    pub fn category_counts(apps: &DataFrame) -> Result<HashMap<String, usize>, ProcessorError> {
        Self::group_counts(apps, CATEGORY)
    }

    /// Category counts, largest first; ties ordered by name.
    pub fn sorted_category_counts(apps: &DataFrame) -> Result<Vec<(String, usize)>, ProcessorError> {
        let mut counts: Vec<(String, usize)> = Self::category_counts(apps)?.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    /// Keep rows that have both `Rating` and `Size`, then drop every row whose
    /// `key` group has fewer than `min_count` of those rows.
    pub fn filter_min_group_size(
        apps: &DataFrame,
        key: &str,
        min_count: usize,
    ) -> Result<DataFrame, ProcessorError> {
        let present = Self::with_rating_and_size(apps)?;
        let counts = Self::group_counts(&present, key)?;

        let keys = present.column(key)?.cast(&DataType::String)?;
        let keep: Vec<bool> = keys
            .str()?
            .into_iter()
            .map(|value| {
                value
                    .and_then(|k| counts.get(k))
                    .is_some_and(|&n| n >= min_count)
            })
            .collect();

        let large = present.filter(&BooleanChunked::from_slice("large".into(), &keep))?;
        debug!(
            "{} of {} rows belong to '{}' groups with at least {} members",
            large.height(),
            present.height(),
            key,
            min_count
        );
        Ok(large)
    }

    /// Rows where neither `Rating` nor `Size` is null.
    pub fn with_rating_and_size(apps: &DataFrame) -> Result<DataFrame, ProcessorError> {
        Self::filter_by_predicate(
            apps,
            col(RATING).is_not_null().and(col(SIZE).is_not_null()),
        )
    }

    /// Generic row filter.
    pub fn filter_by_predicate(df: &DataFrame, predicate: Expr) -> Result<DataFrame, ProcessorError> {
        let filtered = df.clone().lazy().filter(predicate).collect()?;
        Ok(filtered)
    }

    pub fn apps_of_type(apps: &DataFrame, app_type: AppType) -> Result<DataFrame, ProcessorError> {
        Self::filter_by_predicate(apps, col(TYPE).eq(lit(app_type.as_str())))
    }

    /// Rows whose category is one of `categories`.
    pub fn in_categories(apps: &DataFrame, categories: &[String]) -> Result<DataFrame, ProcessorError> {
        let predicate = categories
            .iter()
            .map(|category| col(CATEGORY).eq(lit(category.as_str())))
            .reduce(|acc, expr| acc.or(expr));

        match predicate {
            Some(predicate) => Self::filter_by_predicate(apps, predicate),
            None => Ok(apps.clear()),
        }
    }

    pub fn priced_above(apps: &DataFrame, threshold: f64) -> Result<DataFrame, ProcessorError> {
        Self::filter_by_predicate(apps, col(PRICE).gt(lit(threshold)))
    }

    pub fn priced_below(apps: &DataFrame, threshold: f64) -> Result<DataFrame, ProcessorError> {
        Self::filter_by_predicate(apps, col(PRICE).lt(lit(threshold)))
    }

    /// `Category`, `App` and `Price` of the apps priced above `threshold`.
    pub fn apps_priced_above(apps: &DataFrame, threshold: f64) -> Result<DataFrame, ProcessorError> {
        let expensive = Self::priced_above(apps, threshold)?;
        Ok(expensive.select([CATEGORY, APP, PRICE])?)
    }

    /// Inner join of apps to reviews on `App`, dropping rows with no sentiment
    /// or no review text. A reviews table without those columns yields no rows.
    pub fn join_and_filter(apps: &DataFrame, reviews: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut reviews = reviews.clone();
        for name in [SENTIMENT, REVIEW] {
            if reviews.column(name).is_err() {
                warn!("Reviews have no '{}' column; no review will be joined", name);
                let height = reviews.height();
                reviews.with_column(Column::full_null(name.into(), height, &DataType::String))?;
            }
        }

        let joined = apps
            .clone()
            .lazy()
            .inner_join(reviews.lazy(), col(APP), col(APP))
            .filter(
                col(SENTIMENT)
                    .is_not_null()
                    .and(col(REVIEW).is_not_null())
                    .and(col(SENTIMENT).neq(lit("")))
                    .and(col(REVIEW).neq(lit(""))),
            )
            .collect()?;

        debug!("Joined {} app reviews", joined.height());
        Ok(joined)
    }

    /// Joined reviews per sentiment label. Unrecognised labels are skipped.
    pub fn sentiment_counts(joined: &DataFrame) -> Result<BTreeMap<Sentiment, usize>, ProcessorError> {
        let mut counts = BTreeMap::new();
        for (label, n) in Self::group_counts(joined, SENTIMENT)? {
            match label.parse::<Sentiment>() {
                Ok(sentiment) => *counts.entry(sentiment).or_insert(0) += n,
                Err(e) => debug!("Skipping {} review(s): {}", n, e),
            }
        }
        Ok(counts)
    }

    /// Non-null, non-NaN values of a numeric column.
    pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, ProcessorError> {
        let values = df.column(name)?.cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// `(x, y)` pairs for the rows where both columns are present.
    pub fn points(df: &DataFrame, x: &str, y: &str) -> Result<Vec<(f64, f64)>, ProcessorError> {
        let xs = df.column(x)?.cast(&DataType::Float64)?;
        let ys = df.column(y)?.cast(&DataType::Float64)?;

        Ok(xs
            .f64()?
            .into_iter()
            .zip(ys.f64()?.into_iter())
            .filter_map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => Some((x, y)),
                _ => None,
            })
            .collect())
    }

    /// Mean of the non-null ratings, or `None` when no app is rated.
    pub fn average_rating(apps: &DataFrame) -> Result<Option<f64>, ProcessorError> {
        let ratings = Self::column_values(apps, RATING)?;
        if ratings.is_empty() {
            return Ok(None);
        }
        Ok(Some(ratings.iter().sum::<f64>() / ratings.len() as f64))
    }

    /// Equal-width histogram of the non-null ratings over their observed range.
    pub fn rating_histogram(apps: &DataFrame, bins: usize) -> Result<Vec<HistogramBin>, ProcessorError> {
        if bins == 0 {
            return Err(ProcessorError::NoBins);
        }

        let ratings = Self::column_values(apps, RATING)?;
        if ratings.is_empty() {
            return Ok(Vec::new());
        }

        let min = ratings.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = if max > min {
            (max - min) / bins as f64
        } else {
            1.0
        };

        let mut counts = vec![0usize; bins];
        for rating in &ratings {
            let idx = (((rating - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect())
    }
}
