//! Data Cleaner Module
//! Strips display formatting from numeric-as-text columns and casts them to f64.

use super::model::{
    INSTALLS, NUMERIC_STRIP_CHARS, PRICE, RATING, SENTIMENT_POLARITY, SENTIMENT_SUBJECTIVITY,
    SIZE,
};
use log::{debug, warn};
use polars::prelude::*;
use thiserror::Error;

/// A cleaned string that is not a finite numeric literal.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("'{text}' is not a valid number")]
pub struct ParseError {
    pub text: String,
}

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Column '{column}', row {row}: {source}")]
    Parse {
        column: String,
        row: usize,
        source: ParseError,
    },
    #[error("Column '{column}', row {row}: missing value")]
    Missing { column: String, row: usize },
    #[error("Column '{column}', row {row}: negative value {value}")]
    Negative {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Remove every occurrence of each character in `strip_chars` from `value`.
pub fn clean_numeric_string(value: &str, strip_chars: &[char]) -> String {
    value.chars().filter(|c| !strip_chars.contains(c)).collect()
}

/// Parse a cleaned string as a finite f64.
pub fn cast_to_float(value: &str) -> Result<f64, ParseError> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError {
            text: value.to_string(),
        }),
    }
}

/// Clean the apps table.
///
/// `Installs` and `Price` are stripped of `+`, `,` and `$` and cast strictly: a
/// missing, malformed or negative value fails the whole table. `Rating` and
/// `Size` become nullable floats; values that do not parse are nulled.
pub fn clean_apps(df: &DataFrame) -> Result<DataFrame, CleanError> {
    let mut cleaned = df.clone();

    for name in [INSTALLS, PRICE] {
        let values = strict_numeric_column(df, name)?;
        cleaned.with_column(Column::new(name.into(), values))?;
    }

    for name in [RATING, SIZE] {
        let values = nullable_numeric_column(df, name)?;
        cleaned.with_column(Column::new(name.into(), values))?;
    }

    debug!("Cleaned {} app rows", cleaned.height());
    Ok(cleaned)
}

/// Cast the sentiment score columns of the reviews table to nullable floats.
/// Absent score columns are left absent.
pub fn clean_reviews(df: &DataFrame) -> Result<DataFrame, CleanError> {
    let mut cleaned = df.clone();

    for name in [SENTIMENT_POLARITY, SENTIMENT_SUBJECTIVITY] {
        if df.column(name).is_err() {
            debug!("Reviews table has no '{}' column", name);
            continue;
        }
        let values = nullable_numeric_column(df, name)?;
        cleaned.with_column(Column::new(name.into(), values))?;
    }

    Ok(cleaned)
}

fn strict_numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, CleanError> {
    let text = df.column(name)?.cast(&DataType::String)?;

    text.str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.ok_or_else(|| CleanError::Missing {
                column: name.to_string(),
                row,
            })?;
            let number = cast_to_float(&clean_numeric_string(raw, &NUMERIC_STRIP_CHARS))
                .map_err(|source| CleanError::Parse {
                    column: name.to_string(),
                    row,
                    source,
                })?;
            if number < 0.0 {
                return Err(CleanError::Negative {
                    column: name.to_string(),
                    row,
                    value: number,
                });
            }
            Ok(number)
        })
        .collect()
}

fn nullable_numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, CleanError> {
    let text = df.column(name)?.cast(&DataType::String)?;
    let mut rejected = 0usize;

    let values: Vec<Option<f64>> = text
        .str()?
        .into_iter()
        .map(|value| {
            let value = value?;
            match cast_to_float(value) {
                Ok(v) => Some(v),
                Err(_) => {
                    rejected += 1;
                    None
                }
            }
        })
        .collect();

    if rejected > 0 {
        warn!(
            "{} non-numeric value(s) in '{}' treated as missing",
            rejected, name
        );
    }

    Ok(values)
}
