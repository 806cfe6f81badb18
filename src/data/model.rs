//! Column names and typed values shared by the loader, cleaner and aggregator.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const APP: &str = "App";
pub const CATEGORY: &str = "Category";
pub const RATING: &str = "Rating";
pub const SIZE: &str = "Size";
pub const INSTALLS: &str = "Installs";
pub const TYPE: &str = "Type";
pub const PRICE: &str = "Price";

pub const REVIEW: &str = "Review";
pub const SENTIMENT: &str = "Sentiment";
pub const SENTIMENT_POLARITY: &str = "Sentiment_Polarity";
pub const SENTIMENT_SUBJECTIVITY: &str = "Sentiment_Subjectivity";

/// Columns every apps file must carry.
pub const REQUIRED_APP_COLUMNS: [&str; 7] = [APP, CATEGORY, RATING, SIZE, INSTALLS, TYPE, PRICE];

/// Columns every reviews file must carry. The rest are optional.
pub const REQUIRED_REVIEW_COLUMNS: [&str; 1] = [APP];

/// Characters stripped from `Installs` and `Price` before casting.
pub const NUMERIC_STRIP_CHARS: [char; 3] = ['+', ',', '$'];

/// Text values read as null, matching what pandas treats as missing.
pub const NULL_MARKERS: [&str; 7] = ["nan", "NaN", "NA", "N/A", "null", "NULL", "None"];

/// Categories examined in the price-by-category analysis.
pub const POPULAR_CATEGORIES: [&str; 8] = [
    "GAME",
    "FAMILY",
    "PHOTOGRAPHY",
    "MEDICAL",
    "TOOLS",
    "FINANCE",
    "LIFESTYLE",
    "BUSINESS",
];

/// Pricing model of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AppType {
    Free,
    Paid,
}

impl AppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppType::Free => "Free",
            AppType::Paid => "Paid",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" => Ok(AppType::Free),
            "Paid" => Ok(AppType::Paid),
            other => Err(format!("unknown app type '{}'", other)),
        }
    }
}

/// Review sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positive" => Ok(Sentiment::Positive),
            "Negative" => Ok(Sentiment::Negative),
            "Neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment '{}'", other)),
        }
    }
}
