//! Data module - CSV loading, cleaning and aggregation

pub mod cleaner;
pub mod loader;
pub mod model;
pub mod processor;

pub use cleaner::{
    cast_to_float, clean_apps, clean_numeric_string, clean_reviews, CleanError, ParseError,
};
pub use loader::{deduplicate, load_apps, load_reviews, LoaderError};
pub use model::{AppType, Sentiment};
pub use processor::{Aggregator, HistogramBin, ProcessorError};
