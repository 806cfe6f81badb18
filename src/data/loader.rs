//! CSV Data Loader Module
//! Reads the apps and reviews files with Polars and removes duplicate rows.

use super::model::{NULL_MARKERS, REQUIRED_APP_COLUMNS, REQUIRED_REVIEW_COLUMNS};
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("The {file} file has no '{column}' column")]
    MissingColumn { file: &'static str, column: String },
}

/// Load the apps file. Every column is read as text; cleaning happens later.
pub fn load_apps(path: &Path) -> Result<DataFrame, LoaderError> {
    let df = read_text_csv(path)?;
    require_columns(&df, "apps", &REQUIRED_APP_COLUMNS)?;
    info!("Loaded {} app rows from {}", df.height(), path.display());
    Ok(df)
}

/// Load the user reviews file. Only the join key is required.
pub fn load_reviews(path: &Path) -> Result<DataFrame, LoaderError> {
    let df = read_text_csv(path)?;
    require_columns(&df, "reviews", &REQUIRED_REVIEW_COLUMNS)?;
    info!("Loaded {} review rows from {}", df.height(), path.display());
    Ok(df)
}

/// Keep the first occurrence of every fully identical row, in source order.
/// Two nulls in the same column compare equal.
pub fn deduplicate(df: &DataFrame) -> PolarsResult<DataFrame> {
    let text_columns = df
        .get_columns()
        .iter()
        .map(|column| column.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    let text = text_columns
        .iter()
        .map(|column| column.str())
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = (0..df.height())
        .map(|row| seen.insert(text.iter().map(|ca| ca.get(row)).collect()))
        .collect();

    let unique = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
    debug!(
        "Removed {} duplicate rows of {}",
        df.height() - unique.height(),
        df.height()
    );
    Ok(unique)
}

fn read_text_csv(path: &Path) -> Result<DataFrame, LoaderError> {
    // Surface a missing or unreadable file as an IO error rather than a parse error.
    let io_error = |source: io::Error| LoaderError::Io {
        path: path.display().to_string(),
        source,
    };
    let metadata = fs::metadata(path).map_err(io_error)?;
    if !metadata.is_file() {
        return Err(io_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    File::open(path).map_err(io_error)?;

    let null_values = NULL_MARKERS.iter().map(|marker| (*marker).into()).collect();

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_null_values(Some(NullValues::AllColumns(null_values)))
        .finish()?
        .collect()?;

    Ok(df)
}

fn require_columns(
    df: &DataFrame,
    file: &'static str,
    required: &[&str],
) -> Result<(), LoaderError> {
    for name in required {
        if df.column(name).is_err() {
            return Err(LoaderError::MissingColumn {
                file,
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{}", contents).unwrap();
        tmp
    }

    fn apps_with_duplicates() -> DataFrame {
        df!(
            "App" => ["Chess", "Metronome", "Chess", "Chess", "Metronome"],
            "Category" => ["GAME", "TOOLS", "GAME", "GAME", "TOOLS"],
            "Rating" => [Some("4.5"), None, Some("4.5"), Some("4.4"), None]
        )
        .unwrap()
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let unique = deduplicate(&apps_with_duplicates()).unwrap();

        assert_eq!(unique.height(), 3);
        let apps: Vec<&str> = unique
            .column("App")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(apps, vec!["Chess", "Metronome", "Chess"]);

        let ratings = unique.column("Rating").unwrap().str().unwrap();
        assert_eq!(ratings.get(0), Some("4.5"));
        assert_eq!(ratings.get(2), Some("4.4"));
    }

    #[test]
    fn same_app_with_different_fields_is_kept() {
        let df = df!(
            "App" => ["Chess", "Chess"],
            "Installs" => ["10+", "100+"]
        )
        .unwrap();

        assert_eq!(deduplicate(&df).unwrap().height(), 2);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let once = deduplicate(&apps_with_duplicates()).unwrap();
        let twice = deduplicate(&once).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn reads_every_column_as_text() {
        let tmp = write_csv(
            "App,Category,Rating,Size,Installs,Type,Price\n\
             Chess,GAME,4.5,19.0,\"10,000+\",Free,0\n\
             Metronome,TOOLS,,2.0,100+,Paid,$4.99\n",
        );

        let df = load_apps(tmp.path()).unwrap();
        assert_eq!(df.height(), 2);
        for column in df.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }

        let installs = df.column("Installs").unwrap().str().unwrap();
        assert_eq!(installs.get(0), Some("10,000+"));
        assert_eq!(df.column("Rating").unwrap().str().unwrap().get(1), None);
    }

    #[test]
    fn null_markers_are_read_as_null() {
        let tmp = write_csv(
            "App,Review,Sentiment\n\
             Chess,nan,nan\n\
             Chess,Great game,Positive\n",
        );

        let df = load_reviews(tmp.path()).unwrap();
        let reviews = df.column("Review").unwrap().str().unwrap();
        assert_eq!(reviews.get(0), None);
        assert_eq!(reviews.get(1), Some("Great game"));
        assert_eq!(df.column("Sentiment").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.csv");

        assert!(matches!(load_apps(&path), Err(LoaderError::Io { .. })));
    }

    #[test]
    fn directory_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();

        match load_apps(dir.path()) {
            Err(LoaderError::Io { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
            }
            other => panic!("expected an io error, got {:?}", other),
        }
        assert!(matches!(
            load_reviews(dir.path()),
            Err(LoaderError::Io { .. })
        ));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let tmp = write_csv("App,Category,Rating,Size,Installs,Type\nChess,GAME,4.5,19.0,10+,Free\n");

        match load_apps(tmp.path()) {
            Err(LoaderError::MissingColumn { file, column }) => {
                assert_eq!(file, "apps");
                assert_eq!(column, "Price");
            }
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn reviews_only_require_the_app_column() {
        let tmp = write_csv("App,Review\nChess,Great\n");
        assert!(load_reviews(tmp.path()).is_ok());

        let tmp = write_csv("Name,Review\nChess,Great\n");
        assert!(matches!(
            load_reviews(tmp.path()),
            Err(LoaderError::MissingColumn { file: "reviews", .. })
        ));
    }
}
