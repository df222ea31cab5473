//! # Training Data Loading and Validation
//!
//! Reads the comma-separated dataset written by the generator (or collected
//! elsewhere in the same layout), validates it against the fixed carrier
//! schema, and converts it to the `ndarray` structures used by the trainer.
//!
//! - Strict Schema: the five feature columns of
//!   [`crate::features::FEATURE_COLUMNS`] and the `carrier` label are
//!   required by name. Extra columns are ignored.
//! - User-Centric Errors: failures are assumed to be problems with the input
//!   file, and every `DataError` names the offending column.

use crate::features::{FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Fewer rows than this cannot support a holdout split.
pub const MINIMUM_ROWS: usize = 20;

/// A container for validated data ready for model training.
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// Feature matrix with shape `[n_samples, FEATURE_COUNT]`, columns in
    /// canonical order.
    pub x: Array2<f64>,
    /// Carrier labels, each 0.0 or 1.0.
    pub y: Array1<f64>,
}

impl TrainingData {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Share of rows labelled as carriers.
    pub fn carrier_fraction(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.y.sum() / self.len() as f64
        }
    }
}

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. It contains non-numeric data. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the required column '{0}'. Training requires complete data with no missing values."
    )]
    MissingValuesFound(String),
    #[error(
        "Non-finite values (NaN or Infinity) were found in the required column '{0}'. Training requires all data to be finite."
    )]
    NonFiniteValuesFound(String),
    #[error(
        "Input file contains only {found} data rows, but at least {required} are required to train a model."
    )]
    InsufficientRows { found: usize, required: usize },
    #[error("Column '{column}' must contain only 0 or 1, but row {row} holds {value}.")]
    NotBinary {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("Column 'generation' must hold whole numbers of at least 1, but row {row} holds {value}.")]
    InvalidGeneration { row: usize, value: f64 },
}

/// Loads and validates a training dataset.
pub fn load_training_data(path: impl AsRef<Path>) -> Result<TrainingData, DataError> {
    let path = path.as_ref();
    log::info!("Loading training data from '{}'", path.display());

    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b',')),
        )
        .finish()?;

    if df.height() < MINIMUM_ROWS {
        return Err(DataError::InsufficientRows {
            found: df.height(),
            required: MINIMUM_ROWS,
        });
    }

    let columns_set: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    for name in FEATURE_COLUMNS.iter().chain(std::iter::once(&LABEL_COLUMN)) {
        if !columns_set.contains(*name) {
            return Err(DataError::ColumnNotFound(name.to_string()));
        }
    }

    let mut features: Vec<Vec<f64>> = Vec::with_capacity(FEATURE_COUNT);
    for name in FEATURE_COLUMNS {
        let values = extract_numeric_column(&df, name)?;
        if name == "generation" {
            validate_generation(&values)?;
        } else {
            validate_binary(&values, name)?;
        }
        features.push(values);
    }
    let labels = extract_numeric_column(&df, LABEL_COLUMN)?;
    validate_binary(&labels, LABEL_COLUMN)?;

    let n = labels.len();
    let x = Array2::from_shape_fn((n, FEATURE_COUNT), |(i, j)| features[j][i]);
    let data = TrainingData {
        x,
        y: Array1::from_vec(labels),
    };
    log::info!(
        "Loaded {} rows ({:.1}% carriers)",
        data.len(),
        100.0 * data.carrier_fraction()
    );
    Ok(data)
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DataError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    let wrong_type = || DataError::ColumnWrongType {
        column_name: column_name.to_string(),
        expected_type: "f64 (numeric)",
        found_type: format!("{:?}", series.dtype()),
    };
    let casted = series.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    // Non-strict casts turn unparseable text into nulls.
    if casted.null_count() > 0 {
        return Err(wrong_type());
    }

    let chunked = casted.f64()?.rechunk();
    let values: Vec<f64> = chunked.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

fn validate_binary(values: &[f64], column_name: &str) -> Result<(), DataError> {
    match values
        .iter()
        .enumerate()
        .find(|&(_, &v)| v != 0.0 && v != 1.0)
    {
        Some((row, &value)) => Err(DataError::NotBinary {
            column: column_name.to_string(),
            row,
            value,
        }),
        None => Ok(()),
    }
}

fn validate_generation(values: &[f64]) -> Result<(), DataError> {
    match values
        .iter()
        .enumerate()
        .find(|&(_, &v)| v < 1.0 || v.fract() != 0.0)
    {
        Some((row, &value)) => Err(DataError::InvalidGeneration { row, value }),
        None => Ok(()),
    }
}
