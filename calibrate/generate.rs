//! # Synthetic Pedigree Dataset Generator
//!
//! Produces labelled rows for training the carrier classifier. Each row
//! simulates one individual under a simplified autosomal-recessive model:
//! the two parents' carrier states are drawn first, the individual's carrier
//! label follows from them, and the observable affectation flags are drawn
//! conditionally on those hidden states.
//!
//! Columns are written in the exact order of
//! [`crate::features::FEATURE_COLUMNS`] followed by the `carrier` label.

use crate::features::{FEATURE_COLUMNS, LABEL_COLUMN};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Default number of simulated individuals.
pub const DEFAULT_ROWS: usize = 10_000;

/// Default output file name.
pub const DEFAULT_DATASET_PATH: &str = "synthetic_genetic_data.csv";

const PARENT_CARRIER_RATE: f64 = 0.5;
const CARRIER_GIVEN_TWO_CARRIER_PARENTS: f64 = 0.67;
const CARRIER_GIVEN_ONE_CARRIER_PARENT: f64 = 0.5;
const AFFECTED_GIVEN_CARRIER: f64 = 0.25;
const AFFECTED_PARENT_GIVEN_CARRIER_PARENT: f64 = 0.30;
const AFFECTED_SIBLING_GIVEN_CARRIER: f64 = 0.20;
const AFFECTED_CHILD_GIVEN_CARRIER: f64 = 0.15;
const GENERATIONS: std::ops::RangeInclusive<u8> = 1..=3;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Failed to create dataset file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to write dataset row: {0}")]
    CsvError(#[from] csv::Error),
}

/// One labelled training row. Field order is the on-disk column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub affected_self: u8,
    pub affected_parent: u8,
    pub affected_sibling: u8,
    pub affected_child: u8,
    pub generation: u8,
    pub carrier: u8,
}

/// Simulates a single individual.
pub fn generate_individual<R: Rng>(rng: &mut R) -> DatasetRow {
    let first_parent_carrier = rng.gen_bool(PARENT_CARRIER_RATE);
    let second_parent_carrier = rng.gen_bool(PARENT_CARRIER_RATE);
    let any_parent_carrier = first_parent_carrier || second_parent_carrier;

    let carrier = match (first_parent_carrier, second_parent_carrier) {
        (true, true) => rng.gen_bool(CARRIER_GIVEN_TWO_CARRIER_PARENTS),
        (true, false) | (false, true) => rng.gen_bool(CARRIER_GIVEN_ONE_CARRIER_PARENT),
        (false, false) => false,
    };

    // Disease only occurs in carriers under this simplified model.
    let affected_self = carrier && rng.gen_bool(AFFECTED_GIVEN_CARRIER);
    let affected_parent = any_parent_carrier && rng.gen_bool(AFFECTED_PARENT_GIVEN_CARRIER_PARENT);
    let affected_sibling = carrier && rng.gen_bool(AFFECTED_SIBLING_GIVEN_CARRIER);
    let affected_child = carrier && rng.gen_bool(AFFECTED_CHILD_GIVEN_CARRIER);
    let generation = rng.gen_range(GENERATIONS);

    DatasetRow {
        affected_self: u8::from(affected_self),
        affected_parent: u8::from(affected_parent),
        affected_sibling: u8::from(affected_sibling),
        affected_child: u8::from(affected_child),
        generation,
        carrier: u8::from(carrier),
    }
}

/// Lazily simulates `rows` individuals from a seeded generator, so the same
/// seed always reproduces the same dataset.
pub fn generate_rows(rows: usize, seed: u64) -> impl Iterator<Item = DatasetRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows).map(move |_| generate_individual(&mut rng))
}

/// Writes rows as CSV with the canonical header. Returns the number of rows.
pub fn write_dataset(
    path: impl AsRef<Path>,
    rows: impl IntoIterator<Item = DatasetRow>,
) -> Result<usize, GeneratorError> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    let header: Vec<&str> = FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(LABEL_COLUMN))
        .collect();
    writer.write_record(&header)?;

    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    writer.flush()?;
    log::info!(
        "Wrote {} synthetic rows to '{}'",
        written,
        path.as_ref().display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn rows_respect_the_simulation_implications() {
        for row in generate_rows(5_000, 7) {
            assert!(row.carrier <= 1);
            assert!((1..=3).contains(&row.generation));
            if row.carrier == 0 {
                assert_eq!(row.affected_self, 0);
                assert_eq!(row.affected_sibling, 0);
                assert_eq!(row.affected_child, 0);
            }
        }
    }

    #[test]
    fn carrier_rate_matches_the_model() {
        // P(carrier) = 0.25 * 0.67 + 0.5 * 0.5 = 0.4175
        let rows: Vec<DatasetRow> = generate_rows(20_000, 11).collect();
        let carriers = rows.iter().filter(|r| r.carrier == 1).count();
        let rate = carriers as f64 / rows.len() as f64;
        assert!((rate - 0.4175).abs() < 0.02, "carrier rate {rate}");
        assert!(rows.iter().any(|r| r.generation == 1));
        assert!(rows.iter().any(|r| r.generation == 3));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let first: Vec<DatasetRow> = generate_rows(50, 3).collect();
        let second: Vec<DatasetRow> = generate_rows(50, 3).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn written_file_uses_canonical_column_order() {
        let file = NamedTempFile::new().unwrap();
        let written = write_dataset(file.path(), generate_rows(10, 1)).unwrap();
        assert_eq!(written, 10);

        let content = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("affected_self,affected_parent,affected_sibling,affected_child,generation,carrier")
        );
        assert_eq!(lines.count(), 10);
    }
}
