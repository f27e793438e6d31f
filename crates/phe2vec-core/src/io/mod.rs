//! Readers and writers for the batch file formats.
//!
//! - **Events** - `patient_id,concept_id,age_in_days` CSV, one row per event
//! - **Cohorts** - JSON object of ground-truth cohorts keyed by phenotype
//! - **Patient embedding** - `PID,F0..F{d-1}` CSV, one row per sentence
//! - **Categories** - `code,category` CSV used by the concept evaluation
//! - **Phenotype catalogue** - `icd9-phenotypes.csv` and `icd9-vocab.csv`
//!
//! # Usage
//!
//! ```ignore
//! use phe2vec_core::io;
//!
//! let timelines = io::read_events("events.csv")?;
//! let cohorts = io::read_cohorts("cohorts.json")?;
//! ```

mod categories;
mod cohorts;
mod events;
mod patient_embedding;
mod phenotypes;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::StringRecord;

use crate::types::{Phe2VecError, Phe2VecResult};

pub use categories::{read_categories, read_categories_from};
pub use cohorts::{read_cohorts, read_cohorts_from, write_cohorts, write_cohorts_to};
pub use events::{read_events, read_events_from, write_events_to, EventRecord};
pub use patient_embedding::{
    load_patient_embedding, read_patient_embedding_from, save_patient_embedding,
    write_patient_embedding_to,
};
pub use phenotypes::{write_phenotype_catalog, write_phenotypes_to, write_vocabulary_to};

/// Opens a file for buffered reading.
///
/// # Errors
/// Returns [`Phe2VecError::FileNotFound`] if the path does not exist.
fn open<P: AsRef<Path>>(path: P) -> Phe2VecResult<BufReader<File>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Phe2VecError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Checks that a header row starts with the expected columns.
fn validate_headers(headers: &StringRecord, expected: &[&str]) -> Phe2VecResult<()> {
    for (position, expected_col) in expected.iter().enumerate() {
        let found = headers.get(position).unwrap_or("");
        // Handle UTF-8 BOM at start of file
        let found = found.trim_start_matches('\u{feff}').trim();
        if found != *expected_col {
            return Err(Phe2VecError::UnexpectedColumn {
                position,
                expected: expected_col.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}
