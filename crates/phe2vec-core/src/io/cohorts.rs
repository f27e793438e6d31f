//! Ground-truth cohort JSON.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use phe2vec_types::CohortCatalog;

use super::open;
use crate::types::Phe2VecResult;

/// Reads ground-truth cohorts from a JSON file.
///
/// The file holds `{ "<phenotype>": { "seed": [..], "patients": [..] } }`.
pub fn read_cohorts<P: AsRef<Path>>(path: P) -> Phe2VecResult<CohortCatalog> {
    let path = path.as_ref();
    let cohorts = read_cohorts_from(open(path)?)?;
    tracing::info!("Loaded {} cohorts from {}", cohorts.len(), path.display());
    Ok(cohorts)
}

/// Reads ground-truth cohorts from JSON data.
pub fn read_cohorts_from<R: Read>(reader: R) -> Phe2VecResult<CohortCatalog> {
    Ok(serde_json::from_reader(reader)?)
}

/// Writes ground-truth cohorts to a JSON file.
pub fn write_cohorts<P: AsRef<Path>>(path: P, cohorts: &CohortCatalog) -> Phe2VecResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_cohorts_to(&mut writer, cohorts)?;
    writer.flush()?;
    Ok(())
}

/// Writes ground-truth cohorts as pretty-printed JSON.
pub fn write_cohorts_to<W: Write>(writer: W, cohorts: &CohortCatalog) -> Phe2VecResult<()> {
    serde_json::to_writer_pretty(writer, cohorts)?;
    Ok(())
}
