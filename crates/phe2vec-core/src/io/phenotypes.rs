//! Phenotype catalogue CSVs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::catalog::{CodedVocabulary, PhenotypeCatalog};
use crate::types::Phe2VecResult;

const PHENOTYPES_FILE: &str = "icd9-phenotypes.csv";
const VOCABULARY_FILE: &str = "icd9-vocab.csv";

/// Writes `icd9-phenotypes.csv` and `icd9-vocab.csv` into `dir`.
///
/// Creates `dir` if needed and returns both paths.
pub fn write_phenotype_catalog<P: AsRef<Path>>(
    dir: P,
    catalog: &PhenotypeCatalog,
) -> Phe2VecResult<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let phenotypes = dir.join(PHENOTYPES_FILE);
    let mut writer = BufWriter::new(File::create(&phenotypes)?);
    write_phenotypes_to(&mut writer, catalog)?;
    writer.flush()?;

    let vocabulary = dir.join(VOCABULARY_FILE);
    let mut writer = BufWriter::new(File::create(&vocabulary)?);
    write_vocabulary_to(&mut writer, &catalog.vocabulary)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} phenotype rows and {} codes to {}",
        catalog.rows.len(),
        catalog.vocabulary.len(),
        dir.display()
    );
    Ok((phenotypes, vocabulary))
}

/// Writes the `SEED,SIMILAR CONCEPTS,COSINE SIMILARITY` rows.
pub fn write_phenotypes_to<W: Write>(writer: W, catalog: &PhenotypeCatalog) -> Phe2VecResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if catalog.rows.is_empty() {
        csv_writer.write_record(["SEED", "SIMILAR CONCEPTS", "COSINE SIMILARITY"])?;
    }
    for row in &catalog.rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the `CODE,LABEL` rows, sorted by code.
pub fn write_vocabulary_to<W: Write>(writer: W, vocabulary: &CodedVocabulary) -> Phe2VecResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["CODE", "LABEL"])?;
    for (code, concept) in vocabulary.iter() {
        csv_writer.write_record([code.as_str(), concept.as_str()])?;
    }
    csv_writer.flush()?;
    Ok(())
}
