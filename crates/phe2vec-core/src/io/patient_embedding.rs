//! Persisted patient embedding CSV.
//!
//! Header `PID,F0,..,F{d-1}`, then one row per sentence embedding with the
//! owning patient id first. Values are written as `f32` with five decimals.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use phe2vec_types::PatientId;

use super::{open, validate_headers};
use crate::embedding::PatientEmbeddingMatrix;
use crate::provider::EmbeddingBackend;
use crate::types::{Phe2VecError, Phe2VecResult, WindowConfig};

const PATIENT_COLUMN: &str = "PID";

fn header(dimension: usize) -> Vec<String> {
    std::iter::once(PATIENT_COLUMN.to_string())
        .chain((0..dimension).map(|i| format!("F{}", i)))
        .collect()
}

/// Writes the patient embedding to `dir` under the backend's file name.
///
/// Creates `dir` if needed and returns the path written.
pub fn save_patient_embedding<P: AsRef<Path>>(
    dir: P,
    backend: EmbeddingBackend,
    window: &WindowConfig,
    embeddings: &PatientEmbeddingMatrix,
) -> Phe2VecResult<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(backend.patient_embedding_file_name(
        embeddings.dimension(),
        window.length,
        window.step,
    ));

    let mut writer = BufWriter::new(File::create(&path)?);
    write_patient_embedding_to(&mut writer, embeddings)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} sentence embeddings to {}",
        embeddings.rows(),
        path.display()
    );
    Ok(path)
}

/// Writes the patient embedding as CSV.
pub fn write_patient_embedding_to<W: Write>(
    writer: W,
    embeddings: &PatientEmbeddingMatrix,
) -> Phe2VecResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(header(embeddings.dimension()))?;

    let mut record = Vec::with_capacity(embeddings.dimension() + 1);
    for (patient, row) in embeddings.patient_ids().iter().zip(embeddings.matrix().rows()) {
        record.clear();
        record.push(patient.clone());
        record.extend(row.iter().map(|&v| format!("{:.5}", v as f32)));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Loads a patient embedding CSV file.
pub fn load_patient_embedding<P: AsRef<Path>>(path: P) -> Phe2VecResult<PatientEmbeddingMatrix> {
    let path = path.as_ref();
    let embeddings = read_patient_embedding_from(open(path)?)?;
    tracing::info!(
        "Loaded {} sentence embeddings of dimension {} from {}",
        embeddings.rows(),
        embeddings.dimension(),
        path.display()
    );
    Ok(embeddings)
}

/// Reads a patient embedding from CSV data.
pub fn read_patient_embedding_from<R: Read>(reader: R) -> Phe2VecResult<PatientEmbeddingMatrix> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let dimension = headers.len().saturating_sub(1);
    let expected = header(dimension);
    let expected: Vec<&str> = expected.iter().map(String::as_str).collect();
    validate_headers(&headers, &expected)?;

    let mut patient_ids: Vec<PatientId> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;
        let mut fields = record.iter();
        let patient = fields.next().unwrap_or_default();
        patient_ids.push(patient.to_string());
        for field in fields {
            let value: f32 = field.trim().parse().map_err(|_| {
                Phe2VecError::Parse(format!(
                    "invalid embedding value '{}' on row {}",
                    field,
                    line + 2
                ))
            })?;
            values.push(f64::from(value));
        }
    }

    let matrix = Array2::from_shape_vec((patient_ids.len(), dimension), values)
        .map_err(|e| Phe2VecError::Parse(e.to_string()))?;
    PatientEmbeddingMatrix::new(matrix, patient_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> PatientEmbeddingMatrix {
        PatientEmbeddingMatrix::new(
            array![[0.123456, -1.0], [0.5, 0.25], [1.0, 0.0]],
            vec!["p1".into(), "p1".into(), "p2".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_csv_layout() {
        let mut buffer = Vec::new();
        write_patient_embedding_to(&mut buffer, &sample()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "PID,F0,F1");
        assert_eq!(lines[1], "p1,0.12346,-1.00000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_patient_embedding(
            dir.path().join("out"),
            EmbeddingBackend::Word2Vec,
            &WindowConfig::default(),
            &sample(),
        )
        .unwrap();
        assert!(path.ends_with("word2vec-patient-embedding-2-15-5.csv"));

        let loaded = load_patient_embedding(&path).unwrap();
        assert_eq!(loaded.patient_ids(), sample().patient_ids());
        assert_eq!(loaded.patient_index(), sample().patient_index());
        assert!((loaded.matrix()[[0, 0]] - 0.12346).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_value() {
        let err = read_patient_embedding_from("PID,F0\np1,abc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Phe2VecError::Parse(_)));
    }

    #[test]
    fn test_rejects_bad_header() {
        let err = read_patient_embedding_from("ID,F0\np1,0.1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Phe2VecError::UnexpectedColumn { position: 0, .. }));
    }
}
