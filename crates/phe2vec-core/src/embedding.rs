//! Patient sentence-embedding matrix.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};
use phe2vec_types::PatientId;

use crate::types::{Phe2VecError, Phe2VecResult};

/// One row per (patient, sentence), with the owning patient of each row.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientEmbeddingMatrix {
    matrix: Array2<f64>,
    patient_ids: Vec<PatientId>,
}

impl PatientEmbeddingMatrix {
    /// Pairs a matrix with its row labels.
    ///
    /// # Errors
    /// Returns an error if the label count differs from the row count.
    pub fn new(matrix: Array2<f64>, patient_ids: Vec<PatientId>) -> Phe2VecResult<Self> {
        if matrix.nrows() != patient_ids.len() {
            return Err(Phe2VecError::DimensionMismatch {
                expected: matrix.nrows(),
                found: patient_ids.len(),
            });
        }
        Ok(Self {
            matrix,
            patient_ids,
        })
    }

    /// The embedding rows.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Mutable access for in-place denoising.
    pub(crate) fn matrix_mut(&mut self) -> &mut Array2<f64> {
        &mut self.matrix
    }

    /// Owning patient of each row.
    pub fn patient_ids(&self) -> &[PatientId] {
        &self.patient_ids
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Returns true if the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.patient_ids.is_empty()
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(i)
    }

    /// Groups row indices by patient, in order of first appearance.
    pub fn patient_index(&self) -> PatientIndex {
        let mut index = PatientIndex::default();
        for (row, patient) in self.patient_ids.iter().enumerate() {
            index.insert(patient, row);
        }
        index
    }

    /// Splits into matrix and labels.
    pub fn into_parts(self) -> (Array2<f64>, Vec<PatientId>) {
        (self.matrix, self.patient_ids)
    }
}

/// Row indices of each patient, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientIndex {
    patients: Vec<(PatientId, Vec<usize>)>,
    positions: HashMap<PatientId, usize>,
}

impl PatientIndex {
    fn insert(&mut self, patient: &PatientId, row: usize) {
        match self.positions.get(patient) {
            Some(&position) => self.patients[position].1.push(row),
            None => {
                self.positions.insert(patient.clone(), self.patients.len());
                self.patients.push((patient.clone(), vec![row]));
            }
        }
    }

    /// Number of distinct patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    /// Returns true if no patient is indexed.
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Rows of a patient.
    pub fn rows_of(&self, patient: &str) -> Option<&[usize]> {
        self.positions
            .get(patient)
            .map(|&position| self.patients[position].1.as_slice())
    }

    /// Patients and their rows, in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, &[usize])> {
        self.patients.iter().map(|(p, rows)| (p, rows.as_slice()))
    }
}
