//! Weighted averaging of concept vectors into sentence embeddings.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1};
use phe2vec_types::PatientId;

use crate::embedding::PatientEmbeddingMatrix;
use crate::provider::ConceptEmbedding;
use crate::types::{Phe2VecError, Phe2VecResult};
use crate::weighter::{ConceptWeights, FilteredCorpus};

/// Z-scores a vector with its own mean and population standard deviation.
///
/// A constant vector has no spread to scale by and maps to zeros.
pub fn standardize(vector: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = vector.len();
    if n == 0 {
        return Array1::zeros(0);
    }
    let mean = vector.sum() / n as f64;
    let variance = vector.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    if std > 0.0 && std.is_finite() {
        vector.mapv(|v| (v - mean) / std)
    } else {
        Array1::zeros(n)
    }
}

/// Turns filtered patient sentences into sentence embeddings.
///
/// Each concept vector is standardised and scaled by the concept weight
/// once; a sentence is the mean of its concepts' weighted vectors.
pub struct PatientEmbedder<'a, E: ?Sized> {
    embedding: &'a E,
    weights: &'a ConceptWeights,
}

impl<'a, E> PatientEmbedder<'a, E>
where
    E: ConceptEmbedding + ?Sized,
{
    /// Creates an embedder over a concept embedding and concept weights.
    pub fn new(embedding: &'a E, weights: &'a ConceptWeights) -> Self {
        Self { embedding, weights }
    }

    /// Standardised, weighted vector of a concept.
    ///
    /// Returns `None` if the concept has no vector or no weight.
    pub fn weighted_vector(&self, concept: &str) -> Option<Array1<f64>> {
        let vector = self.embedding.vector_of(concept)?;
        let weight = self.weights.weight(concept)?;
        Some(standardize(vector) * weight)
    }

    /// Embeds every sentence of every patient.
    ///
    /// Rows follow patient order, then sentence order.
    pub fn embed(&self, corpus: &FilteredCorpus) -> Phe2VecResult<PatientEmbeddingMatrix> {
        let dimension = self.embedding.dimension();
        let mut cache: HashMap<&str, Option<Array1<f64>>> = HashMap::new();
        let mut flat = Vec::with_capacity(corpus.sentence_count() * dimension);
        let mut patient_ids: Vec<PatientId> = Vec::with_capacity(corpus.sentence_count());

        for patient in &corpus.patients {
            for sentence in &patient.sentences {
                let mut sum = Array1::<f64>::zeros(dimension);
                let mut members = 0usize;
                for concept in sentence {
                    let weighted = cache
                        .entry(concept.as_str())
                        .or_insert_with(|| self.weighted_vector(concept));
                    if let Some(vector) = weighted {
                        sum += &*vector;
                        members += 1;
                    }
                }
                if members == 0 {
                    tracing::warn!(
                        patient = %patient.patient_id,
                        "Sentence without embeddable concepts skipped"
                    );
                    continue;
                }
                flat.extend((sum / members as f64).iter().copied());
                patient_ids.push(patient.patient_id.clone());
            }
        }

        let matrix = Array2::from_shape_vec((patient_ids.len(), dimension), flat)
            .map_err(|e| Phe2VecError::Parse(e.to_string()))?;
        tracing::info!(
            "Computed {} sentence embeddings of dimension {}",
            matrix.nrows(),
            dimension
        );
        PatientEmbeddingMatrix::new(matrix, patient_ids)
    }
}
