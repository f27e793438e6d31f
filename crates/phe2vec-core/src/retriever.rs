//! Distance-based cohort ranking.

use ndarray::{Array1, Array2, Axis};
use phe2vec_types::{RankedPatient, RankedResult};

use crate::embedding::{PatientEmbeddingMatrix, PatientIndex};
use crate::query::ExpandedQuery;

/// Pairwise cosine distances between the rows of `a` and the rows of `b`.
///
/// Distance is `1 - cos`; a pair involving a zero-norm row has distance 1.
pub fn cosine_distances(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let a_norms = row_norms(a);
    let b_norms = row_norms(b);
    let mut distances = a.dot(&b.t());
    for ((i, j), d) in distances.indexed_iter_mut() {
        let denominator = a_norms[i] * b_norms[j];
        *d = if denominator > 0.0 {
            1.0 - *d / denominator
        } else {
            1.0
        };
    }
    distances
}

fn row_norms(matrix: &Array2<f64>) -> Array1<f64> {
    matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt())
}

/// Ranks patients by distance to phenotype queries.
///
/// The row-to-patient index is built once and reused for every query.
#[derive(Debug)]
pub struct CohortRetriever<'a> {
    embeddings: &'a PatientEmbeddingMatrix,
    index: PatientIndex,
}

impl<'a> CohortRetriever<'a> {
    /// Creates a retriever over a denoised patient embedding matrix.
    pub fn new(embeddings: &'a PatientEmbeddingMatrix) -> Self {
        Self {
            index: embeddings.patient_index(),
            embeddings,
        }
    }

    /// Patients of the underlying matrix, grouped by row.
    pub fn index(&self) -> &PatientIndex {
        &self.index
    }

    /// Distance of every sentence row: cosine distance to each query
    /// vector, averaged over the query.
    pub fn sentence_distances(&self, query: &ExpandedQuery) -> Array1<f64> {
        let rows = self.embeddings.rows();
        if query.is_empty() {
            return Array1::ones(rows);
        }
        cosine_distances(&query.vectors, self.embeddings.matrix())
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::ones(rows))
    }

    /// Ranks every patient by the smallest distance among their sentences.
    ///
    /// Ties keep the order of first appearance in the matrix.
    pub fn rank(&self, query: &ExpandedQuery) -> RankedResult {
        let distances = self.sentence_distances(query);

        let mut patients: Vec<RankedPatient> = self
            .index
            .iter()
            .map(|(patient_id, rows)| RankedPatient {
                patient_id: patient_id.clone(),
                distance: rows
                    .iter()
                    .map(|&row| distances[row])
                    .fold(f64::INFINITY, f64::min),
            })
            .collect();
        patients.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        tracing::debug!(
            phenotype = %query.phenotype,
            patients = patients.len(),
            "Ranked patients"
        );
        RankedResult {
            phenotype: query.phenotype.clone(),
            patients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::collections::BTreeMap;

    fn query(vectors: Array2<f64>) -> ExpandedQuery {
        let labels = (0..vectors.nrows()).map(|i| format!("q{}", i)).collect();
        ExpandedQuery {
            phenotype: "ph".to_string(),
            vectors,
            labels,
            expansions: BTreeMap::new(),
            missing_seeds: Vec::new(),
        }
    }

    #[test]
    fn test_cosine_distances() {
        let d = cosine_distances(
            &array![[1.0, 0.0]],
            &array![[2.0, 0.0], [0.0, 3.0], [-1.0, 0.0], [0.0, 0.0]],
        );
        assert_abs_diff_eq!(d[[0, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d[[0, 2]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d[[0, 3]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rank_uses_closest_sentence() {
        // Scenario: p1 has sentences at distance 0.2 and 0.9, p2 one at 0.5
        let embeddings = PatientEmbeddingMatrix::new(
            array![[0.8, 0.6], [0.1, 0.99498743710662], [0.5, 0.8660254037844386]],
            vec!["p1".into(), "p1".into(), "p2".into()],
        )
        .unwrap();
        let retriever = CohortRetriever::new(&embeddings);
        let ranked = retriever.rank(&query(array![[1.0, 0.0]]));

        assert_eq!(ranked.patient_ids(), vec!["p1", "p2"]);
        assert_abs_diff_eq!(ranked.patients[0].distance, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(ranked.patients[1].distance, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_averaged_over_query() {
        let embeddings = PatientEmbeddingMatrix::new(
            array![[1.0, 0.0], [0.0, 1.0]],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let retriever = CohortRetriever::new(&embeddings);
        let distances =
            retriever.sentence_distances(&query(array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
        assert_abs_diff_eq!(distances[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(distances[1], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rank_is_sorted_and_stable() {
        let embeddings = PatientEmbeddingMatrix::new(
            array![[0.0, 1.0], [1.0, 0.0], [0.0, 2.0], [1.0, 1.0]],
            vec!["c".into(), "a".into(), "b".into(), "d".into()],
        )
        .unwrap();
        let retriever = CohortRetriever::new(&embeddings);
        let ranked = retriever.rank(&query(array![[0.0, 1.0]]));

        // c and b tie at distance 0
        assert_eq!(ranked.patient_ids(), vec!["c", "b", "d", "a"]);
        let distances = ranked.distances();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(retriever.rank(&query(array![[0.0, 1.0]])), ranked);
    }
}
