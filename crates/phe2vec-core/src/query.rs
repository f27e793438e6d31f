//! Phenotype query construction and expansion in concept space.

use std::collections::BTreeMap;

use ndarray::Array2;
use phe2vec_types::ConceptId;

use crate::provider::{ConceptEmbedding, Neighbor};
use crate::types::ExpansionConfig;

/// Query vectors of one phenotype.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    /// Disease label.
    pub phenotype: String,
    /// One row per label, seeds first then their expansions.
    pub vectors: Array2<f64>,
    /// Concept of each row. Neighbours shared by several seeds repeat.
    pub labels: Vec<ConceptId>,
    /// Neighbours added for each seed found in the vocabulary.
    pub expansions: BTreeMap<ConceptId, Vec<Neighbor>>,
    /// Seeds missing from the vocabulary.
    pub missing_seeds: Vec<ConceptId>,
}

impl ExpandedQuery {
    /// Number of query vectors.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the query has no vectors.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Builds expanded phenotype queries from seed concepts.
///
/// # Example
///
/// ```
/// use phe2vec_core::{ExpansionConfig, KeyedVectors, PhenotypeQueryExpander};
///
/// let vectors = KeyedVectors::from_entries(vec![
///     ("asthma".to_string(), vec![1.0, 0.0]),
///     ("wheezing".to_string(), vec![0.9, 0.1]),
///     ("fracture".to_string(), vec![0.0, 1.0]),
/// ])?;
///
/// let expander = PhenotypeQueryExpander::new(ExpansionConfig::cohort_retrieval());
/// let query = expander
///     .expand(&vectors, "asthma", &["asthma".to_string()])
///     .expect("asthma is in the vocabulary");
/// assert_eq!(query.labels, vec!["asthma", "wheezing"]);
/// # Ok::<(), phe2vec_core::Phe2VecError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PhenotypeQueryExpander {
    config: ExpansionConfig,
}

impl PhenotypeQueryExpander {
    /// Creates an expander.
    pub fn new(config: ExpansionConfig) -> Self {
        Self { config }
    }

    /// Returns the expansion configuration.
    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Builds the query of a phenotype.
    ///
    /// Returns `None` if no seed is in the vocabulary.
    pub fn expand<E>(
        &self,
        embedding: &E,
        phenotype: &str,
        seeds: &[ConceptId],
    ) -> Option<ExpandedQuery>
    where
        E: ConceptEmbedding + ?Sized,
    {
        let mut labels: Vec<ConceptId> = Vec::new();
        let mut expansions: BTreeMap<ConceptId, Vec<Neighbor>> = BTreeMap::new();
        let mut missing_seeds = Vec::new();

        for seed in seeds {
            if !embedding.contains(seed) {
                missing_seeds.push(seed.clone());
                continue;
            }
            labels.push(seed.clone());

            let neighbors = if self.config.enabled {
                embedding
                    .nearest_neighbors(seed, self.config.neighbors)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|n| self.config.accepts(n.similarity))
                    .collect()
            } else {
                Vec::new()
            };
            expansions.entry(seed.clone()).or_insert(neighbors);
        }

        if labels.is_empty() {
            tracing::warn!(phenotype, "No seed concept in the vocabulary; phenotype skipped");
            return None;
        }
        if !missing_seeds.is_empty() {
            tracing::debug!(
                phenotype,
                missing = missing_seeds.len(),
                "Seeds missing from the vocabulary"
            );
        }

        for seed in labels.clone() {
            if let Some(neighbors) = expansions.get(&seed) {
                labels.extend(neighbors.iter().map(|n| n.concept.clone()));
            }
        }

        let dimension = embedding.dimension();
        let mut vectors = Array2::zeros((labels.len(), dimension));
        for (mut row, label) in vectors.rows_mut().into_iter().zip(&labels) {
            if let Some(vector) = embedding.vector_of(label) {
                row.assign(&vector);
            }
        }

        tracing::debug!(phenotype, concepts = labels.len(), "Expanded phenotype query");
        Some(ExpandedQuery {
            phenotype: phenotype.to_string(),
            vectors,
            labels,
            expansions,
            missing_seeds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyed_vectors::KeyedVectors;

    fn embedding() -> KeyedVectors {
        KeyedVectors::from_entries(vec![
            ("seed".to_string(), vec![1.0, 0.0, 0.0]),
            ("close".to_string(), vec![0.95, 0.1, 0.0]),
            ("mid".to_string(), vec![0.7, 0.71, 0.0]),
            ("far".to_string(), vec![0.0, 0.0, 1.0]),
            ("other".to_string(), vec![0.0, 1.0, 0.0]),
        ])
        .unwrap()
    }

    fn seeds(concepts: &[&str]) -> Vec<ConceptId> {
        concepts.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_retrieval_keeps_neighbours_above_threshold() {
        let expander = PhenotypeQueryExpander::new(ExpansionConfig::cohort_retrieval());
        let query = expander.expand(&embedding(), "ph", &seeds(&["seed", "nope"])).unwrap();

        assert_eq!(query.labels, seeds(&["seed", "close", "mid"]));
        assert_eq!(query.vectors.nrows(), 3);
        assert_eq!(query.vectors.row(1).to_vec(), vec![0.95, 0.1, 0.0]);
        assert_eq!(query.missing_seeds, seeds(&["nope"]));
        assert!(query.expansions["seed"].iter().all(|n| n.similarity > 0.7));
        assert!(!query.expansions.contains_key("nope"));
    }

    #[test]
    fn test_discovery_keeps_all_neighbours() {
        let mut config = ExpansionConfig::phenotype_discovery();
        config.neighbors = 3;
        let query = PhenotypeQueryExpander::new(config)
            .expand(&embedding(), "ph", &seeds(&["seed"]))
            .unwrap();
        assert_eq!(query.len(), 4);
        assert_eq!(query.expansions["seed"].len(), 3);
    }

    #[test]
    fn test_seeds_only() {
        let query = PhenotypeQueryExpander::new(ExpansionConfig::seeds_only())
            .expand(&embedding(), "ph", &seeds(&["far", "other"]))
            .unwrap();
        assert_eq!(query.labels, seeds(&["far", "other"]));
        assert!(query.expansions.values().all(Vec::is_empty));
        assert_eq!(query.expansions.len(), 2);
    }

    #[test]
    fn test_no_usable_seed() {
        let expander = PhenotypeQueryExpander::default();
        assert!(expander.expand(&embedding(), "ph", &seeds(&["x", "y"])).is_none());
        assert!(expander.expand(&embedding(), "ph", &[]).is_none());
    }
}
