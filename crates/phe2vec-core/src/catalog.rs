//! Phenotype catalogue: one expanded phenotype per coded concept.
//!
//! Every vocabulary concept of a terminology system is used in turn as the
//! single seed of a phenotype query, and its expansion is recorded as
//! `(seed, similar concept, cosine similarity)` rows.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use phe2vec_types::{well_known, CodedConcept, ConceptId};

use crate::provider::ConceptEmbedding;
use crate::query::PhenotypeQueryExpander;

const PROGRESS_INTERVAL: usize = 500;

/// Vocabulary concepts of one terminology system, keyed by code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodedVocabulary {
    concepts: BTreeMap<String, ConceptId>,
}

impl CodedVocabulary {
    /// Indexes the coded concepts of `system`.
    ///
    /// Concepts with fewer than three fields are ignored. When two concepts
    /// share a code, the later one in the vocabulary wins.
    pub fn build(vocabulary: &[ConceptId], system: &str) -> Self {
        let concepts = vocabulary
            .iter()
            .filter_map(|concept| {
                CodedConcept::parse(concept)
                    .filter(|coded| coded.is_system(system))
                    .map(|coded| (coded.code, concept.clone()))
            })
            .collect();
        Self { concepts }
    }

    /// Indexes the ICD-9 concepts of a vocabulary.
    pub fn icd9(vocabulary: &[ConceptId]) -> Self {
        Self::build(vocabulary, well_known::ICD9_SYSTEM)
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Returns true if no code is indexed.
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Concept of a code.
    pub fn concept_of(&self, code: &str) -> Option<&ConceptId> {
        self.concepts.get(code)
    }

    /// Codes and their concepts, sorted by code.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConceptId)> {
        self.concepts.iter()
    }
}

/// A concept similar to a phenotype seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeRow {
    /// Seed concept.
    #[serde(rename = "SEED")]
    pub seed: ConceptId,
    /// Neighbouring concept.
    #[serde(rename = "SIMILAR CONCEPTS")]
    pub concept: ConceptId,
    /// Cosine similarity to the seed.
    #[serde(rename = "COSINE SIMILARITY")]
    pub similarity: f64,
}

/// Expanded phenotypes of every code of a coded vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhenotypeCatalog {
    /// Rows ordered by code, then by decreasing similarity.
    pub rows: Vec<PhenotypeRow>,
    /// Codes the catalogue was built from.
    pub vocabulary: CodedVocabulary,
    /// Codes whose query could not be built.
    pub skipped: Vec<String>,
}

impl PhenotypeCatalog {
    /// Expands every code of `vocabulary`.
    pub fn build<E>(
        embedding: &E,
        expander: &PhenotypeQueryExpander,
        vocabulary: CodedVocabulary,
    ) -> Self
    where
        E: ConceptEmbedding + ?Sized,
    {
        tracing::info!("Building phenotypes for {} codes", vocabulary.len());
        let processed = AtomicUsize::new(0);
        let codes: Vec<(&String, &ConceptId)> = vocabulary.iter().collect();

        let expand = |(code, concept): &(&String, &ConceptId)| {
            let seeds = [(*concept).clone()];
            let rows = expander.expand(embedding, code, &seeds).map(|query| {
                query
                    .expansions
                    .into_iter()
                    .flat_map(|(seed, neighbors)| {
                        neighbors.into_iter().map(move |n| PhenotypeRow {
                            seed: seed.clone(),
                            concept: n.concept,
                            similarity: n.similarity,
                        })
                    })
                    .collect::<Vec<_>>()
            });

            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 {
                tracing::info!("Processed {} codes", done);
            }
            ((*code).clone(), rows)
        };

        #[cfg(feature = "parallel")]
        let expanded: Vec<(String, Option<Vec<PhenotypeRow>>)> =
            codes.par_iter().map(expand).collect();
        #[cfg(not(feature = "parallel"))]
        let expanded: Vec<(String, Option<Vec<PhenotypeRow>>)> =
            codes.iter().map(expand).collect();

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (code, code_rows) in expanded {
            match code_rows {
                Some(code_rows) => rows.extend(code_rows),
                None => skipped.push(code),
            }
        }

        tracing::info!(
            "Built {} phenotype rows, skipped {} codes",
            rows.len(),
            skipped.len()
        );
        Self {
            rows,
            vocabulary,
            skipped,
        }
    }

    /// Phenotypes of every ICD-9 code in the embedding vocabulary, expanded
    /// with the discovery preset.
    pub fn icd9<E>(embedding: &E) -> Self
    where
        E: ConceptEmbedding + ?Sized,
    {
        let expander =
            PhenotypeQueryExpander::new(crate::types::ExpansionConfig::phenotype_discovery());
        Self::build(embedding, &expander, CodedVocabulary::icd9(embedding.vocabulary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyed_vectors::KeyedVectors;
    use crate::types::ExpansionConfig;

    fn embedding() -> KeyedVectors {
        KeyedVectors::from_entries(vec![
            ("icd9::asthma::493.90".to_string(), vec![1.0, 0.0, 0.0]),
            ("icd9::wheezing::786.07".to_string(), vec![0.9, 0.2, 0.0]),
            ("rxnorm::albuterol::435".to_string(), vec![0.8, 0.0, 0.3]),
            ("icd9::diabetes".to_string(), vec![0.0, 1.0, 0.0]),
            ("loinc::hba1c::4548-4".to_string(), vec![0.0, 0.9, 0.1]),
        ])
        .unwrap()
    }

    #[test]
    fn test_coded_vocabulary() {
        let vectors = embedding();
        let vocabulary = CodedVocabulary::icd9(vectors.vocabulary());
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(
            vocabulary.concept_of("493.90").map(String::as_str),
            Some("icd9::asthma::493.90")
        );
        let codes: Vec<&String> = vocabulary.iter().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["493.90", "786.07"]);
    }

    #[test]
    fn test_one_row_per_neighbour() {
        let vectors = embedding();
        let mut config = ExpansionConfig::phenotype_discovery();
        config.neighbors = 2;
        let catalog = PhenotypeCatalog::build(
            &vectors,
            &PhenotypeQueryExpander::new(config),
            CodedVocabulary::icd9(vectors.vocabulary()),
        );

        assert_eq!(catalog.rows.len(), 4);
        assert!(catalog.skipped.is_empty());
        assert_eq!(catalog.rows[0].seed, "icd9::asthma::493.90");
        assert_eq!(catalog.rows[0].concept, "icd9::wheezing::786.07");
        assert!(catalog.rows[0].similarity >= catalog.rows[1].similarity);
        assert_eq!(catalog.rows[2].seed, "icd9::wheezing::786.07");
    }

    #[test]
    fn test_icd9_catalog_uses_discovery_preset() {
        let catalog = PhenotypeCatalog::icd9(&embedding());
        // every other concept is a neighbour when fewer than 100 exist
        assert_eq!(catalog.rows.len(), 2 * 4);
    }
}
