//! Intrinsic evaluation of concept embeddings against a code categorisation.
//!
//! For each coded concept with a known category, the categories of its
//! nearest coded neighbours should match its own.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use phe2vec_types::{well_known, CodedConcept, ConceptId};

use crate::metrics::round_to;
use crate::provider::ConceptEmbedding;

/// Configuration of the concept evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptEvalConfig {
    /// Neighbour categories compared per concept.
    pub knn: usize,
    /// Terminology system of the evaluated concepts.
    pub system: &'static str,
    /// Cut-off of the precision.
    pub precision_at: usize,
}

impl Default for ConceptEvalConfig {
    fn default() -> Self {
        Self {
            knn: 50,
            system: well_known::ICD9_SYSTEM,
            precision_at: well_known::PRECISION_AT,
        }
    }
}

/// Mean scores over the evaluated concepts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConceptEvalReport {
    /// Mean average precision of neighbour categories.
    pub map: f64,
    /// Mean precision of the first neighbour categories.
    pub precision_at_n: f64,
    /// Concepts evaluated.
    pub evaluated: usize,
}

/// Average precision of a category ranking against the expected category.
fn average_precision(ranking: &[&str], category: &str) -> f64 {
    let mut relevant = 0usize;
    let mut total = 0.0;
    for (i, c) in ranking.iter().enumerate() {
        if *c == category {
            relevant += 1;
            total += relevant as f64 / (i + 1) as f64;
        }
    }
    if relevant == 0 {
        0.0
    } else {
        total / relevant as f64
    }
}

/// Matches in the first `k` categories over a fixed denominator `k`.
fn precision_at_k(ranking: &[&str], category: &str, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = ranking.iter().take(k).filter(|c| **c == category).count();
    hits as f64 / k as f64
}

fn is_evaluated_category(category: &str) -> bool {
    !category.is_empty() && !category.contains(well_known::UNCLASSIFIED_CATEGORY)
}

/// Scores how well neighbourhoods in the embedding respect `categories`.
///
/// `categories` maps codes to category names; empty and unclassified
/// categories are ignored.
pub fn evaluate_concepts<E>(
    embedding: &E,
    categories: &BTreeMap<String, String>,
    config: &ConceptEvalConfig,
) -> ConceptEvalReport
where
    E: ConceptEmbedding + ?Sized,
{
    let category_of = |concept: &str| -> Option<&str> {
        let coded = CodedConcept::parse(concept)?;
        categories.get(&coded.code).map(String::as_str)
    };

    let candidates: Vec<(&ConceptId, &str)> = embedding
        .vocabulary()
        .iter()
        .filter_map(|concept| {
            let coded = CodedConcept::parse(concept)?;
            if !coded.is_system(config.system) {
                return None;
            }
            let category = categories.get(&coded.code)?;
            is_evaluated_category(category).then_some((concept, category.as_str()))
        })
        .collect();

    let score = |(concept, category): &(&ConceptId, &str)| -> (f64, f64) {
        let neighbors = embedding
            .nearest_neighbors(concept, config.knn.saturating_mul(4))
            .unwrap_or_default();
        let ranking: Vec<&str> = neighbors
            .iter()
            .filter_map(|n| category_of(&n.concept))
            .take(config.knn)
            .collect();
        (
            average_precision(&ranking, category),
            precision_at_k(&ranking, category, config.precision_at),
        )
    };

    #[cfg(feature = "parallel")]
    let scores: Vec<(f64, f64)> = candidates.par_iter().map(score).collect();
    #[cfg(not(feature = "parallel"))]
    let scores: Vec<(f64, f64)> = candidates.iter().map(score).collect();

    if scores.is_empty() {
        tracing::warn!("No coded concept with a category to evaluate");
        return ConceptEvalReport::default();
    }

    let count = scores.len() as f64;
    let mean = |sum: f64| round_to(sum / count, well_known::METRIC_PRECISION);
    let report = ConceptEvalReport {
        map: mean(scores.iter().map(|s| s.0).sum()),
        precision_at_n: mean(scores.iter().map(|s| s.1).sum()),
        evaluated: scores.len(),
    };
    tracing::info!(
        "Evaluation on {} codes: MAP = {:.3}, P@{} = {:.3}",
        report.evaluated,
        report.map,
        config.precision_at,
        report.precision_at_n
    );
    report
}
