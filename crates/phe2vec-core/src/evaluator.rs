//! Cohort retrieval evaluation against ground-truth cohorts.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use phe2vec_types::{well_known, CohortCatalog, ConceptId, GroundTruthCohort, RankedResult};

use crate::metrics;
use crate::provider::ConceptEmbedding;
use crate::query::PhenotypeQueryExpander;
use crate::retriever::CohortRetriever;
use crate::types::EvaluationConfig;

/// Retrieval metrics of one phenotype, rounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhenotypeMetrics {
    /// Precision of the thresholded predictions.
    pub precision: f64,
    /// Recall of the thresholded predictions.
    pub recall: f64,
    /// F1 of the thresholded predictions.
    pub f1: f64,
    /// Hits in the top ranks over a fixed denominator.
    pub precision_at_n: f64,
    /// Precision at the cohort size.
    pub r_precision: f64,
    /// Mean average precision of the ranking.
    pub map: f64,
    /// Area under the ROC curve of the probabilities.
    pub auc_roc: f64,
    /// Average precision of the thresholded predictions.
    pub auc_pr: f64,
}

impl PhenotypeMetrics {
    fn values(&self) -> [f64; 8] {
        [
            self.precision,
            self.recall,
            self.f1,
            self.precision_at_n,
            self.r_precision,
            self.map,
            self.auc_roc,
            self.auc_pr,
        ]
    }

    fn from_values(v: [f64; 8]) -> Self {
        Self {
            precision: v[0],
            recall: v[1],
            f1: v[2],
            precision_at_n: v[3],
            r_precision: v[4],
            map: v[5],
            auc_roc: v[6],
            auc_pr: v[7],
        }
    }
}

/// Why a phenotype was not evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// None of the seed concepts is in the vocabulary.
    NoUsableQuery {
        /// Seeds missing from the vocabulary.
        missing_seeds: Vec<ConceptId>,
    },
    /// No patient could be ranked.
    EmptyRanking,
}

/// A phenotype left out of the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPhenotype {
    /// Phenotype label.
    pub phenotype: String,
    /// Why it was skipped.
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Metrics of every evaluated phenotype and the phenotypes skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Metrics by phenotype label.
    pub per_phenotype: BTreeMap<String, PhenotypeMetrics>,
    /// Phenotypes not evaluated, in label order.
    pub skipped: Vec<SkippedPhenotype>,
    /// Mean of each metric over evaluated phenotypes, `None` when none was.
    #[serde(default)]
    pub summary: Option<PhenotypeMetrics>,
    /// Decimal places used for the averages.
    #[serde(skip, default = "default_decimals")]
    decimals: i32,
}

fn default_decimals() -> i32 {
    well_known::METRIC_PRECISION
}

impl Default for EvaluationReport {
    fn default() -> Self {
        Self {
            per_phenotype: BTreeMap::new(),
            skipped: Vec::new(),
            summary: None,
            decimals: default_decimals(),
        }
    }
}

impl EvaluationReport {
    /// Mean of each metric over evaluated phenotypes.
    ///
    /// Returns `None` if no phenotype was evaluated.
    pub fn average(&self) -> Option<PhenotypeMetrics> {
        if self.per_phenotype.is_empty() {
            return None;
        }
        let count = self.per_phenotype.len() as f64;
        let mut sums = [0.0; 8];
        for metrics in self.per_phenotype.values() {
            for (sum, value) in sums.iter_mut().zip(metrics.values()) {
                *sum += value;
            }
        }
        Some(PhenotypeMetrics::from_values(
            sums.map(|s| metrics::round_to(s / count, self.decimals)),
        ))
    }
}

enum Outcome {
    Evaluated(PhenotypeMetrics),
    Skipped(SkipReason),
}

/// Scores rankings against ground-truth cohorts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalEvaluator {
    config: EvaluationConfig,
}

impl RetrievalEvaluator {
    /// Creates an evaluator.
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Returns the evaluation configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Probability of each ranked patient, `exp(-distance)` rounded.
    pub fn probabilities(&self, ranked: &RankedResult) -> Vec<f64> {
        ranked
            .patients
            .iter()
            .map(|p| metrics::round_to((-p.distance).exp(), self.config.decimals))
            .collect()
    }

    /// Metrics of one ranking against its cohort.
    ///
    /// Cohort members absent from the ranking still count in the ranking
    /// metrics but have no entry in the thresholded vectors.
    pub fn evaluate(&self, ranked: &RankedResult, cohort: &GroundTruthCohort) -> PhenotypeMetrics {
        let ranking = ranked.patient_ids();
        let probabilities = self.probabilities(ranked);
        let truth: Vec<bool> = ranking.iter().map(|p| cohort.contains(p)).collect();
        let predicted: Vec<bool> = probabilities
            .iter()
            .map(|&p| p > self.config.threshold)
            .collect();
        let predicted_scores: Vec<f64> = predicted
            .iter()
            .map(|&p| if p { 1.0 } else { 0.0 })
            .collect();

        let unranked = cohort.len().saturating_sub(truth.iter().filter(|&&t| t).count());
        if unranked > 0 {
            tracing::warn!(
                phenotype = %ranked.phenotype,
                unranked,
                "Cohort patients missing from the ranking"
            );
        }

        let round = |v: f64| metrics::round_to(v, self.config.decimals);
        PhenotypeMetrics {
            precision: round(metrics::precision(&truth, &predicted)),
            recall: round(metrics::recall(&truth, &predicted)),
            f1: round(metrics::fscore(&truth, &predicted, 1.0)),
            precision_at_n: round(metrics::precision_at_n(
                &ranking,
                &cohort.patients,
                self.config.precision_at,
            )),
            r_precision: round(metrics::r_precision(&ranking, &cohort.patients)),
            map: round(metrics::maprec(&ranking, &cohort.patients)),
            auc_roc: round(metrics::auc_roc_or_neutral(&truth, &probabilities)),
            auc_pr: round(metrics::average_precision(&truth, &predicted_scores)),
        }
    }

    fn evaluate_one<E>(
        &self,
        embedding: &E,
        expander: &PhenotypeQueryExpander,
        retriever: &CohortRetriever<'_>,
        phenotype: &str,
        cohort: &GroundTruthCohort,
    ) -> Outcome
    where
        E: ConceptEmbedding + ?Sized,
    {
        let Some(query) = expander.expand(embedding, phenotype, &cohort.seed) else {
            return Outcome::Skipped(SkipReason::NoUsableQuery {
                missing_seeds: cohort.seed.clone(),
            });
        };
        let ranked = retriever.rank(&query);
        if ranked.is_empty() {
            return Outcome::Skipped(SkipReason::EmptyRanking);
        }
        Outcome::Evaluated(self.evaluate(&ranked, cohort))
    }

    /// Expands, ranks and scores every phenotype of a catalogue.
    ///
    /// Phenotypes are evaluated independently; those without a usable
    /// query are listed in [`EvaluationReport::skipped`].
    pub fn evaluate_phenotypes<E>(
        &self,
        embedding: &E,
        expander: &PhenotypeQueryExpander,
        retriever: &CohortRetriever<'_>,
        cohorts: &CohortCatalog,
    ) -> EvaluationReport
    where
        E: ConceptEmbedding + ?Sized,
    {
        let entries: Vec<(&String, &GroundTruthCohort)> = cohorts.iter().collect();
        let run = |(phenotype, cohort): &(&String, &GroundTruthCohort)| {
            (
                (*phenotype).clone(),
                self.evaluate_one(embedding, expander, retriever, phenotype, cohort),
            )
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<(String, Outcome)> = entries.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<(String, Outcome)> = entries.iter().map(run).collect();

        let mut report = EvaluationReport {
            decimals: self.config.decimals,
            ..Default::default()
        };
        for (phenotype, outcome) in outcomes {
            match outcome {
                Outcome::Evaluated(metrics) => {
                    tracing::debug!(phenotype = %phenotype, ?metrics, "Evaluated phenotype");
                    report.per_phenotype.insert(phenotype, metrics);
                }
                Outcome::Skipped(reason) => {
                    tracing::warn!(phenotype = %phenotype, ?reason, "Phenotype skipped");
                    report.skipped.push(SkippedPhenotype { phenotype, reason });
                }
            }
        }
        report.summary = report.average();

        tracing::info!(
            "Evaluated {} phenotypes, skipped {}",
            report.per_phenotype.len(),
            report.skipped.len()
        );
        report
    }
}
