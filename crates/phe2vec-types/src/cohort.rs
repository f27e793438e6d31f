//! Ground-truth phenotype cohorts.

use std::collections::{BTreeMap, BTreeSet};

use crate::{ConceptId, PatientId};

/// A disease cohort used to evaluate retrieval.
///
/// The seed concepts define the phenotype query; the patients are the
/// known positive cases.
///
/// # Examples
///
/// ```
/// use phe2vec_types::GroundTruthCohort;
///
/// let cohort = GroundTruthCohort::new(
///     vec!["icd9::type 2 diabetes::250.00".to_string()],
///     ["p1", "p7"].iter().map(|p| p.to_string()),
/// );
/// assert!(cohort.contains("p7"));
/// assert_eq!(cohort.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroundTruthCohort {
    /// Seed concepts defining the phenotype query.
    pub seed: Vec<ConceptId>,
    /// Known positive patients.
    pub patients: BTreeSet<PatientId>,
}

impl GroundTruthCohort {
    /// Creates a cohort from seed concepts and positive patients.
    pub fn new(seed: Vec<ConceptId>, patients: impl IntoIterator<Item = PatientId>) -> Self {
        Self {
            seed,
            patients: patients.into_iter().collect(),
        }
    }

    /// Returns true if the patient is a known positive.
    pub fn contains(&self, patient_id: &str) -> bool {
        self.patients.contains(patient_id)
    }

    /// Number of positive patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    /// Returns true if the cohort has no positive patients.
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

/// Cohorts keyed by phenotype label, iterated in label order.
pub type CohortCatalog = BTreeMap<String, GroundTruthCohort>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_dedups_patients() {
        let cohort = GroundTruthCohort::new(
            vec!["seed".to_string()],
            ["p1", "p1", "p2"].iter().map(|p| p.to_string()),
        );
        assert_eq!(cohort.len(), 2);
        assert!(!cohort.is_empty());
        assert!(!cohort.contains("p3"));
    }
}
