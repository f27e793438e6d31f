//! Ranked retrieval results.

use crate::PatientId;

/// A patient and its aggregated distance to a phenotype query.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedPatient {
    /// The ranked patient.
    pub patient_id: PatientId,
    /// Cosine distance to the query; smaller is closer.
    pub distance: f64,
}

/// Patients ranked by ascending distance for one phenotype.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedResult {
    /// Phenotype label the ranking was produced for.
    pub phenotype: String,
    /// Patients, closest first.
    pub patients: Vec<RankedPatient>,
}

impl RankedResult {
    /// Number of ranked patients.
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    /// Returns true if nothing was ranked.
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Patient identifiers in rank order.
    pub fn patient_ids(&self) -> Vec<&PatientId> {
        self.patients.iter().map(|p| &p.patient_id).collect()
    }

    /// Distances in rank order.
    pub fn distances(&self) -> Vec<f64> {
        self.patients.iter().map(|p| p.distance).collect()
    }

    /// Position of a patient in the ranking, if present.
    pub fn position_of(&self, patient_id: &str) -> Option<usize> {
        self.patients.iter().position(|p| p.patient_id == patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_result_accessors() {
        let result = RankedResult {
            phenotype: "asthma".to_string(),
            patients: vec![
                RankedPatient {
                    patient_id: "p2".to_string(),
                    distance: 0.1,
                },
                RankedPatient {
                    patient_id: "p1".to_string(),
                    distance: 0.4,
                },
            ],
        };

        assert_eq!(result.len(), 2);
        assert_eq!(result.patient_ids(), vec!["p2", "p1"]);
        assert_eq!(result.distances(), vec![0.1, 0.4]);
        assert_eq!(result.position_of("p1"), Some(1));
        assert_eq!(result.position_of("p9"), None);
    }
}
