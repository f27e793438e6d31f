//! Patient sentences.
//!
//! A sentence is the set of concepts active in one time window of a
//! patient's timeline. `BTreeSet` collapses duplicates and gives a stable
//! iteration order, which keeps downstream embeddings reproducible.

use std::collections::BTreeSet;

use crate::{ConceptId, PatientId};

/// The concepts co-occurring within one time window.
pub type Sentence = BTreeSet<ConceptId>;

/// All sentences of one patient, in window order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatientSentences {
    /// Owning patient.
    pub patient_id: PatientId,
    /// Sentences in window order.
    pub sentences: Vec<Sentence>,
}

impl PatientSentences {
    /// Creates a new sentence list for a patient.
    pub fn new(patient_id: impl Into<PatientId>, sentences: Vec<Sentence>) -> Self {
        Self {
            patient_id: patient_id.into(),
            sentences,
        }
    }

    /// Returns true if any sentence contains the concept.
    pub fn mentions(&self, concept: &str) -> bool {
        self.sentences.iter().any(|s| s.contains(concept))
    }

    /// Distinct concepts across all sentences.
    pub fn concepts(&self) -> BTreeSet<&ConceptId> {
        self.sentences.iter().flat_map(|s| s.iter()).collect()
    }
}
