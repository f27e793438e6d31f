//! Clinical events and patient timelines.

use crate::{ConceptId, PatientId};

/// A single clinical concept observed at a given patient age.
///
/// # Examples
///
/// ```
/// use phe2vec_types::ClinicalEvent;
///
/// let event = ClinicalEvent::new("icd9::asthma::493.90", 7300);
/// assert_eq!(event.age_in_days, 7300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClinicalEvent {
    /// The observed concept.
    pub concept: ConceptId,
    /// Patient age, in days, when the concept was recorded.
    pub age_in_days: u32,
}

impl ClinicalEvent {
    /// Creates a new event.
    pub fn new(concept: impl Into<ConceptId>, age_in_days: u32) -> Self {
        Self {
            concept: concept.into(),
            age_in_days,
        }
    }
}

/// The chronologically ordered events of one patient.
///
/// Events are expected to be non-decreasing by age. Use
/// [`PatientTimeline::sort_chronologically`] when the source order is not
/// guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatientTimeline {
    /// Owning patient.
    pub patient_id: PatientId,
    /// Events ordered by age.
    pub events: Vec<ClinicalEvent>,
}

impl PatientTimeline {
    /// Creates a timeline from already ordered events.
    pub fn new(patient_id: impl Into<PatientId>, events: Vec<ClinicalEvent>) -> Self {
        Self {
            patient_id: patient_id.into(),
            events,
        }
    }

    /// Returns true if the timeline holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if events are non-decreasing by age.
    pub fn is_chronological(&self) -> bool {
        self.events
            .windows(2)
            .all(|pair| pair[0].age_in_days <= pair[1].age_in_days)
    }

    /// Sorts events by age, keeping the relative order of same-day events.
    pub fn sort_chronologically(&mut self) {
        self.events.sort_by_key(|e| e.age_in_days);
    }

    /// Ages of all events, in timeline order.
    pub fn ages(&self) -> Vec<u32> {
        self.events.iter().map(|e| e.age_in_days).collect()
    }
}
