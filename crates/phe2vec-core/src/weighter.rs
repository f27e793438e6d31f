//! Population-wide concept weighting and stop-concept removal.
//!
//! The commonness of a concept is the fraction of patients with at least one
//! sentence containing it. Concepts above the stop threshold are removed
//! from every sentence; the others are down-weighted by `a / (a + p)`.

use std::collections::{BTreeSet, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use phe2vec_types::{well_known, ConceptId, PatientId, PatientSentences, PatientTimeline, Sentence};

use crate::provider::ConceptEmbedding;
use crate::windower::TemporalWindower;

/// Sentences of every patient, restricted to vocabulary concepts.
#[derive(Debug, Clone, Default)]
pub struct SentenceCorpus {
    /// Patients with a non-empty timeline, in input order.
    patients: Vec<PatientSentences>,
    /// Distinct patients whose sentences contain each concept.
    patient_counts: HashMap<ConceptId, usize>,
    /// Patients whose timeline had no events.
    empty_timelines: Vec<PatientId>,
}

impl SentenceCorpus {
    /// Windows every timeline and keeps vocabulary concepts only.
    ///
    /// Patients with an empty timeline are set aside and do not count
    /// towards the population.
    pub fn build<E>(
        timelines: &[PatientTimeline],
        windower: &TemporalWindower,
        embedding: &E,
    ) -> Self
    where
        E: ConceptEmbedding + ?Sized,
    {
        let window = |timeline: &PatientTimeline| -> Option<PatientSentences> {
            if timeline.is_empty() {
                return None;
            }
            let sentences = windower.sentences_filtered(timeline, |c| embedding.contains(c));
            Some(PatientSentences::new(timeline.patient_id.clone(), sentences))
        };

        #[cfg(feature = "parallel")]
        let windowed: Vec<Option<PatientSentences>> = timelines.par_iter().map(window).collect();
        #[cfg(not(feature = "parallel"))]
        let windowed: Vec<Option<PatientSentences>> = timelines.iter().map(window).collect();

        let mut corpus = Self::default();
        for (timeline, patient) in timelines.iter().zip(windowed) {
            match patient {
                Some(patient) => corpus.push(patient),
                None => corpus.empty_timelines.push(timeline.patient_id.clone()),
            }
        }

        tracing::info!(
            "Created {} clinical sentences for {} patients",
            corpus.sentence_count(),
            corpus.population()
        );
        if !corpus.empty_timelines.is_empty() {
            tracing::warn!("{} patients have no events", corpus.empty_timelines.len());
        }
        corpus
    }

    /// Adds one patient's sentences and updates concept patient counts.
    pub fn push(&mut self, patient: PatientSentences) {
        for concept in patient.concepts() {
            *self.patient_counts.entry(concept.clone()).or_insert(0) += 1;
        }
        self.patients.push(patient);
    }

    /// Number of patients with a non-empty timeline.
    pub fn population(&self) -> usize {
        self.patients.len()
    }

    /// Number of sentences across all patients.
    pub fn sentence_count(&self) -> usize {
        self.patients.iter().map(|p| p.sentences.len()).sum()
    }

    /// Number of distinct patients whose sentences contain the concept.
    pub fn patient_count(&self, concept: &str) -> usize {
        self.patient_counts.get(concept).copied().unwrap_or(0)
    }

    /// Patients in input order.
    pub fn patients(&self) -> &[PatientSentences] {
        &self.patients
    }

    /// Patients whose timeline had no events.
    pub fn empty_timelines(&self) -> &[PatientId] {
        &self.empty_timelines
    }
}

/// Computes concept commonness and weights over a sentence corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConceptWeighter {
    /// Concepts with a probability above this value are stop-concepts.
    pub stop_threshold: f64,
    /// Smoothing constant `a`.
    pub smoothing: f64,
}

impl Default for ConceptWeighter {
    fn default() -> Self {
        Self {
            stop_threshold: well_known::STOP_CONCEPT_PROBABILITY,
            smoothing: well_known::WEIGHT_SMOOTHING,
        }
    }
}

impl ConceptWeighter {
    /// Computes the probability of every vocabulary concept.
    ///
    /// Concepts never seen in the corpus get probability zero.
    pub fn compute(&self, corpus: &SentenceCorpus, vocabulary: &[ConceptId]) -> ConceptWeights {
        let population = corpus.population();
        let probabilities: HashMap<ConceptId, f64> = vocabulary
            .iter()
            .map(|concept| {
                let p = if population == 0 {
                    0.0
                } else {
                    corpus.patient_count(concept) as f64 / population as f64
                };
                (concept.clone(), p)
            })
            .collect();

        let stop_concepts: BTreeSet<ConceptId> = probabilities
            .iter()
            .filter(|(_, p)| **p > self.stop_threshold)
            .map(|(c, _)| c.clone())
            .collect();

        tracing::info!(
            "Weighted {} concepts over {} patients; {} stop-concepts",
            probabilities.len(),
            population,
            stop_concepts.len()
        );

        ConceptWeights {
            probabilities,
            stop_concepts,
            smoothing: self.smoothing,
        }
    }
}

/// Per-concept commonness probabilities, weights and stop-concepts.
#[derive(Debug, Clone, Default)]
pub struct ConceptWeights {
    probabilities: HashMap<ConceptId, f64>,
    stop_concepts: BTreeSet<ConceptId>,
    smoothing: f64,
}

impl ConceptWeights {
    /// Fraction of patients whose sentences contain the concept.
    pub fn probability(&self, concept: &str) -> Option<f64> {
        self.probabilities.get(concept).copied()
    }

    /// Smoothed weight `a / (a + p)`, or `None` for unknown concepts.
    pub fn weight(&self, concept: &str) -> Option<f64> {
        self.probability(concept)
            .map(|p| self.smoothing / (self.smoothing + p))
    }

    /// Returns true if the concept is removed from sentences.
    pub fn is_stop_concept(&self, concept: &str) -> bool {
        self.stop_concepts.contains(concept)
    }

    /// All stop-concepts, sorted.
    pub fn stop_concepts(&self) -> &BTreeSet<ConceptId> {
        &self.stop_concepts
    }

    /// Removes stop-concepts from every sentence.
    ///
    /// Sentences left empty are dropped; patients left without sentences
    /// are reported in [`FilteredCorpus::dropped_patients`].
    pub fn filter(&self, corpus: &SentenceCorpus) -> FilteredCorpus {
        let mut filtered = FilteredCorpus::default();

        for patient in corpus.patients() {
            let sentences: Vec<Sentence> = patient
                .sentences
                .iter()
                .map(|s| {
                    s.iter()
                        .filter(|c| !self.is_stop_concept(c))
                        .cloned()
                        .collect::<Sentence>()
                })
                .filter(|s| !s.is_empty())
                .collect();

            if sentences.is_empty() {
                filtered.dropped_patients.push(patient.patient_id.clone());
            } else {
                filtered
                    .patients
                    .push(PatientSentences::new(patient.patient_id.clone(), sentences));
            }
        }

        if !filtered.dropped_patients.is_empty() {
            tracing::warn!(
                "{} patients have no sentences left after stop-concept removal",
                filtered.dropped_patients.len()
            );
        }
        filtered
    }
}

/// Sentences after stop-concept removal.
#[derive(Debug, Clone, Default)]
pub struct FilteredCorpus {
    /// Patients with at least one sentence, in input order.
    pub patients: Vec<PatientSentences>,
    /// Patients left with no sentence.
    pub dropped_patients: Vec<PatientId>,
}

impl FilteredCorpus {
    /// Number of sentences across all patients.
    pub fn sentence_count(&self) -> usize {
        self.patients.iter().map(|p| p.sentences.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyed_vectors::KeyedVectors;
    use crate::types::WindowConfig;
    use approx::assert_abs_diff_eq;
    use phe2vec_types::ClinicalEvent;

    fn sentence(concepts: &[&str]) -> Sentence {
        concepts.iter().map(|c| c.to_string()).collect()
    }

    fn vocabulary(concepts: &[&str]) -> Vec<ConceptId> {
        concepts.iter().map(|c| c.to_string()).collect()
    }

    fn corpus_of(patients: Vec<(&str, Vec<Sentence>)>) -> SentenceCorpus {
        let mut corpus = SentenceCorpus::default();
        for (id, sentences) in patients {
            corpus.push(PatientSentences::new(id, sentences));
        }
        corpus
    }

    #[test]
    fn test_probability_counts_patients_not_occurrences() {
        let corpus = corpus_of(vec![
            ("p1", vec![sentence(&["x"]), sentence(&["x", "y"]), sentence(&["x"])]),
            ("p2", vec![sentence(&["z"])]),
        ]);
        let weights =
            ConceptWeighter::default().compute(&corpus, &vocabulary(&["x", "y", "z", "w"]));

        assert_abs_diff_eq!(weights.probability("x").unwrap(), 0.5);
        assert_abs_diff_eq!(weights.probability("y").unwrap(), 0.5);
        assert_abs_diff_eq!(weights.probability("w").unwrap(), 0.0);
        assert!(weights.probability("unknown").is_none());
        for c in ["x", "y", "z", "w"] {
            let p = weights.probability(c).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
        // p == 0.5 is not above the threshold
        assert!(weights.stop_concepts().is_empty());
    }

    #[test]
    fn test_ubiquitous_concept_is_removed_everywhere() {
        let corpus = corpus_of(vec![
            ("p1", vec![sentence(&["x", "a"]), sentence(&["x"])]),
            ("p2", vec![sentence(&["x", "b"])]),
        ]);
        let weights = ConceptWeighter::default().compute(&corpus, &vocabulary(&["x", "a", "b"]));
        assert!(weights.is_stop_concept("x"));
        assert_abs_diff_eq!(weights.weight("x").unwrap(), 0.5);

        let filtered = weights.filter(&corpus);
        assert_eq!(filtered.sentence_count(), 2);
        for patient in &filtered.patients {
            for s in &patient.sentences {
                assert!(!s.contains("x"));
            }
        }
        assert!(filtered.dropped_patients.is_empty());
    }

    #[test]
    fn test_rare_concept_weight() {
        // y in 1 of 10 patients
        let mut patients = vec![("p0", vec![sentence(&["y"])])];
        let ids = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9"];
        for id in ids {
            patients.push((id, vec![sentence(&["other"])]));
        }
        let corpus = corpus_of(patients);
        let weights = ConceptWeighter::default().compute(&corpus, &vocabulary(&["y", "other"]));

        assert_abs_diff_eq!(weights.probability("y").unwrap(), 0.1);
        assert_abs_diff_eq!(weights.weight("y").unwrap(), 1.0 / 1.1, epsilon = 1e-12);
        assert!(!weights.is_stop_concept("y"));
        assert!(weights.is_stop_concept("other"));
    }

    #[test]
    fn test_patients_without_sentences_are_reported() {
        let corpus = corpus_of(vec![
            ("p1", vec![sentence(&["x"])]),
            ("p2", vec![sentence(&["x"])]),
            ("p3", vec![sentence(&["x", "rare"])]),
        ]);
        let weights = ConceptWeighter::default().compute(&corpus, &vocabulary(&["x", "rare"]));
        let filtered = weights.filter(&corpus);

        assert_eq!(filtered.dropped_patients, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(filtered.patients.len(), 1);
        assert_eq!(filtered.patients[0].sentences, vec![sentence(&["rare"])]);
    }

    #[test]
    fn test_build_corpus_drops_out_of_vocabulary_concepts() {
        let embedding = KeyedVectors::from_entries(vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        let windower = TemporalWindower::new(WindowConfig::new(15, 5)).unwrap();
        let timelines = vec![
            PatientTimeline::new(
                "p1",
                vec![ClinicalEvent::new("a", 0), ClinicalEvent::new("zzz", 2)],
            ),
            PatientTimeline::new("p2", vec![]),
            PatientTimeline::new("p3", vec![ClinicalEvent::new("zzz", 0)]),
        ];

        let corpus = SentenceCorpus::build(&timelines, &windower, &embedding);
        assert_eq!(corpus.population(), 2);
        assert_eq!(corpus.empty_timelines(), &["p2".to_string()]);
        assert_eq!(corpus.patients()[0].sentences, vec![sentence(&["a"])]);
        assert!(corpus.patients()[1].sentences.is_empty());
        assert_eq!(corpus.patient_count("a"), 1);
        assert_eq!(corpus.patient_count("zzz"), 0);
    }
}
