//! End-to-end patient embedding.

use phe2vec_types::{PatientId, PatientTimeline};

use crate::denoiser::EmbeddingDenoiser;
use crate::embedder::PatientEmbedder;
use crate::embedding::PatientEmbeddingMatrix;
use crate::provider::{ConceptEmbedding, EmbeddingBackend};
use crate::types::{DenoiseConfig, EmbeddingStats, Phe2VecError, Phe2VecResult, WindowConfig};
use crate::weighter::{ConceptWeighter, SentenceCorpus};
use crate::windower::TemporalWindower;

/// Configuration of the patient embedding pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    /// Windowing of timelines into sentences.
    pub window: WindowConfig,
    /// Concept weighting.
    pub weighting: ConceptWeighter,
    /// Principal-component removal.
    pub denoise: DenoiseConfig,
    /// Algorithm that produced the concept vectors.
    pub backend: EmbeddingBackend,
}

/// Denoised patient embeddings and what was left out along the way.
#[derive(Debug, Clone)]
pub struct PatientEmbeddingOutcome {
    /// One row per kept sentence.
    pub embeddings: PatientEmbeddingMatrix,
    /// Counts collected by each stage.
    pub stats: EmbeddingStats,
    /// Patients with no event.
    pub empty_timelines: Vec<PatientId>,
    /// Patients left without a sentence.
    pub dropped_patients: Vec<PatientId>,
}

/// Windows, weights, embeds and denoises a patient population.
///
/// # Errors
/// Returns an error if the window configuration is invalid, the concept
/// vocabulary is empty, or no patient has an event.
pub fn patient_embedding<E>(
    timelines: &[PatientTimeline],
    embedding: &E,
    config: &PipelineConfig,
) -> Phe2VecResult<PatientEmbeddingOutcome>
where
    E: ConceptEmbedding + ?Sized,
{
    let windower = TemporalWindower::new(config.window)?;
    if embedding.vocabulary().is_empty() {
        return Err(Phe2VecError::EmptyVocabulary);
    }

    tracing::info!(
        length = config.window.length,
        step = config.window.step,
        "Creating patient sentences"
    );
    let corpus = SentenceCorpus::build(timelines, &windower, embedding);
    if corpus.population() == 0 {
        return Err(Phe2VecError::EmptyPopulation);
    }

    let weights = config.weighting.compute(&corpus, embedding.vocabulary());
    let filtered = weights.filter(&corpus);

    let mut embeddings = PatientEmbedder::new(embedding, &weights).embed(&filtered)?;
    EmbeddingDenoiser::new(config.denoise).denoise(&mut embeddings);

    let stats = EmbeddingStats {
        total_patients: timelines.len(),
        empty_timelines: corpus.empty_timelines().len(),
        raw_sentences: corpus.sentence_count(),
        sentences: embeddings.rows(),
        stop_concepts: weights.stop_concepts().len(),
        dropped_patients: filtered.dropped_patients.len(),
        embedded_patients: embeddings.patient_index().len(),
    };
    tracing::info!(
        "Embedded {} of {} patients ({:.1}%) in {} sentences",
        stats.embedded_patients,
        stats.total_patients,
        stats.coverage(),
        stats.sentences
    );

    Ok(PatientEmbeddingOutcome {
        embeddings,
        stats,
        empty_timelines: corpus.empty_timelines().to_vec(),
        dropped_patients: filtered.dropped_patients,
    })
}
