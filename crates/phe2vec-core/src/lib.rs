//! # phe2vec-core
//!
//! Patient representations from longitudinal clinical events, and disease
//! cohort retrieval over them.
//!
//! ## Pipeline
//!
//! 1. [`TemporalWindower`] cuts each patient timeline into sentences of
//!    co-occurring concepts.
//! 2. [`ConceptWeighter`] measures how common each concept is across the
//!    population, removes stop-concepts and down-weights the rest.
//! 3. [`PatientEmbedder`] averages standardised, weighted concept vectors
//!    into one vector per sentence.
//! 4. [`EmbeddingDenoiser`] removes the first principal direction.
//! 5. [`PhenotypeQueryExpander`] turns seed concepts into query vectors.
//! 6. [`CohortRetriever`] ranks patients by distance to the query.
//! 7. [`RetrievalEvaluator`] scores rankings against ground-truth cohorts.
//!
//! Concept vectors are read through the [`ConceptEmbedding`] trait;
//! [`KeyedVectors`] is the in-memory implementation loaded from the word2vec
//! text format.
//!
//! ## Features
//!
//! - `parallel` (default): windows patients and evaluates phenotypes with
//!   rayon. Results are identical with the feature off.
//!
//! ## Usage
//!
//! ```rust
//! use phe2vec_core::{
//!     patient_embedding, CohortRetriever, ConceptEmbedding, ExpansionConfig, KeyedVectors,
//!     PhenotypeQueryExpander, PipelineConfig,
//! };
//! use phe2vec_types::{ClinicalEvent, PatientTimeline};
//!
//! let vectors = KeyedVectors::from_entries(vec![
//!     ("icd9::asthma::493.90".to_string(), vec![1.0, 0.1, 0.0]),
//!     ("icd9::wheezing::786.07".to_string(), vec![0.9, 0.2, 0.1]),
//!     ("icd9::fracture::829.0".to_string(), vec![0.0, 0.2, 1.0]),
//! ])?;
//!
//! let timelines = vec![
//!     PatientTimeline::new("p1", vec![ClinicalEvent::new("icd9::asthma::493.90", 100)]),
//!     PatientTimeline::new("p2", vec![ClinicalEvent::new("icd9::fracture::829.0", 40)]),
//!     PatientTimeline::new("p3", vec![ClinicalEvent::new("icd9::wheezing::786.07", 7)]),
//! ];
//!
//! let outcome = patient_embedding(&timelines, &vectors, &PipelineConfig::default())?;
//! assert_eq!(outcome.embeddings.dimension(), vectors.dimension());
//!
//! let expander = PhenotypeQueryExpander::new(ExpansionConfig::seeds_only());
//! let seeds = ["icd9::asthma::493.90".to_string()];
//! if let Some(query) = expander.expand(&vectors, "asthma", &seeds) {
//!     let ranked = CohortRetriever::new(&outcome.embeddings).rank(&query);
//!     assert_eq!(ranked.len(), 3);
//! }
//! # Ok::<(), phe2vec_core::Phe2VecError>(())
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod concept_eval;
pub mod denoiser;
pub mod embedder;
pub mod embedding;
pub mod evaluator;
pub mod io;
pub mod keyed_vectors;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod retriever;
pub mod types;
pub mod weighter;
pub mod windower;

// Re-export commonly used items
pub use catalog::{CodedVocabulary, PhenotypeCatalog, PhenotypeRow};
pub use concept_eval::{evaluate_concepts, ConceptEvalConfig, ConceptEvalReport};
pub use denoiser::EmbeddingDenoiser;
pub use embedder::{standardize, PatientEmbedder};
pub use embedding::{PatientEmbeddingMatrix, PatientIndex};
pub use evaluator::{
    EvaluationReport, PhenotypeMetrics, RetrievalEvaluator, SkipReason, SkippedPhenotype,
};
pub use keyed_vectors::KeyedVectors;
pub use pipeline::{patient_embedding, PatientEmbeddingOutcome, PipelineConfig};
pub use provider::{ConceptEmbedding, EmbeddingBackend, Neighbor};
pub use query::{ExpandedQuery, PhenotypeQueryExpander};
pub use retriever::{cosine_distances, CohortRetriever};
pub use types::{
    DenoiseConfig, EmbeddingStats, EvaluationConfig, ExpansionConfig, Phe2VecError, Phe2VecResult,
    WindowConfig,
};
pub use weighter::{ConceptWeighter, ConceptWeights, FilteredCorpus, SentenceCorpus};
pub use windower::{TemporalWindower, Window, WindowState};

// Re-export phe2vec-types for convenience
pub use phe2vec_types;
