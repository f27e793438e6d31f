//! Concept embedding provider capability.
//!
//! The pipeline only depends on [`ConceptEmbedding`]: vector lookup,
//! nearest-neighbour queries, vocabulary enumeration and dimensionality.
//! How the vectors were trained is not this crate's concern.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::ArrayView1;
use phe2vec_types::ConceptId;

use crate::keyed_vectors::KeyedVectors;
use crate::types::{Phe2VecError, Phe2VecResult};

/// A concept returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Neighbor {
    /// Neighbouring concept.
    pub concept: ConceptId,
    /// Cosine similarity to the query.
    pub similarity: f64,
}

/// Read-only access to pre-trained concept vectors.
///
/// Implementations must be shareable across threads; phenotype evaluations
/// query the provider concurrently without synchronisation.
pub trait ConceptEmbedding: Send + Sync {
    /// Vector dimensionality.
    fn dimension(&self) -> usize;

    /// All concepts, in a stable order.
    fn vocabulary(&self) -> &[ConceptId];

    /// Vector of a concept, or `None` if it is not in the vocabulary.
    fn vector_of(&self, concept: &str) -> Option<ArrayView1<'_, f64>>;

    /// Concepts most similar to the given vector, by descending cosine similarity.
    fn nearest_to_vector(&self, vector: ArrayView1<'_, f64>, topn: usize) -> Vec<Neighbor>;

    /// Returns true if the concept is in the vocabulary.
    fn contains(&self, concept: &str) -> bool {
        self.vector_of(concept).is_some()
    }

    /// Concepts most similar to a vocabulary concept, excluding the concept itself.
    ///
    /// Returns `None` if the concept is not in the vocabulary.
    fn nearest_neighbors(&self, concept: &str, topn: usize) -> Option<Vec<Neighbor>> {
        let vector = self.vector_of(concept)?;
        let mut neighbors = self.nearest_to_vector(vector, topn.saturating_add(1));
        neighbors.retain(|n| n.concept != concept);
        neighbors.truncate(topn);
        Some(neighbors)
    }
}

/// Embedding algorithm that produced a concept vector file.
///
/// All backends export the word2vec text format, so loading is shared; the
/// backend name is carried into artifact file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmbeddingBackend {
    /// Skip-gram word2vec.
    #[default]
    Word2Vec,
    /// Sub-word fastText.
    FastText,
    /// Co-occurrence GloVe.
    Glove,
}

impl EmbeddingBackend {
    /// Lower-case name used in file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Word2Vec => "word2vec",
            Self::FastText => "fasttext",
            Self::Glove => "glove",
        }
    }

    /// Loads concept vectors exported by this backend.
    pub fn load<P: AsRef<Path>>(self, path: P) -> Phe2VecResult<KeyedVectors> {
        tracing::info!(backend = self.name(), "Loading concept vectors");
        KeyedVectors::load_text(path)
    }

    /// File name of a persisted patient embedding.
    pub fn patient_embedding_file_name(self, dimension: usize, length: u32, step: u32) -> String {
        format!(
            "{}-patient-embedding-{}-{}-{}.csv",
            self.name(),
            dimension,
            length,
            step
        )
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmbeddingBackend {
    type Err = Phe2VecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word2vec" => Ok(Self::Word2Vec),
            "fasttext" => Ok(Self::FastText),
            "glove" => Ok(Self::Glove),
            _ => Err(Phe2VecError::UnknownBackend {
                name: s.to_string(),
            }),
        }
    }
}
