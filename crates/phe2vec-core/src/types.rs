//! Shared error, configuration and statistics types.

use thiserror::Error;

use phe2vec_types::well_known;

/// Errors that stop a batch run.
///
/// Recoverable conditions (a concept missing from the vocabulary, a
/// phenotype without a usable query, a single-class truth vector) are not
/// errors; they are handled where they occur and reported in results.
#[derive(Error, Debug)]
pub enum Phe2VecError {
    /// I/O error reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON reading or writing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Window length or step is zero.
    #[error("Invalid window parameters: length={length}, step={step} (both must be positive)")]
    InvalidWindow {
        /// Configured window length in days.
        length: u32,
        /// Configured window step in days.
        step: u32,
    },

    /// No patient has a usable timeline.
    #[error("No patient with a non-empty timeline was provided; check the events input")]
    EmptyPopulation,

    /// The concept embedding has no entries.
    #[error("Concept embedding vocabulary is empty; check the embedding file")]
    EmptyVocabulary,

    /// A vector does not have the expected dimension.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Malformed concept vector file.
    #[error("Invalid vector file at line {line}: {reason}")]
    InvalidVectorFile {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A tabular file does not start with the expected columns.
    #[error("Unexpected column at position {position}: expected '{expected}', found '{found}'")]
    UnexpectedColumn {
        /// 0-based column position.
        position: usize,
        /// Expected column name.
        expected: String,
        /// Found column name.
        found: String,
    },

    /// Embedding backend name not recognised.
    #[error("Unknown embedding backend: {name} (expected word2vec, fasttext or glove)")]
    UnknownBackend {
        /// The name that was given.
        name: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Generic parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for phe2vec operations.
pub type Phe2VecResult<T> = Result<T, Phe2VecError>;

/// Configuration of the temporal windowing of patient timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window length in days.
    pub length: u32,
    /// Cursor advance in days.
    pub step: u32,
    /// Isolated events closer than `merge_factor * length` days to the
    /// previous window are merged into it. `None` disables merging.
    pub merge_factor: Option<u32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: well_known::DEFAULT_WINDOW_LENGTH,
            step: well_known::DEFAULT_WINDOW_STEP,
            merge_factor: Some(well_known::DEFAULT_MERGE_FACTOR),
        }
    }
}

impl WindowConfig {
    /// Creates a config with the default merge factor.
    pub fn new(length: u32, step: u32) -> Self {
        Self {
            length,
            step,
            ..Default::default()
        }
    }

    /// Returns the same config with singleton merging disabled.
    pub fn without_merge(self) -> Self {
        Self {
            merge_factor: None,
            ..self
        }
    }

    /// Checks that length and step are positive.
    pub fn validate(&self) -> Phe2VecResult<()> {
        if self.length == 0 || self.step == 0 {
            return Err(Phe2VecError::InvalidWindow {
                length: self.length,
                step: self.step,
            });
        }
        Ok(())
    }
}

/// Configuration of phenotype query expansion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionConfig {
    /// Whether to add nearest neighbours of each seed.
    pub enabled: bool,
    /// Neighbours requested per seed.
    pub neighbors: usize,
    /// Neighbours must have a similarity strictly above this value.
    /// `None` keeps every neighbour returned.
    pub min_similarity: Option<f64>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self::cohort_retrieval()
    }
}

impl ExpansionConfig {
    /// Top-100 neighbours, unfiltered. Used to build the phenotype catalogue.
    pub fn phenotype_discovery() -> Self {
        Self {
            enabled: true,
            neighbors: well_known::DISCOVERY_NEIGHBORS,
            min_similarity: None,
        }
    }

    /// Top-500 neighbours with similarity above 0.7. Used for cohort retrieval.
    pub fn cohort_retrieval() -> Self {
        Self {
            enabled: true,
            neighbors: well_known::RETRIEVAL_NEIGHBORS,
            min_similarity: Some(well_known::RETRIEVAL_MIN_SIMILARITY),
        }
    }

    /// Seeds only, no expansion.
    pub fn seeds_only() -> Self {
        Self {
            enabled: false,
            neighbors: 0,
            min_similarity: None,
        }
    }

    /// Returns true if a neighbour with this similarity is kept.
    pub fn accepts(&self, similarity: f64) -> bool {
        match self.min_similarity {
            Some(threshold) => similarity > threshold,
            None => true,
        }
    }
}

/// Configuration of the principal-component removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenoiseConfig {
    /// Power iterations used to estimate the first principal direction.
    pub iterations: usize,
    /// Seed of the random starting vector.
    pub seed: u64,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            seed: 0,
        }
    }
}

/// Configuration of the retrieval evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationConfig {
    /// Probability above which a patient is predicted positive.
    pub threshold: f64,
    /// Cut-off for fixed-denominator precision.
    pub precision_at: usize,
    /// Decimal places for probabilities and metrics.
    pub decimals: i32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: well_known::DECISION_THRESHOLD,
            precision_at: well_known::PRECISION_AT,
            decimals: well_known::METRIC_PRECISION,
        }
    }
}

/// Counts collected while building patient embeddings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddingStats {
    /// Patients provided.
    pub total_patients: usize,
    /// Patients with no events.
    pub empty_timelines: usize,
    /// Sentences built before stop-concept filtering.
    pub raw_sentences: usize,
    /// Sentences left after stop-concept filtering.
    pub sentences: usize,
    /// Concepts removed as stop-concepts.
    pub stop_concepts: usize,
    /// Patients left without sentences after filtering.
    pub dropped_patients: usize,
    /// Patients with at least one embedded sentence.
    pub embedded_patients: usize,
}

impl EmbeddingStats {
    /// Percentage of provided patients that ended up embedded.
    pub fn coverage(&self) -> f64 {
        if self.total_patients == 0 {
            0.0
        } else {
            (self.embedded_patients as f64 / self.total_patients as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_config_default() {
        let config = WindowConfig::default();
        assert_eq!(config.length, 15);
        assert_eq!(config.step, 5);
        assert_eq!(config.merge_factor, Some(3));
        assert!(config.validate().is_ok());
        assert_eq!(config.without_merge().merge_factor, None);
    }

    #[test]
    fn test_window_config_rejects_zero() {
        let err = WindowConfig::new(0, 5).validate().unwrap_err();
        assert!(matches!(err, Phe2VecError::InvalidWindow { length: 0, step: 5 }));
        assert!(WindowConfig::new(15, 0).validate().is_err());
    }

    #[test]
    fn test_expansion_presets() {
        let discovery = ExpansionConfig::phenotype_discovery();
        assert_eq!(discovery.neighbors, 100);
        assert!(discovery.accepts(-0.9));

        let retrieval = ExpansionConfig::cohort_retrieval();
        assert_eq!(retrieval.neighbors, 500);
        assert!(retrieval.accepts(0.71));
        assert!(!retrieval.accepts(0.7));

        assert!(!ExpansionConfig::seeds_only().enabled);
    }

    #[test]
    fn test_embedding_stats_coverage() {
        let stats = EmbeddingStats {
            total_patients: 4,
            embedded_patients: 3,
            ..Default::default()
        };
        assert!((stats.coverage() - 75.0).abs() < 0.01);
        assert_eq!(EmbeddingStats::default().coverage(), 0.0);
    }
}
