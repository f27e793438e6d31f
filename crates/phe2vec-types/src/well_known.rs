//! Well-known constants shared across the pipeline.
//!
//! # Examples
//!
//! ```
//! use phe2vec_types::well_known;
//!
//! assert_eq!(well_known::DEFAULT_WINDOW_LENGTH, 15);
//! assert!(well_known::STOP_CONCEPT_PROBABILITY < 1.0);
//! ```

// =============================================================================
// Temporal windowing
// =============================================================================

/// Default window length, in days.
pub const DEFAULT_WINDOW_LENGTH: u32 = 15;

/// Default window step, in days.
pub const DEFAULT_WINDOW_STEP: u32 = 5;

/// Default multiple of the window length within which an isolated event is
/// merged into the preceding window.
pub const DEFAULT_MERGE_FACTOR: u32 = 3;

// =============================================================================
// Concept weighting
// =============================================================================

/// Concepts seen in more than this fraction of patients are stop-concepts.
pub const STOP_CONCEPT_PROBABILITY: f64 = 0.5;

/// Smoothing constant `a` in the weight `a / (a + p)`.
pub const WEIGHT_SMOOTHING: f64 = 1.0;

// =============================================================================
// Query expansion
// =============================================================================

/// Neighbours per seed when building the phenotype catalogue.
pub const DISCOVERY_NEIGHBORS: usize = 100;

/// Neighbours per seed when retrieving cohorts.
pub const RETRIEVAL_NEIGHBORS: usize = 500;

/// Minimum cosine similarity of a neighbour kept for cohort retrieval.
pub const RETRIEVAL_MIN_SIMILARITY: f64 = 0.7;

// =============================================================================
// Evaluation
// =============================================================================

/// Probability above which a patient is predicted positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Decimal places kept for probabilities and reported metrics.
pub const METRIC_PRECISION: i32 = 3;

/// Cut-off of the fixed-denominator precision metric.
pub const PRECISION_AT: usize = 10;

/// AUC-ROC reported when the truth vector has a single class.
pub const NEUTRAL_AUC: f64 = 0.5;

// =============================================================================
// Concept naming
// =============================================================================

/// Delimiter between the fields of a coded concept identifier.
pub const CONCEPT_FIELD_DELIMITER: &str = "::";

/// System prefix of ICD-9 diagnosis concepts.
pub const ICD9_SYSTEM: &str = "icd9";

/// Category values excluded from concept embedding evaluation.
pub const UNCLASSIFIED_CATEGORY: &str = "unclassified";
