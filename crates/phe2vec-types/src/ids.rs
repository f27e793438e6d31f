//! Identifier types for concepts and patients.
//!
//! Both identifiers are opaque tokens. Concept identifiers form the
//! vocabulary of a concept embedding; patient identifiers key the rows of
//! patient embeddings and the members of ground-truth cohorts.

/// A clinical concept identifier, such as `icd9::type 2 diabetes::250.00`.
///
/// # Examples
///
/// ```
/// use phe2vec_types::ConceptId;
///
/// let concept: ConceptId = "icd9::hypertension::401.9".to_string();
/// assert!(concept.starts_with("icd9"));
/// ```
pub type ConceptId = String;

/// A patient identifier (for example a medical record number).
pub type PatientId = String;
