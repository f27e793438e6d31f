//! # phe2vec-types
//!
//! Type definitions for turning longitudinal patient records into patient
//! embeddings and retrieving disease cohorts from them.
//!
//! This crate provides plain data types: clinical events and timelines,
//! patient sentences, ground-truth cohorts, ranked retrieval results and the
//! coded concept naming convention.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use phe2vec_types::{ClinicalEvent, PatientTimeline, well_known};
//!
//! let timeline = PatientTimeline::new(
//!     "p1",
//!     vec![
//!         ClinicalEvent::new("icd9::asthma::493.90", 3650),
//!         ClinicalEvent::new("icd9::allergic rhinitis::477.9", 3652),
//!     ],
//! );
//!
//! assert!(timeline.is_chronological());
//! assert_eq!(well_known::DEFAULT_WINDOW_STEP, 5);
//! ```

#![warn(missing_docs)]

mod coded;
mod cohort;
mod event;
mod ids;
mod ranking;
mod sentence;
pub mod well_known;

// Re-export all public types at crate root
pub use coded::CodedConcept;
pub use cohort::{CohortCatalog, GroundTruthCohort};
pub use event::{ClinicalEvent, PatientTimeline};
pub use ids::{ConceptId, PatientId};
pub use ranking::{RankedPatient, RankedResult};
pub use sentence::{PatientSentences, Sentence};
