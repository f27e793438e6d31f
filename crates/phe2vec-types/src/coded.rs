//! Coded concept naming convention.
//!
//! Vocabulary entries that stand for terminology codes are written as
//! `<system>::<label>::<code>`, for example `icd9::essential hypertension::401.9`.
//! Entries with fewer than three fields are not part of code-indexed views.

use crate::well_known::CONCEPT_FIELD_DELIMITER;

/// A concept identifier split into its system, label and code fields.
///
/// # Examples
///
/// ```
/// use phe2vec_types::CodedConcept;
///
/// let coded = CodedConcept::parse("icd9::essential hypertension::401.9").unwrap();
/// assert_eq!(coded.system, "icd9");
/// assert_eq!(coded.code, "401.9");
///
/// assert!(CodedConcept::parse("rxnorm::metformin").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodedConcept {
    /// Terminology system prefix (e.g. `icd9`).
    pub system: String,
    /// Human readable label.
    pub label: String,
    /// Raw code value.
    pub code: String,
}

impl CodedConcept {
    /// Splits a concept identifier into its fields.
    ///
    /// Returns `None` when the identifier has fewer than three fields.
    pub fn parse(concept: &str) -> Option<Self> {
        let mut fields = concept.split(CONCEPT_FIELD_DELIMITER);
        let system = fields.next()?;
        let label = fields.next()?;
        let code = fields.next()?;
        Some(Self {
            system: system.to_string(),
            label: label.to_string(),
            code: code.to_string(),
        })
    }

    /// Returns true if the concept belongs to the given terminology system.
    pub fn is_system(&self, system: &str) -> bool {
        self.system == system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extra_fields() {
        let coded = CodedConcept::parse("icd9::label::250.00::extra").unwrap();
        assert_eq!(coded.code, "250.00");
        assert!(coded.is_system("icd9"));
        assert!(!coded.is_system("icd10"));
    }

    #[test]
    fn test_parse_rejects_short_tokens() {
        assert!(CodedConcept::parse("").is_none());
        assert!(CodedConcept::parse("icd9").is_none());
        assert!(CodedConcept::parse("icd9::label").is_none());
    }
}
