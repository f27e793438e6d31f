//! Concept category CSV.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use super::{open, validate_headers};
use crate::types::Phe2VecResult;

const CATEGORY_COLUMNS: &[&str] = &["code", "category"];

/// Reads a code to category map from a CSV file.
pub fn read_categories<P: AsRef<Path>>(path: P) -> Phe2VecResult<BTreeMap<String, String>> {
    let path = path.as_ref();
    let categories = read_categories_from(open(path)?)?;
    tracing::info!("Loaded {} code categories from {}", categories.len(), path.display());
    Ok(categories)
}

/// Reads a code to category map from CSV data.
///
/// A code listed twice keeps its last category.
pub fn read_categories_from<R: Read>(reader: R) -> Phe2VecResult<BTreeMap<String, String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    validate_headers(csv_reader.headers()?, CATEGORY_COLUMNS)?;

    let mut categories = BTreeMap::new();
    for result in csv_reader.deserialize() {
        let (code, category): (String, String) = result?;
        categories.insert(code, category);
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_categories() {
        let data = "code,category\n493.90,Asthma\n250.00, Diabetes \n999.9,\n";
        let categories = read_categories_from(data.as_bytes()).unwrap();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories["250.00"], "Diabetes");
        assert_eq!(categories["999.9"], "");
    }
}
