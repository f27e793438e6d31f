//! In-memory concept vector store.
//!
//! Holds one vector per concept in a dense matrix and answers cosine
//! nearest-neighbour queries by brute force. Vectors are read from and
//! written to the word2vec text format:
//!
//! ```text
//! <count> <dimension>
//! <concept> <v1> <v2> ... <vd>
//! ```
//!
//! Concept identifiers may contain spaces (`icd9::essential hypertension::401.9`),
//! so each line is split from the right: the last `d` fields are the
//! vector, everything before them is the concept.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use phe2vec_types::ConceptId;

use crate::provider::{ConceptEmbedding, Neighbor};
use crate::types::{Phe2VecError, Phe2VecResult};

/// Concept vectors indexed by concept identifier.
///
/// # Example
///
/// ```
/// use phe2vec_core::{ConceptEmbedding, KeyedVectors};
///
/// let kv = KeyedVectors::from_entries(vec![
///     ("a".to_string(), vec![1.0, 0.0]),
///     ("b".to_string(), vec![0.9, 0.1]),
///     ("c".to_string(), vec![0.0, 1.0]),
/// ])?;
///
/// let neighbors = kv.nearest_neighbors("a", 1).unwrap();
/// assert_eq!(neighbors[0].concept, "b");
/// # Ok::<(), phe2vec_core::Phe2VecError>(())
/// ```
#[derive(Clone)]
pub struct KeyedVectors {
    /// Concepts in insertion order.
    vocab: Vec<ConceptId>,
    /// Row of each concept in `vectors`.
    index: HashMap<ConceptId, usize>,
    /// One row per concept.
    vectors: Array2<f64>,
    /// Euclidean norm of each row.
    norms: Array1<f64>,
}

impl std::fmt::Debug for KeyedVectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedVectors")
            .field("concepts", &self.vocab.len())
            .field("dimension", &self.vectors.ncols())
            .finish()
    }
}

impl KeyedVectors {
    /// Builds a store from (concept, vector) pairs.
    ///
    /// Later duplicates of a concept are ignored.
    ///
    /// # Errors
    /// Returns an error if no entry is given or vector lengths differ.
    pub fn from_entries(entries: Vec<(ConceptId, Vec<f64>)>) -> Phe2VecResult<Self> {
        let dimension = match entries.first() {
            Some((_, v)) => v.len(),
            None => return Err(Phe2VecError::EmptyVocabulary),
        };

        let mut vocab = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut flat = Vec::with_capacity(entries.len() * dimension);

        for (concept, vector) in entries {
            if vector.len() != dimension {
                return Err(Phe2VecError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
            if index.contains_key(&concept) {
                tracing::warn!(concept = %concept, "Duplicate concept vector ignored");
                continue;
            }
            index.insert(concept.clone(), vocab.len());
            vocab.push(concept);
            flat.extend(vector);
        }

        let vectors = Array2::from_shape_vec((vocab.len(), dimension), flat)
            .map_err(|e| Phe2VecError::Parse(e.to_string()))?;
        let norms = vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt());

        Ok(Self {
            vocab,
            index,
            vectors,
            norms,
        })
    }

    /// Loads vectors from a word2vec text file.
    ///
    /// # Errors
    /// Returns an error if the file is missing or malformed.
    pub fn load_text<P: AsRef<Path>>(path: P) -> Phe2VecResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Phe2VecError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let kv = Self::from_reader(BufReader::new(File::open(path)?))?;
        tracing::info!(
            "Loaded {} concept vectors of dimension {} from {}",
            kv.len(),
            kv.dimension(),
            path.display()
        );
        Ok(kv)
    }

    /// Reads vectors in word2vec text format from any reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Phe2VecResult<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Phe2VecError::EmptyVocabulary),
        };
        let (count, dimension) = parse_header(&header)?;

        let mut entries = Vec::with_capacity(count);
        for (i, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            entries.push(parse_vector_line(line, dimension, i + 2)?);
        }

        if entries.len() != count {
            tracing::warn!(
                "Vector file header announces {} concepts, found {}",
                count,
                entries.len()
            );
        }

        Self::from_entries(entries)
    }

    /// Writes vectors in word2vec text format.
    pub fn save_text<P: AsRef<Path>>(&self, path: P) -> Phe2VecResult<()> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        writeln!(out, "{} {}", self.len(), self.dimension())?;
        for (concept, row) in self.vocab.iter().zip(self.vectors.rows()) {
            write!(out, "{}", concept)?;
            for value in row.iter() {
                write!(out, " {}", value)?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }
}

impl ConceptEmbedding for KeyedVectors {
    fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn vocabulary(&self) -> &[ConceptId] {
        &self.vocab
    }

    fn vector_of(&self, concept: &str) -> Option<ArrayView1<'_, f64>> {
        self.index.get(concept).map(|&i| self.vectors.row(i))
    }

    fn nearest_to_vector(&self, vector: ArrayView1<'_, f64>, topn: usize) -> Vec<Neighbor> {
        if vector.len() != self.dimension() || topn == 0 {
            return Vec::new();
        }
        let query_norm = vector.dot(&vector).sqrt();
        let dots = self.vectors.dot(&vector);

        let mut scored: Vec<(usize, f64)> = dots
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(i, (&dot, &norm))| {
                let denom = norm * query_norm;
                let similarity = if denom > 0.0 { dot / denom } else { 0.0 };
                (i, similarity)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(topn);

        scored
            .into_iter()
            .map(|(i, similarity)| Neighbor {
                concept: self.vocab[i].clone(),
                similarity,
            })
            .collect()
    }
}

fn parse_header(header: &str) -> Phe2VecResult<(usize, usize)> {
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(Phe2VecError::InvalidVectorFile {
            line: 1,
            reason: format!("expected '<count> <dimension>', found '{}'", header),
        });
    }
    let parse = |value: &str| {
        value.parse::<usize>().map_err(|_| Phe2VecError::InvalidVectorFile {
            line: 1,
            reason: format!("invalid integer '{}'", value),
        })
    };
    Ok((parse(fields[0])?, parse(fields[1])?))
}

fn parse_vector_line(
    line: &str,
    dimension: usize,
    line_no: usize,
) -> Phe2VecResult<(ConceptId, Vec<f64>)> {
    let mut fields: Vec<&str> = line.rsplitn(dimension + 1, ' ').collect();
    if fields.len() != dimension + 1 {
        return Err(Phe2VecError::InvalidVectorFile {
            line: line_no,
            reason: format!("expected a concept and {} values", dimension),
        });
    }
    let concept = fields.pop().unwrap_or_default().trim().to_string();
    if concept.is_empty() {
        return Err(Phe2VecError::InvalidVectorFile {
            line: line_no,
            reason: "missing concept".to_string(),
        });
    }

    // rsplitn yields the values last-first
    let mut vector = Vec::with_capacity(dimension);
    for value in fields.iter().rev() {
        let parsed = value.parse::<f64>().map_err(|_| Phe2VecError::InvalidVectorFile {
            line: line_no,
            reason: format!("invalid value '{}'", value),
        })?;
        vector.push(parsed);
    }
    Ok((concept, vector))
}
