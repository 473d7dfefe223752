//! Word vectors in the word2vec text format.
//!
//! The first line may be a `<count> <dimension>` header; every other line is
//! `<word> <v1> ... <vd>`. Export a trained gensim model with
//! `model.wv.save_word2vec_format(path)`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use super::VocabularyLookup;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl WordVectors {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalysisError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
        let model = Self::from_reader(BufReader::new(file))
            .map_err(|e| match e {
                AnalysisError::Io { source, .. } => AnalysisError::io(path, source),
                other => other,
            })?;
        info!(
            path = %path.display(),
            words = model.len(),
            dimension = model.dimension,
            "word vectors loaded"
        );
        Ok(model)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut model = WordVectors::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| AnalysisError::io("<word vectors>", e))?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            if line_no == 0 && parts.len() == 2 {
                if let (Ok(_), Ok(dim)) = (parts[0].parse::<usize>(), parts[1].parse::<usize>()) {
                    model.dimension = dim;
                    continue;
                }
            }

            let values = parts[1..]
                .iter()
                .map(|v| {
                    v.parse::<f32>()
                        .map_err(|e| AnalysisError::invalid_value(parts[0], v, e.to_string()))
                })
                .collect::<Result<Vec<f32>>>()?;

            model.insert(parts[0], values)?;
        }

        Ok(model)
    }

    /// Adds one vector; all vectors must share a dimension
    pub fn insert(&mut self, word: &str, vector: Vec<f32>) -> Result<()> {
        if self.dimension == 0 {
            self.dimension = vector.len();
        }
        if vector.len() != self.dimension {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.insert(word.to_string(), vector);
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl VocabularyLookup for WordVectors {
    fn vector(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_with_header() {
        let text = "2 3\nbylina 0.1 0.2 0.3\nbýk 1 0 0\n";
        let model = WordVectors::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.dimension(), 3);
        assert_eq!(model.vector("býk"), Some(&[1.0f32, 0.0, 0.0][..]));
        assert_eq!(model.vector("byt"), None);
    }

    #[test]
    fn test_parse_without_header() {
        let text = "bylina 0.5 0.5\n\nbýk -1 2\n";
        let model = WordVectors::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.dimension(), 2);
    }

    #[test]
    fn test_dimension_mismatch() {
        let text = "2 3\nbylina 0.1 0.2\n";
        let err = WordVectors::from_reader(Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_bad_number() {
        let err = WordVectors::from_reader(Cursor::new("bylina 0.1 x\n")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = WordVectors::load("/no/such/model.txt").unwrap_err();
        assert!(matches!(err, AnalysisError::MissingFile(_)));
    }
}
