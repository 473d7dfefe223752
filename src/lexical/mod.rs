//! Lexical Similarity
//!
//! Edit-distance based similarity of resolved solutions.
//!
//! Distances run over Unicode scalar values, so `í` counts as one edit.
//!
//! # Complexity
//! O(m × n) time, O(min(m, n)) memory per pair

use rayon::prelude::*;
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::matrix::SimilarityMatrix;
use crate::types::EditMeasure;

/// Levenshtein distance: unit-cost insertions, deletions and substitutions.
///
/// ```
/// use cloze_similarity::lexical::minimum_edit_distance;
///
/// assert_eq!(minimum_edit_distance("Jones", "Johnson"), 4);
/// assert_eq!(minimum_edit_distance("bylinkář", "bylina"), 3);
/// ```
pub fn minimum_edit_distance(s1: &str, s2: &str) -> usize {
    let mut shorter: Vec<char> = s1.chars().collect();
    let mut longer: Vec<char> = s2.chars().collect();
    if shorter.len() > longer.len() {
        std::mem::swap(&mut shorter, &mut longer);
    }

    let mut distances: Vec<usize> = (0..=shorter.len()).collect();
    let mut next = vec![0; shorter.len() + 1];

    for (index2, &char2) in longer.iter().enumerate() {
        next[0] = index2 + 1;
        for (index1, &char1) in shorter.iter().enumerate() {
            next[index1 + 1] = if char1 == char2 {
                distances[index1]
            } else {
                1 + distances[index1]
                    .min(distances[index1 + 1])
                    .min(next[index1])
            };
        }
        std::mem::swap(&mut distances, &mut next);
    }

    distances[shorter.len()]
}

/// `d / max_len`; two empty strings are at distance 0
pub fn distance_ratio(s1: &str, s2: &str) -> f64 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    minimum_edit_distance(s1, s2) as f64 / max_len as f64
}

/// `1 - d / max_len`
pub fn levenshtein_similarity(s1: &str, s2: &str) -> f64 {
    1.0 - distance_ratio(s1, s2)
}

/// `(max_len - d) / max_len`, the same value written the other way round
pub fn levenshtein_similarity_ratio(s1: &str, s2: &str) -> f64 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    (max_len - minimum_edit_distance(s1, s2)) as f64 / max_len as f64
}

/// `1 - min(d, m) / m`: distances beyond `m` all count as fully dissimilar
pub fn threshold_similarity(s1: &str, s2: &str, m: usize) -> f64 {
    if m == 0 {
        return if s1 == s2 { 1.0 } else { 0.0 };
    }
    let d = minimum_edit_distance(s1, s2).min(m);
    1.0 - d as f64 / m as f64
}

impl EditMeasure {
    pub fn similarity(&self, s1: &str, s2: &str) -> f64 {
        match *self {
            EditMeasure::Normalized => levenshtein_similarity(s1, s2),
            EditMeasure::Threshold(m) => threshold_similarity(s1, s2, m),
        }
    }
}

/// Similarity matrix over `words`, indexed by `labels`.
///
/// `labels[i]` names the row of `words[i]`; labels may repeat, e.g. when two
/// items resolve to the same full solution.
pub fn edit_similarity(
    labels: &[String],
    words: &[String],
    measure: EditMeasure,
) -> Result<SimilarityMatrix> {
    edit_similarity_with(labels, words, |a, b| measure.similarity(a, b))
}

/// [`edit_similarity`] with a caller-supplied similarity function
pub fn edit_similarity_with<F>(
    labels: &[String],
    words: &[String],
    similarity: F,
) -> Result<SimilarityMatrix>
where
    F: Fn(&str, &str) -> f64 + Sync,
{
    if labels.len() != words.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: labels.len(),
            actual: words.len(),
        });
    }

    let rows: Vec<Vec<f64>> = words
        .par_iter()
        .map(|a| words.iter().map(|b| similarity(a, b)).collect())
        .collect();

    info!(items = words.len(), "edit similarity computed");
    SimilarityMatrix::from_rows(labels.to_vec(), rows)
}
