//! Embedding Similarity
//!
//! Cosine similarity of word vectors from an externally trained model.
//!
//! Items whose word has no vector, or whose word is excluded by
//! configuration, are filtered out before any pair is computed. The caller
//! gets the list of dropped items back with the reason.

pub mod model;

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::logging::DROPPED_ITEMS_TARGET;
use crate::matrix::{cosine_similarity, SimilarityMatrix};

pub use model::WordVectors;

/// Read-only vocabulary capability of an embedding model
pub trait VocabularyLookup: Sync {
    fn vector(&self, word: &str) -> Option<&[f32]>;

    fn contains(&self, word: &str) -> bool {
        self.vector(word).is_some()
    }

    /// Cosine similarity, `None` if either word is unknown
    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        Some(cosine_similarity(self.vector(a)?, self.vector(b)?))
    }
}

/// Words left out regardless of vocabulary membership, e.g. visual outliers
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    words: HashSet<String>,
}

impl ExclusionPolicy {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    NotInVocabulary,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedItem {
    pub label: String,
    pub word: String,
    pub reason: DropReason,
}

/// Items that have a vector, in input order
#[derive(Debug, Clone)]
pub struct EmbeddedItems {
    /// Input positions of the kept items
    pub positions: Vec<usize>,
    pub labels: Vec<String>,
    pub words: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub dropped: Vec<DroppedItem>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    pub matrix: SimilarityMatrix,
    pub dropped: Vec<DroppedItem>,
}

/// Splits items into those with a usable vector and those without
pub fn embed_items<L: VocabularyLookup + ?Sized>(
    lookup: &L,
    labels: &[String],
    words: &[String],
    exclusions: &ExclusionPolicy,
) -> Result<EmbeddedItems> {
    if labels.len() != words.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: labels.len(),
            actual: words.len(),
        });
    }

    let mut kept = EmbeddedItems {
        positions: Vec::new(),
        labels: Vec::new(),
        words: Vec::new(),
        vectors: Vec::new(),
        dropped: Vec::new(),
    };

    for (position, (label, word)) in labels.iter().zip(words).enumerate() {
        let reason = if exclusions.is_excluded(word) {
            DropReason::Excluded
        } else if let Some(vector) = lookup.vector(word) {
            kept.positions.push(position);
            kept.labels.push(label.clone());
            kept.words.push(word.clone());
            kept.vectors.push(vector.to_vec());
            continue;
        } else {
            DropReason::NotInVocabulary
        };

        debug!(
            target: DROPPED_ITEMS_TARGET,
            %label,
            %word,
            ?reason,
            "item left out of embedding similarity"
        );
        kept.dropped.push(DroppedItem {
            label: label.clone(),
            word: word.clone(),
            reason,
        });
    }

    Ok(kept)
}

/// Cosine similarity matrix of the items that survive filtering
pub fn embedding_similarity<L: VocabularyLookup + ?Sized>(
    lookup: &L,
    labels: &[String],
    words: &[String],
    exclusions: &ExclusionPolicy,
) -> Result<EmbeddingOutcome> {
    let items = embed_items(lookup, labels, words, exclusions)?;

    let vectors = &items.vectors;
    let rows: Vec<Vec<f64>> = vectors
        .par_iter()
        .map(|a| vectors.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect();

    let matrix = SimilarityMatrix::from_rows(items.labels, rows)?;
    info!(
        items = matrix.len(),
        dropped = items.dropped.len(),
        "embedding similarity computed"
    );

    Ok(EmbeddingOutcome {
        matrix,
        dropped: items.dropped,
    })
}
