//! # cloze-similarity
//!
//! Item similarity analysis for fill-in-the-blank ("doplňovačka") answer
//! logs. Three independent measures over the same items:
//!
//! - **Performance** - correlation of learners' correctness between items
//!   (Pearson, and Pearson over Pearson rows)
//! - **Lexical** - Levenshtein distance between resolved solutions
//! - **Embedding** - cosine similarity of word vectors
//!
//! ## Module structure
//!
//! - [`join`] - answer logs joined with question and practice-set metadata
//! - [`solution`] - resolving a template and its answer into a solution
//! - [`correctness`] - users × items correctness matrix
//! - [`performance`] - correlation-based item similarity
//! - [`lexical`] - edit-distance similarity
//! - [`embedding`] - word-vector similarity and the word2vec text loader
//! - [`compare`] - agreement between similarity matrices
//! - [`matrix`] - labelled square matrix, Pearson and cosine kernels
//! - [`sanitize`] - NaN policies
//! - [`table`] - delimited table reading and writing
//! - [`projection`] - points for an external scatterplot renderer
//! - [`analysis`] - batch commands built from the above
//!
//! ## Example
//!
//! ```rust
//! use cloze_similarity::{lexical, EditMeasure, SolutionMode};
//! use cloze_similarity::solution::extract;
//!
//! let solution = extract("léčivá b_lina", "y", SolutionMode::FillIn).unwrap();
//! assert_eq!(solution, "bylina");
//!
//! let words = vec!["bylina".to_string(), "bylinka".to_string()];
//! let matrix = lexical::edit_similarity(&words, &words, EditMeasure::default()).unwrap();
//! assert_eq!(matrix.get(0, 0), 1.0);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod analysis;
pub mod compare;
pub mod config;
pub mod correctness;
pub mod embedding;
pub mod error;
pub mod join;
pub mod lexical;
pub mod logging;
pub mod matrix;
pub mod performance;
pub mod projection;
pub mod sanitize;
pub mod solution;
pub mod table;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use error::{AnalysisError, Result};

pub use matrix::SimilarityMatrix;

pub use correctness::{CorrectnessMatrix, Reshaped, StructureWarning};

pub use embedding::{
    DropReason, DroppedItem, EmbeddingOutcome, ExclusionPolicy, VocabularyLookup, WordVectors,
};

pub use compare::CorrelationReport;

pub use table::Frame;

pub use config::Config;
