//! Common Types and Constants
//!
//! Shared data structures used across the analysis modules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

// ==================== Constants ====================

/// Blank marker inside a cloze question template
pub const BLANK_MARKER: char = '_';

/// Reference distance cap for threshold edit similarity
pub const DEFAULT_EDIT_THRESHOLD: usize = 5;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Default field delimiter of the source tables
pub const DEFAULT_DELIMITER: u8 = b';';

pub type UserId = i64;
pub type ItemId = i64;
pub type PracticeSetId = i64;
pub type KnowledgeComponentId = i64;

// ==================== Answer Records ====================

/// One user answer joined with question and practice-set metadata.
///
/// Left joins may leave metadata absent, which is why most of it is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Log row id
    pub record_id: i64,
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Correct / incorrect / not recorded
    pub is_correct: Option<bool>,
    /// Cloze template with one blank, e.g. `nab_t pušku`
    pub question_template: Option<String>,
    /// Text filling the blank, e.g. `í`
    pub correct_answer: Option<String>,
    pub practice_set_id: Option<PracticeSetId>,
    pub knowledge_component_id: Option<KnowledgeComponentId>,
    pub url: Option<String>,
    pub exercise: Option<String>,
}

// ==================== Solution Modes ====================

/// Textual representation derived from a template and its answer
///
/// Example for `nab_t pušku` with answer `í`:
/// - `Full`: `nabít pušku`
/// - `FillIn`: `nabít`
/// - `Annotated`: `nab(í)t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionMode {
    Full,
    FillIn,
    Annotated,
}

/// All three representations of one solved template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionSet {
    pub full_solution: String,
    pub fill_in: String,
    pub annotated: String,
}

// ==================== Similarity Methods ====================

/// Correlation transform applied to a correctness matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    Pearson,
    /// Pearson applied to the Pearson matrix
    DoublePearson,
}

impl CorrelationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::DoublePearson => "doublepearson",
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "doublepearson" | "double_pearson" | "double-pearson" => {
                Ok(CorrelationMethod::DoublePearson)
            }
            _ => Err(AnalysisError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalization applied to a raw edit distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMeasure {
    /// `1 - d / max_len`
    Normalized,
    /// `1 - min(d, m) / m`
    Threshold(usize),
}

impl Default for EditMeasure {
    fn default() -> Self {
        EditMeasure::Normalized
    }
}

/// What labels the rows of a lexical or embedding matrix.
///
/// Item ids line up with performance matrices, which are always labelled by
/// item id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelBy {
    ItemId,
    #[default]
    Solution,
}
