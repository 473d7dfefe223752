//! Solution Extractor
//!
//! Resolves a cloze template with its correct answer.
//!
//! ```
//! use cloze_similarity::solution::extract;
//! use cloze_similarity::SolutionMode;
//!
//! assert_eq!(extract("nab_t pušku", "í", SolutionMode::Full).unwrap(), "nabít pušku");
//! assert_eq!(extract("nab_t pušku", "í", SolutionMode::FillIn).unwrap(), "nabít");
//! assert_eq!(extract("nab_t pušku", "í", SolutionMode::Annotated).unwrap(), "nab(í)t");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AnalysisError, Result};
use crate::types::{AnswerRecord, SolutionMode, SolutionSet, BLANK_MARKER};

/// Word token holding the blank. `\w` is Unicode aware, so Czech letters
/// stay inside the token.
static BLANK_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w*_\w*").expect("Valid blank word regex"));

/// Rejects templates without exactly one blank
pub fn check_template(template: &str) -> Result<()> {
    let markers = template.matches(BLANK_MARKER).count();
    if markers != 1 {
        return Err(AnalysisError::MalformedTemplate {
            template: template.to_string(),
            markers,
        });
    }
    Ok(())
}

pub fn extract(template: &str, answer: &str, mode: SolutionMode) -> Result<String> {
    check_template(template)?;

    let marker = BLANK_MARKER.to_string();
    let solved = match mode {
        SolutionMode::Full => template.replacen(&marker, answer, 1),
        SolutionMode::FillIn => blank_word(template).replacen(&marker, answer, 1),
        SolutionMode::Annotated => {
            blank_word(template).replacen(&marker, &format!("({answer})"), 1)
        }
    };
    Ok(solved)
}

/// All three representations at once
pub fn solution_set(template: &str, answer: &str) -> Result<SolutionSet> {
    Ok(SolutionSet {
        full_solution: extract(template, answer, SolutionMode::Full)?,
        fill_in: extract(template, answer, SolutionMode::FillIn)?,
        annotated: extract(template, answer, SolutionMode::Annotated)?,
    })
}

/// Batch form over answer records.
///
/// One malformed or incomplete record fails the whole batch.
pub fn solutions(records: &[AnswerRecord], mode: SolutionMode) -> Result<Vec<String>> {
    records
        .iter()
        .map(|record| {
            let template =
                record
                    .question_template
                    .as_deref()
                    .ok_or(AnalysisError::MissingField {
                        record_id: record.record_id,
                        field: "question template",
                    })?;
            let answer = record
                .correct_answer
                .as_deref()
                .ok_or(AnalysisError::MissingField {
                    record_id: record.record_id,
                    field: "correct answer",
                })?;
            extract(template, answer, mode)
        })
        .collect()
}

fn blank_word(template: &str) -> &str {
    BLANK_WORD
        .find(template)
        .map(|m| m.as_str())
        .unwrap_or(template)
}
