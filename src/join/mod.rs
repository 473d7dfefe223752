//! Record Join
//!
//! Merges answer logs with question and practice-set metadata into flat
//! [`AnswerRecord`]s, plus the dedup and selection helpers the analyses use.
//!
//! The join never deduplicates on its own. Repeated attempts and items shared
//! by several practice sets stay visible until a caller asks for
//! [`dedup_first`].

pub mod counts;

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::table::Frame;
use crate::types::{AnswerRecord, ItemId, KnowledgeComponentId, PracticeSetId, UserId};

pub use counts::{
    count_by_knowledge_component, count_by_practice_set, KnowledgeComponentCount,
    PracticeSetCount,
};

/// `id, user, question, correct`
pub const LOG_COLUMNS: &[&str] = &["id", "user", "question", "correct"];
/// `id, question, correct` (template and its answer)
pub const QUESTION_COLUMNS: &[&str] = &["id", "question", "correct"];
/// `problem, ps`
pub const MEMBERSHIP_COLUMNS: &[&str] = &["problem", "ps"];
/// `id, url, parent`
pub const PRACTICE_SET_COLUMNS: &[&str] = &["id", "url", "parent"];

/// Columns of a persisted answer table, see [`records_to_frame`]
pub const RECORD_COLUMNS: &[&str] = &[
    "id",
    "user",
    "correct",
    "question_id",
    "correct_answer",
    "question",
    "url",
    "ps",
    "parent_kc",
    "exercise",
];

static LEGACY_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#","(.*?)"\]\]"#).expect("Valid legacy cell regex"));

/// Left-joins logs → questions → practice-set membership → practice sets.
///
/// All four tables are checked for their columns before any row is read.
/// A key with several matches on the right yields one record per match.
pub fn join(
    logs: &Frame,
    questions: &Frame,
    memberships: &Frame,
    practice_sets: &Frame,
) -> Result<Vec<AnswerRecord>> {
    let log_cols = logs.require_columns(LOG_COLUMNS)?;
    let question_cols = questions.require_columns(QUESTION_COLUMNS)?;
    let membership_cols = memberships.require_columns(MEMBERSHIP_COLUMNS)?;
    let set_cols = practice_sets.require_columns(PRACTICE_SET_COLUMNS)?;
    let exercise_col = practice_sets.column_index("exercise");

    let questions_by_id = index_rows(questions, question_cols[0], "id")?;
    let memberships_by_item = index_rows(memberships, membership_cols[0], "problem")?;
    let sets_by_id = index_rows(practice_sets, set_cols[0], "id")?;

    let mut records = Vec::with_capacity(logs.len());

    for row in 0..logs.len() {
        let record_id = parse_id("id", logs.cell(row, log_cols[0]))?;
        let user_id = parse_id("user", logs.cell(row, log_cols[1]))?;
        let item_id = parse_id("question", logs.cell(row, log_cols[2]))?;
        let is_correct = parse_correct(logs.cell(row, log_cols[3]))?;

        for question_row in matches(&questions_by_id, item_id) {
            let (question_template, correct_answer) = match question_row {
                Some(q) => (
                    non_empty(&unwrap_legacy_cell(questions.cell(q, question_cols[1]))),
                    non_empty(&unwrap_legacy_cell(questions.cell(q, question_cols[2]))),
                ),
                None => (None, None),
            };

            for membership_row in matches(&memberships_by_item, item_id) {
                let practice_set_id = match membership_row {
                    Some(m) => parse_optional_id("ps", memberships.cell(m, membership_cols[1]))?,
                    None => None,
                };

                let set_rows = match practice_set_id {
                    Some(ps) => matches(&sets_by_id, ps),
                    None => vec![None],
                };

                for set_row in set_rows {
                    let (url, knowledge_component_id, exercise) = match set_row {
                        Some(s) => (
                            non_empty(practice_sets.cell(s, set_cols[1])),
                            parse_optional_id("parent", practice_sets.cell(s, set_cols[2]))?,
                            exercise_col.and_then(|c| non_empty(practice_sets.cell(s, c))),
                        ),
                        None => (None, None, None),
                    };

                    records.push(AnswerRecord {
                        record_id,
                        user_id,
                        item_id,
                        is_correct,
                        question_template: question_template.clone(),
                        correct_answer: correct_answer.clone(),
                        practice_set_id,
                        knowledge_component_id,
                        url,
                        exercise,
                    });
                }
            }
        }
    }

    info!(logs = logs.len(), records = records.len(), "answer records joined");
    Ok(records)
}

/// Keeps the first record of every `(user, item)` pair, input order preserved
pub fn dedup_first(records: &[AnswerRecord]) -> Vec<AnswerRecord> {
    let mut seen: HashSet<(UserId, ItemId)> = HashSet::with_capacity(records.len());
    let kept: Vec<AnswerRecord> = records
        .iter()
        .filter(|r| seen.insert((r.user_id, r.item_id)))
        .cloned()
        .collect();
    debug!(
        before = records.len(),
        after = kept.len(),
        "deduplicated by (user, item)"
    );
    kept
}

/// Keeps every joined row of the first answer per `(user, item)`.
///
/// Unlike [`dedup_first`], an item listed in several practice sets keeps one
/// row per set, so per-set counts see the answer in each of them.
pub fn first_answers(records: &[AnswerRecord]) -> Vec<AnswerRecord> {
    let mut first: HashMap<(UserId, ItemId), i64> = HashMap::with_capacity(records.len());
    for record in records {
        first
            .entry((record.user_id, record.item_id))
            .or_insert(record.record_id);
    }
    let kept: Vec<AnswerRecord> = records
        .iter()
        .filter(|r| first.get(&(r.user_id, r.item_id)) == Some(&r.record_id))
        .cloned()
        .collect();
    debug!(
        before = records.len(),
        after = kept.len(),
        answers = first.len(),
        "kept first answers with all memberships"
    );
    kept
}

/// Keeps the first record of every log id
pub fn dedup_by_record_id(records: &[AnswerRecord]) -> Vec<AnswerRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| seen.insert(r.record_id))
        .cloned()
        .collect()
}

/// Records of the given practice sets, first answer per `(user, item)`.
///
/// For example the three "vyjmenovaná slova po b" sets are `[383, 384, 385]`.
pub fn for_practice_sets(records: &[AnswerRecord], ids: &[PracticeSetId]) -> Vec<AnswerRecord> {
    let wanted: HashSet<PracticeSetId> = ids.iter().copied().collect();
    let selected: Vec<AnswerRecord> = records
        .iter()
        .filter(|r| r.practice_set_id.is_some_and(|ps| wanted.contains(&ps)))
        .cloned()
        .collect();
    dedup_first(&selected)
}

/// Records of one knowledge component.
///
/// The component mapping is known to be noisy; prefer [`for_practice_sets`]
/// when the exact sets are known.
pub fn for_knowledge_component(
    records: &[AnswerRecord],
    kc: KnowledgeComponentId,
) -> Vec<AnswerRecord> {
    let selected: Vec<AnswerRecord> = records
        .iter()
        .filter(|r| r.knowledge_component_id == Some(kc))
        .cloned()
        .collect();
    dedup_by_record_id(&dedup_first(&selected))
}

/// Extracts the text of a legacy `[["text","zab_dlený"]]` cell.
///
/// Anything else is returned unchanged.
pub fn unwrap_legacy_cell(cell: &str) -> String {
    LEGACY_CELL
        .captures(cell)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| cell.to_string())
}

/// Persistable form of answer records, columns as in [`RECORD_COLUMNS`]
pub fn records_to_frame(name: &str, records: &[AnswerRecord]) -> Frame {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.record_id.to_string(),
                r.user_id.to_string(),
                match r.is_correct {
                    Some(true) => "1".to_string(),
                    Some(false) => "0".to_string(),
                    None => String::new(),
                },
                r.item_id.to_string(),
                r.correct_answer.clone().unwrap_or_default(),
                r.question_template.clone().unwrap_or_default(),
                r.url.clone().unwrap_or_default(),
                r.practice_set_id.map(|v| v.to_string()).unwrap_or_default(),
                r.knowledge_component_id
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                r.exercise.clone().unwrap_or_default(),
            ]
        })
        .collect();

    Frame::new(
        name,
        RECORD_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}

/// Reads answer records back from a persisted answer table.
///
/// `user`, `question_id` and `correct` are required. Without an `id` column
/// the row number stands in; the metadata columns may be absent.
pub fn records_from_frame(frame: &Frame) -> Result<Vec<AnswerRecord>> {
    let required = frame.require_columns(&["user", "question_id", "correct"])?;
    let optional = |name: &str| frame.column_index(name);
    let id_col = optional("id");
    let answer_col = optional("correct_answer");
    let template_col = optional("question");
    let url_col = optional("url");
    let ps_col = optional("ps");
    let kc_col = optional("parent_kc");
    let exercise_col = optional("exercise");

    let text = |row: usize, col: Option<usize>| col.and_then(|c| non_empty(frame.cell(row, c)));

    (0..frame.len())
        .map(|row| {
            Ok(AnswerRecord {
                record_id: match id_col {
                    Some(c) => parse_id("id", frame.cell(row, c))?,
                    None => row as i64,
                },
                user_id: parse_id("user", frame.cell(row, required[0]))?,
                item_id: parse_id("question_id", frame.cell(row, required[1]))?,
                is_correct: parse_correct(frame.cell(row, required[2]))?,
                question_template: text(row, template_col),
                correct_answer: text(row, answer_col),
                practice_set_id: match ps_col {
                    Some(c) => parse_optional_id("ps", frame.cell(row, c))?,
                    None => None,
                },
                knowledge_component_id: match kc_col {
                    Some(c) => parse_optional_id("parent_kc", frame.cell(row, c))?,
                    None => None,
                },
                url: text(row, url_col),
                exercise: text(row, exercise_col),
            })
        })
        .collect()
}

// ============================================================================
// Cell parsing
// ============================================================================

/// Integer id; tolerates `383.0` as written by float-typed exports
pub fn parse_id(column: &str, cell: &str) -> Result<i64> {
    parse_optional_id(column, cell)?
        .ok_or_else(|| AnalysisError::invalid_value(column, cell, "id is empty"))
}

pub fn parse_optional_id(column: &str, cell: &str) -> Result<Option<i64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Ok(Some(v));
    }
    match cell.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
        _ => Err(AnalysisError::invalid_value(column, cell, "not an integer id")),
    }
}

/// Tri-state correctness: `1/0`, `true/false`, empty for unknown
pub fn parse_correct(cell: &str) -> Result<Option<bool>> {
    match cell.trim().to_lowercase().as_str() {
        "" | "nan" => Ok(None),
        "1" | "1.0" | "true" => Ok(Some(true)),
        "0" | "0.0" | "false" => Ok(Some(false)),
        other => Err(AnalysisError::invalid_value(
            "correct",
            other,
            "expected 1/0 or true/false",
        )),
    }
}

fn non_empty(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn index_rows(frame: &Frame, column: usize, name: &str) -> Result<HashMap<i64, Vec<usize>>> {
    let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
    for row in 0..frame.len() {
        if let Some(key) = parse_optional_id(name, frame.cell(row, column))? {
            index.entry(key).or_default().push(row);
        }
    }
    Ok(index)
}

/// Matching right-hand rows, or a single `None` for the left-join miss
fn matches(index: &HashMap<i64, Vec<usize>>, key: i64) -> Vec<Option<usize>> {
    match index.get(&key) {
        Some(rows) => rows.iter().copied().map(Some).collect(),
        None => vec![None],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, headers: &[&str], rows: &[&[&str]]) -> Frame {
        Frame::new(
            name,
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn tables() -> (Frame, Frame, Frame, Frame) {
        let logs = frame(
            "logs",
            &["id", "user", "question", "correct"],
            &[
                &["1", "10", "100", "1"],
                &["2", "10", "100", "0"],
                &["3", "11", "101", "0"],
                &["4", "12", "999", ""],
            ],
        );
        let questions = frame(
            "questions",
            &["id", "question", "correct"],
            &[&["100", "b_k", "ý"], &["101", "nab_t pušku", "í"]],
        );
        let memberships = frame(
            "system_ps_problem",
            &["problem", "ps"],
            &[&["100", "383"], &["101", "383"], &["101", "384"]],
        );
        let sets = frame(
            "system_ps",
            &["id", "url", "parent", "exercise"],
            &[
                &["383", "slova-po-b-1", "26", "7"],
                &["384", "slova-po-b-2", "26", ""],
            ],
        );
        (logs, questions, memberships, sets)
    }

    #[test]
    fn test_join_left_semantics() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();

        // log 3 matches two practice sets, log 4 matches nothing
        assert_eq!(records.len(), 5);

        let first = &records[0];
        assert_eq!(first.record_id, 1);
        assert_eq!(first.question_template.as_deref(), Some("b_k"));
        assert_eq!(first.correct_answer.as_deref(), Some("ý"));
        assert_eq!(first.practice_set_id, Some(383));
        assert_eq!(first.knowledge_component_id, Some(26));
        assert_eq!(first.url.as_deref(), Some("slova-po-b-1"));
        assert_eq!(first.exercise.as_deref(), Some("7"));

        assert_eq!(records[2].practice_set_id, Some(383));
        assert_eq!(records[3].practice_set_id, Some(384));
        assert_eq!(records[3].exercise, None);

        let orphan = &records[4];
        assert_eq!(orphan.item_id, 999);
        assert_eq!(orphan.is_correct, None);
        assert_eq!(orphan.question_template, None);
        assert_eq!(orphan.practice_set_id, None);
    }

    #[test]
    fn test_join_does_not_deduplicate() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let repeated = records
            .iter()
            .filter(|r| r.user_id == 10 && r.item_id == 100)
            .count();
        assert_eq!(repeated, 2);
    }

    #[test]
    fn test_join_checks_columns_before_rows() {
        let (logs, questions, memberships, _) = tables();
        // broken cell in logs would fail row parsing, the column check must win
        let bad_logs = Frame::new(
            logs.name().to_string(),
            logs.headers().to_vec(),
            vec![vec!["x".into(), "y".into(), "z".into(), "?".into()]],
        );
        let sets = frame("system_ps", &["id", "url"], &[]);
        let err = join(&bad_logs, &questions, &memberships, &sets).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingColumn { ref table, ref column }
                if table == "system_ps" && column == "parent"
        ));
    }

    #[test]
    fn test_dedup_first_keeps_first_occurrence() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let deduped = dedup_first(&records);
        assert_eq!(deduped.len(), 3);
        let kept = deduped
            .iter()
            .find(|r| r.user_id == 10 && r.item_id == 100)
            .unwrap();
        assert_eq!(kept.record_id, 1);
        assert_eq!(kept.is_correct, Some(true));
    }

    #[test]
    fn test_first_answers_keeps_every_membership() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let first = first_answers(&records);

        // retry of (10, 100) gone, both memberships of item 101 kept
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|r| r.record_id != 2));
        let shared: Vec<_> = first
            .iter()
            .filter(|r| r.item_id == 101)
            .map(|r| r.practice_set_id)
            .collect();
        assert_eq!(shared, vec![Some(383), Some(384)]);
    }

    #[test]
    fn test_for_practice_sets_dedups_shared_items() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let selected = for_practice_sets(&records, &[383, 384]);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.user_id != 12));
        let shared = selected.iter().find(|r| r.item_id == 101).unwrap();
        assert_eq!(shared.practice_set_id, Some(383));
    }

    #[test]
    fn test_for_knowledge_component() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let kc = for_knowledge_component(&records, 26);
        assert_eq!(kc.len(), 2);
        assert!(for_knowledge_component(&records, 1).is_empty());
    }

    #[test]
    fn test_unwrap_legacy_cell() {
        assert_eq!(unwrap_legacy_cell(r#"[["text","zab_dlený"]]"#), "zab_dlený");
        assert_eq!(unwrap_legacy_cell("b_k"), "b_k");
    }

    #[test]
    fn test_join_unwraps_legacy_questions() {
        let (logs, _, memberships, sets) = tables();
        let questions = frame(
            "questions",
            &["id", "question", "correct"],
            &[&["100", r#"[["text","b_k"]]"#, r#"[["text","ý"]]"#]],
        );
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        assert_eq!(records[0].question_template.as_deref(), Some("b_k"));
        assert_eq!(records[0].correct_answer.as_deref(), Some("ý"));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_id("id", "42").unwrap(), 42);
        assert_eq!(parse_id("id", "383.0").unwrap(), 383);
        assert!(parse_id("id", "").is_err());
        assert!(parse_id("id", "3.5").is_err());
        assert_eq!(parse_optional_id("ps", " ").unwrap(), None);
        assert_eq!(parse_correct("True").unwrap(), Some(true));
        assert_eq!(parse_correct("0").unwrap(), Some(false));
        assert_eq!(parse_correct("").unwrap(), None);
        assert!(parse_correct("maybe").is_err());
    }

    #[test]
    fn test_records_frame_roundtrip() {
        let (logs, questions, memberships, sets) = tables();
        let records = join(&logs, &questions, &memberships, &sets).unwrap();
        let frame = records_to_frame("processed", &records);
        assert_eq!(frame.headers().len(), RECORD_COLUMNS.len());
        let back = records_from_frame(&frame).unwrap();
        assert_eq!(back, records);
    }
}
