//! Batch commands
//!
//! Each function loads what it needs from explicit paths, runs one analysis
//! and writes its table. Nothing here holds state between calls.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::compare::{compare, CorrelationReport};
use crate::config::Config;
use crate::correctness::{reshape, CorrectnessMatrix, Reshaped};
use crate::embedding::{embedding_similarity, EmbeddingOutcome, ExclusionPolicy, WordVectors};
use crate::error::{AnalysisError, Result};
use crate::join::{
    self, count_by_knowledge_component, count_by_practice_set, dedup_first, first_answers,
    for_knowledge_component, for_practice_sets, parse_id, records_from_frame, records_to_frame,
    KnowledgeComponentCount, PracticeSetCount,
};
use crate::lexical::edit_similarity;
use crate::matrix::SimilarityMatrix;
use crate::performance::performance_similarity;
use crate::solution::solution_set;
use crate::table::{
    read_frame, read_similarity_matrix, write_frame, write_similarity_matrix, write_table, Frame,
};
use crate::types::{
    AnswerRecord, CorrelationMethod, EditMeasure, ItemId, KnowledgeComponentId, LabelBy,
    PracticeSetId,
};

// ============================================================================
// Sources
// ============================================================================

/// The four raw tables
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub logs: Frame,
    pub questions: Frame,
    pub memberships: Frame,
    pub practice_sets: Frame,
}

impl SourceTables {
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            logs: read_frame(config.logs_path(), config.delimiter)?,
            questions: read_frame(config.questions_path(), config.delimiter)?,
            memberships: read_frame(config.memberships_path(), config.delimiter)?,
            practice_sets: read_frame(config.practice_sets_path(), config.delimiter)?,
        })
    }

    pub fn join(&self) -> Result<Vec<AnswerRecord>> {
        join::join(
            &self.logs,
            &self.questions,
            &self.memberships,
            &self.practice_sets,
        )
    }
}

/// Which answers a prepared table keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    PracticeSets(Vec<PracticeSetId>),
    KnowledgeComponent(KnowledgeComponentId),
}

impl Selection {
    pub fn apply(&self, records: &[AnswerRecord]) -> Vec<AnswerRecord> {
        match self {
            Selection::All => dedup_first(records),
            Selection::PracticeSets(ids) => for_practice_sets(records, ids),
            Selection::KnowledgeComponent(kc) => for_knowledge_component(records, *kc),
        }
    }
}

/// Joins the raw tables, selects and writes the processed answer table.
///
/// The output uses the input delimiter so later commands can read it back.
pub fn prepare(
    config: &Config,
    selection: &Selection,
    output: impl AsRef<Path>,
) -> Result<Vec<AnswerRecord>> {
    let records = SourceTables::load(config)?.join()?;
    let selected = selection.apply(&records);
    if selected.is_empty() {
        warn!(?selection, "selection matched no answers");
    }

    let frame = records_to_frame("answers", &selected);
    write_frame(output, &frame, config.delimiter)?;
    info!(?selection, records = selected.len(), "answer table prepared");
    Ok(selected)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountBy {
    PracticeSet,
    KnowledgeComponent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counts {
    PracticeSets(Vec<PracticeSetCount>),
    KnowledgeComponents(Vec<KnowledgeComponentCount>),
}

impl Counts {
    pub fn len(&self) -> usize {
        match self {
            Counts::PracticeSets(rows) => rows.len(),
            Counts::KnowledgeComponents(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct `(user, item)` answers per practice set or knowledge component.
///
/// Only the first answer per `(user, item)` counts, but an item shared by
/// several practice sets counts in each of them.
pub fn counts(config: &Config, by: CountBy, output: impl AsRef<Path>) -> Result<Counts> {
    let records = first_answers(&SourceTables::load(config)?.join()?);
    let counts = match by {
        CountBy::PracticeSet => {
            let rows = count_by_practice_set(&records);
            write_table(
                output,
                PracticeSetCount::HEADERS,
                rows.iter().map(PracticeSetCount::to_row),
            )?;
            Counts::PracticeSets(rows)
        }
        CountBy::KnowledgeComponent => {
            let rows = count_by_knowledge_component(&records);
            write_table(
                output,
                KnowledgeComponentCount::HEADERS,
                rows.iter().map(KnowledgeComponentCount::to_row),
            )?;
            Counts::KnowledgeComponents(rows)
        }
    };
    Ok(counts)
}

// ============================================================================
// Similarity commands
// ============================================================================

pub fn load_records(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<AnswerRecord>> {
    records_from_frame(&read_frame(path, delimiter)?)
}

/// Correctness matrix from an answer table, or from a table that is already
/// pivoted (users × items)
pub fn load_correctness(path: impl AsRef<Path>, delimiter: u8) -> Result<CorrectnessMatrix> {
    match reshape(read_frame(path, delimiter)?)? {
        Reshaped::Matrix(matrix) => Ok(matrix),
        Reshaped::Unchanged { frame, .. } => CorrectnessMatrix::from_pivoted(&frame),
    }
}

pub fn performance(
    input: impl AsRef<Path>,
    delimiter: u8,
    method: CorrelationMethod,
    drop_incomplete: bool,
    output: impl AsRef<Path>,
) -> Result<SimilarityMatrix> {
    performance_for_items(input, delimiter, method, drop_incomplete, None, output)
}

/// [`performance`] over a subset of items, e.g. the items an embedding
/// matrix kept, so both matrices describe the same items
pub fn performance_for_items(
    input: impl AsRef<Path>,
    delimiter: u8,
    method: CorrelationMethod,
    drop_incomplete: bool,
    items: Option<&[ItemId]>,
    output: impl AsRef<Path>,
) -> Result<SimilarityMatrix> {
    let mut correctness = load_correctness(input, delimiter)?;
    if let Some(items) = items {
        correctness = correctness.restrict_items(items);
        info!(
            listed = items.len(),
            kept = correctness.item_ids().len(),
            "correctness restricted to listed items"
        );
    }
    let similarity = performance_similarity(&correctness, method, drop_incomplete);
    write_similarity_matrix(output, &similarity)?;
    Ok(similarity)
}

/// Item ids labelling a persisted similarity matrix
pub fn item_ids_from_matrix(path: impl AsRef<Path>) -> Result<Vec<ItemId>> {
    read_similarity_matrix(path)?
        .labels()
        .iter()
        .map(|label| parse_id("item", label))
        .collect()
}

/// Solutions of every item in an answer table, ascending item id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSolutions {
    pub item_ids: Vec<ItemId>,
    pub full_solutions: Vec<String>,
    pub fill_in: Vec<String>,
}

impl ItemSolutions {
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    pub fn labels(&self, by: LabelBy) -> Vec<String> {
        match by {
            LabelBy::ItemId => self.item_ids.iter().map(ToString::to_string).collect(),
            LabelBy::Solution => self.full_solutions.clone(),
        }
    }
}

/// Items repeat in an answer table; the first record of each item is used.
pub fn item_solutions(records: &[AnswerRecord]) -> Result<ItemSolutions> {
    let mut first_by_item: BTreeMap<ItemId, &AnswerRecord> = BTreeMap::new();
    for record in records {
        first_by_item.entry(record.item_id).or_insert(record);
    }

    let mut solutions = ItemSolutions {
        item_ids: Vec::with_capacity(first_by_item.len()),
        full_solutions: Vec::with_capacity(first_by_item.len()),
        fill_in: Vec::with_capacity(first_by_item.len()),
    };
    for (&item_id, record) in &first_by_item {
        let template = record
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
        let set = solution_set(template, answer)?;
        solutions.item_ids.push(item_id);
        solutions.full_solutions.push(set.full_solution);
        solutions.fill_in.push(set.fill_in);
    }
    Ok(solutions)
}

pub fn lexical(
    input: impl AsRef<Path>,
    delimiter: u8,
    measure: EditMeasure,
    label: LabelBy,
    output: impl AsRef<Path>,
) -> Result<SimilarityMatrix> {
    let items = item_solutions(&load_records(input, delimiter)?)?;
    let similarity = edit_similarity(&items.labels(label), &items.fill_in, measure)?;
    write_similarity_matrix(output, &similarity)?;
    Ok(similarity)
}

pub fn embedding(
    input: impl AsRef<Path>,
    delimiter: u8,
    model: impl AsRef<Path>,
    exclusions: &ExclusionPolicy,
    label: LabelBy,
    output: impl AsRef<Path>,
) -> Result<EmbeddingOutcome> {
    let items = item_solutions(&load_records(input, delimiter)?)?;
    let vectors = WordVectors::load(model)?;
    let outcome =
        embedding_similarity(&vectors, &items.labels(label), &items.fill_in, exclusions)?;
    write_similarity_matrix(output, &outcome.matrix)?;
    Ok(outcome)
}

/// Compares persisted similarity matrices, each named after its file stem
pub fn compare_files(paths: &[PathBuf]) -> Result<CorrelationReport> {
    let matrices = paths
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok((name, read_similarity_matrix(path)?))
        })
        .collect::<Result<Vec<(String, SimilarityMatrix)>>>()?;

    let named: Vec<(&str, &SimilarityMatrix)> = matrices
        .iter()
        .map(|(name, matrix)| (name.as_str(), matrix))
        .collect();
    compare(&named)
}
