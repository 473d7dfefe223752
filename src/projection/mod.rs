//! Projection export
//!
//! Points handed to an external renderer (scatterplots, heatmaps). Nothing in
//! this crate draws; a renderer implements [`ProjectionRenderer`].

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::matrix::SimilarityMatrix;
use crate::types::{AnswerRecord, PracticeSetId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub practice_set: Option<PracticeSetId>,
    /// Manual label group, 0 when unlabelled
    pub group: u32,
}

/// Consumer of projected points
pub trait ProjectionRenderer {
    type Output;

    fn render(&self, points: &[ProjectionPoint], title: &str) -> Result<Self::Output>;
}

/// Zips coordinates with item metadata.
///
/// `groups` is optional; without it every point is in group 0.
pub fn points(
    x: &[f64],
    y: &[f64],
    records: &[AnswerRecord],
    groups: Option<&[u32]>,
) -> Result<Vec<ProjectionPoint>> {
    for len in [y.len(), records.len()]
        .into_iter()
        .chain(groups.map(<[u32]>::len))
    {
        if len != x.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: x.len(),
                actual: len,
            });
        }
    }

    Ok(records
        .iter()
        .enumerate()
        .map(|(i, record)| ProjectionPoint {
            x: x[i],
            y: y[i],
            label: record
                .question_template
                .clone()
                .unwrap_or_else(|| record.item_id.to_string()),
            practice_set: record.practice_set_id,
            group: groups.map(|g| g[i]).unwrap_or(0),
        })
        .collect())
}

/// Manual label per solution: 0 if in no group, else the 1-based group index.
///
/// A solution listed in several groups takes the last one. Returns a new
/// vector; the inputs are not touched.
pub fn assign_labels(full_solutions: &[String], label_groups: &[Vec<String>]) -> Vec<u32> {
    let mut lookup: HashMap<&str, u32> = HashMap::new();
    for (index, group) in label_groups.iter().enumerate() {
        for solution in group {
            lookup.insert(solution.as_str(), index as u32 + 1);
        }
    }
    full_solutions
        .iter()
        .map(|s| lookup.get(s.as_str()).copied().unwrap_or(0))
        .collect()
}

/// Template and practice set for every row of a matrix labelled by item id.
///
/// Labels that are not a known item id give `None`s.
pub fn labels_and_practice_sets(
    matrix: &SimilarityMatrix,
    records: &[AnswerRecord],
) -> Vec<(Option<String>, Option<PracticeSetId>)> {
    let mut first_by_item: HashMap<String, &AnswerRecord> = HashMap::new();
    for record in records {
        first_by_item
            .entry(record.item_id.to_string())
            .or_insert(record);
    }

    matrix
        .labels()
        .iter()
        .map(|label| match first_by_item.get(label) {
            Some(r) => (r.question_template.clone(), r.practice_set_id),
            None => (None, None),
        })
        .collect()
}

/// Writes points as a JSON array
pub fn write_points_json(path: impl AsRef<Path>, points: &[ProjectionPoint]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), points)?;
    info!(path = %path.display(), points = points.len(), "projection points written");
    Ok(())
}
