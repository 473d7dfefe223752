//! Correctness Matrix
//!
//! Users × items grid of first-answer outcomes. Rows and columns are sorted
//! by id; `None` marks a pair the user never answered.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AnalysisError, Result};
use crate::join::{dedup_first, parse_correct, parse_id, records_from_frame};
use crate::table::Frame;
use crate::types::{AnswerRecord, ItemId, UserId};

/// Columns a frame needs before it can be reshaped
pub const RESHAPE_COLUMNS: &[&str] = &["user", "question_id", "correct"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectnessMatrix {
    users: Vec<UserId>,
    items: Vec<ItemId>,
    /// users.len() * items.len(), row-major
    cells: Vec<Option<bool>>,
}

impl CorrectnessMatrix {
    /// Reshapes answer records; only the first answer per `(user, item)` counts
    pub fn from_records(records: &[AnswerRecord]) -> Self {
        let records = dedup_first(records);

        let users: Vec<UserId> = records
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items: Vec<ItemId> = records
            .iter()
            .map(|r| r.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_pos: HashMap<UserId, usize> =
            users.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let item_pos: HashMap<ItemId, usize> =
            items.iter().enumerate().map(|(j, &q)| (q, j)).collect();

        let mut cells = vec![None; users.len() * items.len()];
        for record in &records {
            let i = user_pos[&record.user_id];
            let j = item_pos[&record.item_id];
            cells[i * items.len() + j] = record.is_correct;
        }

        Self {
            users,
            items,
            cells,
        }
    }

    /// Reads an already pivoted table: first column user ids, every other
    /// header an item id, cells `1/0` or empty.
    pub fn from_pivoted(frame: &Frame) -> Result<Self> {
        let headers = frame.headers();
        if headers.is_empty() {
            return Err(AnalysisError::MissingColumn {
                table: frame.name().to_string(),
                column: "user".to_string(),
            });
        }

        let items = headers[1..]
            .iter()
            .map(|h| parse_id("item", h))
            .collect::<Result<Vec<ItemId>>>()?;

        let mut users = Vec::with_capacity(frame.len());
        let mut cells = Vec::with_capacity(frame.len() * items.len());
        for row in 0..frame.len() {
            users.push(parse_id("user", frame.cell(row, 0))?);
            for column in 1..headers.len() {
                cells.push(parse_correct(frame.cell(row, column))?);
            }
        }

        Ok(Self {
            users,
            items,
            cells,
        })
    }

    /// Copy limited to `items`, the way the answers would look had only
    /// those items been asked. Users left without any answer disappear;
    /// unknown ids are ignored.
    pub fn restrict_items(&self, items: &[ItemId]) -> Self {
        let wanted: HashSet<ItemId> = items.iter().copied().collect();
        let keep: Vec<usize> = (0..self.items.len())
            .filter(|&j| wanted.contains(&self.items[j]))
            .collect();

        let mut users = Vec::new();
        let mut cells = Vec::new();
        for (i, &user) in self.users.iter().enumerate() {
            let row: Vec<Option<bool>> = keep.iter().map(|&j| self.get(i, j)).collect();
            if row.iter().any(Option::is_some) {
                users.push(user);
                cells.extend(row);
            }
        }

        Self {
            users,
            items: keep.iter().map(|&j| self.items[j]).collect(),
            cells,
        }
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.users
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.items
    }

    pub fn get(&self, user: usize, item: usize) -> Option<bool> {
        self.cells[user * self.items.len() + item]
    }

    /// Item column as numbers: 1.0 correct, 0.0 incorrect, NaN absent
    pub fn column(&self, item: usize) -> Vec<f64> {
        (0..self.users.len())
            .map(|user| match self.get(user, item) {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => f64::NAN,
            })
            .collect()
    }

    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.items.len()).map(|j| self.column(j)).collect()
    }

    /// Number of answered cells
    pub fn observed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.users.len(), self.items.len())
    }
}

/// Why a frame was left as it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureWarning {
    pub table: String,
    pub missing_columns: Vec<String>,
}

impl std::fmt::Display for StructureWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "table '{}' is already reshaped or lacks columns {:?}",
            self.table, self.missing_columns
        )
    }
}

/// Result of [`reshape`]
#[derive(Debug, Clone)]
pub enum Reshaped {
    Matrix(CorrectnessMatrix),
    /// The input did not look like an answer table and is handed back as is
    Unchanged {
        frame: Frame,
        warning: StructureWarning,
    },
}

impl Reshaped {
    pub fn matrix(self) -> Option<CorrectnessMatrix> {
        match self {
            Reshaped::Matrix(m) => Some(m),
            Reshaped::Unchanged { .. } => None,
        }
    }

    pub fn warning(&self) -> Option<&StructureWarning> {
        match self {
            Reshaped::Matrix(_) => None,
            Reshaped::Unchanged { warning, .. } => Some(warning),
        }
    }
}

/// Reshapes a persisted answer table.
///
/// Frames lacking the answer columns, typically an already pivoted matrix,
/// are returned unchanged together with a warning; nothing fails.
pub fn reshape(frame: Frame) -> Result<Reshaped> {
    let missing_columns: Vec<String> = RESHAPE_COLUMNS
        .iter()
        .filter(|c| frame.column_index(c).is_none())
        .map(|c| c.to_string())
        .collect();

    if !missing_columns.is_empty() {
        let warning = StructureWarning {
            table: frame.name().to_string(),
            missing_columns,
        };
        warn!(%warning, "correctness reshape skipped");
        return Ok(Reshaped::Unchanged { frame, warning });
    }

    let records = records_from_frame(&frame)?;
    Ok(Reshaped::Matrix(CorrectnessMatrix::from_records(&records)))
}
