//! Performance Similarity
//!
//! Item × item similarity from learner outcomes. Two items are similar when
//! the same learners tend to get both right or both wrong.
//!
//! Measures follow Pelánek, "Measuring similarity of educational items".
//! `DoublePearson` correlates the columns of the Pearson matrix once more; it
//! is kept as a named measure, reproducible but not a validated ground truth.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::correctness::CorrectnessMatrix;
use crate::matrix::{pearson_pairwise, SimilarityMatrix};
use crate::sanitize::drop_nans;
use crate::types::CorrelationMethod;

/// Pearson correlation between every pair of columns.
///
/// NaN cells are missing data, excluded pair by pair. A column correlates
/// with itself at exactly 1.0, or NaN when it has no variance.
pub fn correlate_columns(labels: Vec<String>, columns: &[Vec<f64>]) -> SimilarityMatrix {
    let n = columns.len();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (i..n)
                .map(|j| {
                    let r = pearson_pairwise(&columns[i], &columns[j]);
                    if i == j && !r.is_nan() {
                        1.0
                    } else {
                        r
                    }
                })
                .collect()
        })
        .collect();

    SimilarityMatrix::from_fn(labels, |i, j| {
        if i <= j {
            upper[i][j - i]
        } else {
            upper[j][i - j]
        }
    })
}

/// Pearson similarity of a correctness matrix, labels are the item ids
pub fn pearson_similarity(matrix: &CorrectnessMatrix, drop_incomplete: bool) -> SimilarityMatrix {
    let labels = matrix.item_ids().iter().map(|id| id.to_string()).collect();
    let similarity = correlate_columns(labels, &matrix.columns());
    apply_drop_policy(similarity, drop_incomplete)
}

/// Pearson applied to the columns of the Pearson matrix
pub fn doublepearson_similarity(
    matrix: &CorrectnessMatrix,
    drop_incomplete: bool,
) -> SimilarityMatrix {
    let first = pearson_similarity(matrix, drop_incomplete);
    repeat_pearson(&first, drop_incomplete)
}

/// One more Pearson pass over an existing similarity matrix
pub fn repeat_pearson(matrix: &SimilarityMatrix, drop_incomplete: bool) -> SimilarityMatrix {
    let similarity = correlate_columns(matrix.labels().to_vec(), &matrix.columns());
    apply_drop_policy(similarity, drop_incomplete)
}

/// Dispatches on `method`.
///
/// With `drop_incomplete` items are removed until no NaN remains; otherwise
/// NaN cells stay in the result.
pub fn performance_similarity(
    matrix: &CorrectnessMatrix,
    method: CorrelationMethod,
    drop_incomplete: bool,
) -> SimilarityMatrix {
    let (users, items) = matrix.shape();
    let similarity = match method {
        CorrelationMethod::Pearson => pearson_similarity(matrix, drop_incomplete),
        CorrelationMethod::DoublePearson => doublepearson_similarity(matrix, drop_incomplete),
    };
    info!(
        %method,
        users,
        items,
        retained = similarity.len(),
        "performance similarity computed"
    );
    similarity
}

fn apply_drop_policy(similarity: SimilarityMatrix, drop_incomplete: bool) -> SimilarityMatrix {
    if !drop_incomplete {
        return similarity;
    }
    let outcome = drop_nans(&similarity);
    if !outcome.dropped.is_empty() {
        debug!(dropped = ?outcome.dropped, "incomplete items removed");
    }
    outcome.matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::count_nans;
    use crate::types::AnswerRecord;

    fn record(id: i64, user: i64, item: i64, correct: bool) -> AnswerRecord {
        AnswerRecord {
            record_id: id,
            user_id: user,
            item_id: item,
            is_correct: Some(correct),
            question_template: None,
            correct_answer: None,
            practice_set_id: None,
            knowledge_component_id: None,
            url: None,
            exercise: None,
        }
    }

    fn grid(rows: &[&[Option<bool>]]) -> CorrectnessMatrix {
        let mut records = Vec::new();
        let mut id = 0;
        for (user, row) in rows.iter().enumerate() {
            for (item, cell) in row.iter().enumerate() {
                if let Some(c) = cell {
                    id += 1;
                    records.push(record(id, user as i64, item as i64, *c));
                }
            }
        }
        CorrectnessMatrix::from_records(&records)
    }

    const T: Option<bool> = Some(true);
    const F: Option<bool> = Some(false);
    const N: Option<bool> = None;

    #[test]
    fn test_pearson_identical_and_opposite_items() {
        let m = grid(&[&[T, T, F], &[F, F, T], &[T, T, F]]);
        let s = pearson_similarity(&m, false);
        assert!((s.get(0, 1) - 1.0).abs() < 1e-12);
        assert!((s.get(0, 2) + 1.0).abs() < 1e-12);
        assert!(s.is_symmetric(1e-12));
        for i in 0..3 {
            assert_eq!(s.get(i, i), 1.0);
        }
    }

    #[test]
    fn test_constant_column_has_nan_diagonal() {
        let m = grid(&[&[T, T], &[F, T], &[T, T]]);
        let s = pearson_similarity(&m, false);
        assert_eq!(s.get(0, 0), 1.0);
        assert!(s.get(1, 1).is_nan());
        assert!(s.get(0, 1).is_nan());
    }

    #[test]
    fn test_drop_incomplete_leaves_no_nan() {
        let m = grid(&[&[T, T, N], &[F, F, T], &[T, F, T], &[F, T, N]]);
        let kept = pearson_similarity(&m, false);
        assert!(count_nans(&kept) > 0);
        let dropped = pearson_similarity(&m, true);
        assert_eq!(count_nans(&dropped), 0);
        assert_eq!(dropped.labels(), &["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_doublepearson_is_reproducible() {
        let m = grid(&[&[T, T, F, F], &[F, T, T, F], &[T, F, F, T], &[T, T, T, F]]);
        let a = doublepearson_similarity(&m, false);
        let b = repeat_pearson(&pearson_similarity(&m, false), false);
        assert_eq!(a.labels(), b.labels());
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x.is_nan() && y.is_nan()) || x == y);
        }
        assert!(a.is_symmetric(1e-12));
    }

    #[test]
    fn test_dispatch() {
        let m = grid(&[&[T, F], &[F, T], &[T, T]]);
        let p = performance_similarity(&m, CorrelationMethod::Pearson, false);
        assert_eq!(p, pearson_similarity(&m, false));
        let d = performance_similarity(&m, CorrelationMethod::DoublePearson, false);
        assert_eq!(d.len(), 2);
    }
}
