//! Missing-value policies
//!
//! Helpers for NaN cells in similarity matrices:
//! - Invalid value detection
//! - Iterative removal of incomplete items
//! - Zero filling

use tracing::debug;

use crate::matrix::SimilarityMatrix;

/// Whether the slice holds any NaN or infinite value
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Number of NaN cells in the whole matrix
pub fn count_nans(matrix: &SimilarityMatrix) -> usize {
    matrix.values().iter().filter(|v| v.is_nan()).count()
}

/// NaN count of every column
pub fn nan_counts_by_column(matrix: &SimilarityMatrix) -> Vec<usize> {
    let n = matrix.len();
    let mut counts = vec![0; n];
    for i in 0..n {
        for (j, v) in matrix.row(i).iter().enumerate() {
            if v.is_nan() {
                counts[j] += 1;
            }
        }
    }
    counts
}

/// Result of [`drop_nans`]
#[derive(Debug, Clone)]
pub struct DropOutcome {
    pub matrix: SimilarityMatrix,
    /// Labels removed, in removal order
    pub dropped: Vec<String>,
}

/// Removes incomplete items until no NaN is left.
///
/// Each round drops the single row+column whose column holds the most NaNs.
/// Ties go to the lowest index. Dropping whole items keeps the labels of
/// complete items intact, which a row-wise `dropna` would not.
pub fn drop_nans(matrix: &SimilarityMatrix) -> DropOutcome {
    let mut current = matrix.clone();
    let mut dropped = Vec::new();

    loop {
        let counts = nan_counts_by_column(&current);
        let mut worst: Option<(usize, usize)> = None;
        for (idx, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match worst {
                Some((_, best)) if count <= best => {}
                _ => worst = Some((idx, count)),
            }
        }

        let Some((idx, count)) = worst else {
            break;
        };

        debug!(label = %current.labels()[idx], nan_count = count, "dropping incomplete item");
        dropped.push(current.labels()[idx].clone());
        current = current.without_index(idx);
    }

    DropOutcome {
        matrix: current,
        dropped,
    }
}

/// Alternative policy: keep every item and treat unmeasured pairs as 0
pub fn replace_nans_with_zero(matrix: &SimilarityMatrix) -> SimilarityMatrix {
    matrix.map(|v| if v.is_nan() { 0.0 } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(labels: &[&str], values: Vec<f64>) -> SimilarityMatrix {
        SimilarityMatrix::new(labels.iter().map(|s| s.to_string()).collect(), values).unwrap()
    }

    const NAN: f64 = f64::NAN;

    // ==================== has_invalid_values ====================

    #[test]
    fn test_has_invalid_values_with_valid_array() {
        assert!(!has_invalid_values(&[1.0, 2.0, 3.0]));
        assert!(!has_invalid_values(&[])); // empty slice
    }

    #[test]
    fn test_has_invalid_values_with_nan_or_inf() {
        assert!(has_invalid_values(&[1.0, f64::NAN, 3.0]));
        assert!(has_invalid_values(&[f64::NEG_INFINITY, 2.0]));
    }

    // ==================== drop_nans ====================

    #[test]
    fn test_drop_nans_complete_matrix_unchanged() {
        let m = matrix(&["a", "b"], vec![1.0, 0.5, 0.5, 1.0]);
        let outcome = drop_nans(&m);
        assert_eq!(outcome.matrix, m);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn test_drop_nans_removes_worst_item() {
        // c is unmeasurable against everything
        let m = matrix(
            &["a", "b", "c"],
            vec![
                1.0, 0.2, NAN, //
                0.2, 1.0, NAN, //
                NAN, NAN, NAN,
            ],
        );
        let outcome = drop_nans(&m);
        assert_eq!(outcome.dropped, vec!["c".to_string()]);
        assert_eq!(outcome.matrix.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(count_nans(&outcome.matrix), 0);
    }

    #[test]
    fn test_drop_nans_tie_breaks_on_lowest_index() {
        // a-b pair is missing, both columns carry one NaN
        let m = matrix(
            &["a", "b", "c"],
            vec![
                1.0, NAN, 0.1, //
                NAN, 1.0, 0.3, //
                0.1, 0.3, 1.0,
            ],
        );
        let outcome = drop_nans(&m);
        assert_eq!(outcome.dropped, vec!["a".to_string()]);
        assert_eq!(outcome.matrix.labels(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_drop_nans_is_idempotent() {
        let m = matrix(
            &["a", "b", "c", "d"],
            vec![
                1.0, NAN, 0.4, NAN, //
                NAN, 1.0, NAN, 0.2, //
                0.4, NAN, 1.0, 0.9, //
                NAN, 0.2, 0.9, NAN,
            ],
        );
        let once = drop_nans(&m).matrix;
        let twice = drop_nans(&once);
        assert_eq!(count_nans(&once), 0);
        assert_eq!(twice.matrix, once);
        assert!(twice.dropped.is_empty());
    }

    #[test]
    fn test_drop_nans_all_nan_ends_empty() {
        let m = matrix(&["a", "b"], vec![NAN; 4]);
        let outcome = drop_nans(&m);
        assert!(outcome.matrix.is_empty());
        assert_eq!(outcome.dropped.len(), 2);
    }

    #[test]
    fn test_nan_counts_by_column() {
        let m = matrix(&["a", "b"], vec![NAN, 1.0, NAN, NAN]);
        assert_eq!(nan_counts_by_column(&m), vec![2, 1]);
        assert_eq!(count_nans(&m), 3);
    }

    // ==================== replace_nans_with_zero ====================

    #[test]
    fn test_replace_nans_with_zero() {
        let m = matrix(&["a", "b"], vec![1.0, NAN, NAN, 1.0]);
        let filled = replace_nans_with_zero(&m);
        assert_eq!(filled.values(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(filled.labels(), m.labels());
    }
}
