use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::types::EPSILON;

/// Square item × item matrix, row-major, indexed by labels.
///
/// Labels may repeat: two items sharing the same resolved solution are two
/// rows. `NaN` marks a pair that could not be measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> Result<Self> {
        let n = labels.len();
        if values.len() != n * n {
            return Err(AnalysisError::DimensionMismatch {
                expected: n * n,
                actual: values.len(),
            });
        }
        Ok(Self { labels, values })
    }

    /// Fills every cell from `f(i, j)`
    pub fn from_fn(labels: Vec<String>, f: impl Fn(usize, usize) -> f64) -> Self {
        let n = labels.len();
        let mut values = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                values.push(f(i, j));
            }
        }
        Self { labels, values }
    }

    /// Builds from already computed rows
    pub fn from_rows(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = labels.len();
        if rows.len() != n {
            return Err(AnalysisError::DimensionMismatch {
                expected: n,
                actual: rows.len(),
            });
        }
        let mut values = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(AnalysisError::DimensionMismatch {
                    expected: n,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self { labels, values })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.len()).map(|i| self.get(i, j)).collect()
    }

    /// Position of the first row carrying `label`
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Row-major copy of all cells, diagonal included
    pub fn flatten(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// Copy without row and column `index`
    pub fn without_index(&self, index: usize) -> Self {
        let n = self.len();
        let labels = self
            .labels
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, l)| l.clone())
            .collect();
        let mut values = Vec::with_capacity((n - 1) * (n - 1));
        for i in (0..n).filter(|&i| i != index) {
            for j in (0..n).filter(|&j| j != index) {
                values.push(self.get(i, j));
            }
        }
        Self { labels, values }
    }

    /// Copy holding only rows and columns at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        let mut values = Vec::with_capacity(indices.len() * indices.len());
        for &i in indices {
            for &j in indices {
                values.push(self.get(i, j));
            }
        }
        Self { labels, values }
    }

    pub fn has_unique_labels(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.len());
        self.labels.iter().all(|l| seen.insert(l.as_str()))
    }

    /// Applies `f` to every cell
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            labels: self.labels.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// NaN-aware symmetry check
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.get(i, j), self.get(j, i));
                if a.is_nan() != b.is_nan() {
                    return false;
                }
                if !a.is_nan() && (a - b).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// Every column as its own vector, in column order
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|j| self.column(j)).collect()
    }
}

/// Pairwise-complete Pearson correlation.
///
/// Positions where either side is NaN are skipped. Fewer than two paired
/// observations or a zero-variance side gives NaN.
pub fn pearson_pairwise(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for &(a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < EPSILON {
        return f64::NAN;
    }

    (cov / denom).clamp(-1.0, 1.0)
}

/// Cosine similarity of two embedding vectors; NaN if either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < EPSILON {
        return f64::NAN;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item{i}")).collect()
    }

    #[test]
    fn test_new_rejects_wrong_size() {
        let err = SimilarityMatrix::new(labels(2), vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_from_fn_and_get() {
        let m = SimilarityMatrix::from_fn(labels(3), |i, j| (i * 10 + j) as f64);
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(1, 2), 12.0);
        assert_eq!(m.row(2), &[20.0, 21.0, 22.0]);
        assert_eq!(m.column(1), vec![1.0, 11.0, 21.0]);
    }

    #[test]
    fn test_without_index() {
        let m = SimilarityMatrix::from_fn(labels(3), |i, j| (i * 10 + j) as f64);
        let reduced = m.without_index(1);
        assert_eq!(reduced.labels(), &["item0".to_string(), "item2".to_string()]);
        assert_eq!(reduced.values(), &[0.0, 2.0, 20.0, 22.0]);
    }

    #[test]
    fn test_select_reorders_rows_and_columns() {
        let m = SimilarityMatrix::from_fn(labels(3), |i, j| (i * 10 + j) as f64);
        let picked = m.select(&[2, 0]);
        assert_eq!(picked.labels(), &["item2", "item0"]);
        assert_eq!(picked.values(), &[22.0, 20.0, 2.0, 0.0]);
        assert!(m.has_unique_labels());
        assert!(!picked.select(&[0, 0]).has_unique_labels());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = SimilarityMatrix::from_rows(labels(2), vec![vec![1.0, 0.5], vec![0.5]]);
        assert!(err.is_err());
    }

    #[test]
    fn test_is_symmetric_with_nan() {
        let m = SimilarityMatrix::new(labels(2), vec![1.0, f64::NAN, f64::NAN, 1.0]).unwrap();
        assert!(m.is_symmetric(1e-12));
        let m = SimilarityMatrix::new(labels(2), vec![1.0, 0.3, f64::NAN, 1.0]).unwrap();
        assert!(!m.is_symmetric(1e-12));
    }

    #[test]
    fn test_duplicate_labels_allowed() {
        let m = SimilarityMatrix::from_fn(vec!["býk".into(), "býk".into()], |_, _| 1.0);
        assert_eq!(m.len(), 2);
        assert_eq!(m.index_of("býk"), Some(0));
    }

    #[test]
    fn test_pearson_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson_pairwise(&x, &y) - 1.0).abs() < 1e-12);
        let z = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson_pairwise(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_skips_missing_pairs() {
        let x = [1.0, f64::NAN, 3.0, 5.0];
        let y = [1.0, 100.0, 3.0, f64::NAN];
        // only (1,1) and (3,3) remain
        assert!((pearson_pairwise(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert!(pearson_pairwise(&[1.0, 1.0, 1.0], &[0.0, 1.0, 0.0]).is_nan());
        assert!(pearson_pairwise(&[1.0], &[1.0]).is_nan());
        assert!(pearson_pairwise(&[], &[]).is_nan());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).is_nan());
    }
}
