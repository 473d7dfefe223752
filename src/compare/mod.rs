//! Matrix Comparator
//!
//! Agreement between similarity measures: every matrix is flattened
//! row-major (diagonal included) and the flattened vectors are correlated
//! pairwise. Reporting only, inputs are never touched.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};
use crate::matrix::{pearson_pairwise, SimilarityMatrix};
use crate::sanitize::has_invalid_values;

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub names: Vec<String>,
    /// names.len() × names.len(), row-major
    pub coefficients: Vec<f64>,
}

impl CorrelationReport {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.coefficients[i * self.names.len() + j])
    }

    /// Each unordered pair once: `(a, b, r)`
    pub fn pairs(&self) -> Vec<(&str, &str, f64)> {
        let n = self.names.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((
                    self.names[i].as_str(),
                    self.names[j].as_str(),
                    self.coefficients[i * n + j],
                ));
            }
        }
        pairs
    }
}

/// Correlates every pair of named matrices.
///
/// Matrices are first brought onto common labels with [`align`]. NaN cells
/// drop out pair by pair.
pub fn compare(matrices: &[(&str, &SimilarityMatrix)]) -> Result<CorrelationReport> {
    let aligned = align(matrices)?;
    let flattened: Vec<Vec<f64>> = aligned.iter().map(SimilarityMatrix::flatten).collect();

    for ((name, _), vector) in matrices.iter().zip(&flattened) {
        if has_invalid_values(vector) {
            warn!(matrix = %name, "matrix has missing cells, compared pairwise");
        }
    }

    let n = matrices.len();
    let mut coefficients = vec![f64::NAN; n * n];
    for i in 0..n {
        for j in i..n {
            let r = pearson_pairwise(&flattened[i], &flattened[j]);
            coefficients[i * n + j] = r;
            coefficients[j * n + i] = r;
        }
    }

    let report = CorrelationReport {
        names: matrices.iter().map(|(name, _)| name.to_string()).collect(),
        coefficients,
    };
    for (a, b, r) in report.pairs() {
        info!(a, b, r, "similarity measures compared");
    }
    Ok(report)
}

/// Restricts every matrix to the labels all of them share, in the order of
/// the first matrix.
///
/// Matrices with identical labels pass through untouched. When the labels
/// have nothing in common (solutions against item ids, or repeated labels)
/// equally sized matrices are compared by position; otherwise
/// [`AnalysisError::LabelMismatch`].
pub fn align(matrices: &[(&str, &SimilarityMatrix)]) -> Result<Vec<SimilarityMatrix>> {
    let Some(&(first_name, first)) = matrices.first() else {
        return Ok(Vec::new());
    };
    let unchanged = || -> Vec<SimilarityMatrix> {
        matrices.iter().map(|(_, m)| (*m).clone()).collect()
    };

    if matrices.iter().all(|(_, m)| m.labels() == first.labels()) {
        return Ok(unchanged());
    }

    let shared: Vec<&str> = if matrices.iter().all(|(_, m)| m.has_unique_labels()) {
        first
            .labels()
            .iter()
            .map(String::as_str)
            .filter(|label| matrices[1..].iter().all(|(_, m)| m.index_of(label).is_some()))
            .collect()
    } else {
        Vec::new()
    };

    if shared.is_empty() {
        if let Some((other, _)) = matrices.iter().find(|(_, m)| m.len() != first.len()) {
            return Err(AnalysisError::LabelMismatch {
                first: first_name.to_string(),
                other: other.to_string(),
            });
        }
        warn!("matrix labels differ, comparing by position");
        return Ok(unchanged());
    }

    Ok(matrices
        .iter()
        .map(|(name, m)| {
            let indices: Vec<usize> = shared.iter().filter_map(|l| m.index_of(l)).collect();
            if indices.len() < m.len() {
                warn!(
                    matrix = %name,
                    kept = indices.len(),
                    dropped = m.len() - indices.len(),
                    "matrix restricted to shared labels"
                );
            }
            m.select(&indices)
        })
        .collect())
}
