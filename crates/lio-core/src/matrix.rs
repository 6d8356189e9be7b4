//! Labeled coefficient and result matrices.
//!
//! Two storage states are kept strictly apart:
//!
//! - [`SparseLabeledMatrix`] is the *stored* form. It omits structural zeros
//!   (CSR via `sprs`) and may carry NaN sentinels written by loaders that use
//!   NaN to mean "absent".
//! - [`LabeledMatrix`] is the *logical dense* form (a `faer` matrix). Every
//!   absent or NaN entry has been replaced by `0.0`, so it is safe to feed
//!   into arithmetic.
//!
//! ```text
//! stored sparse ──to_dense()──▶ logical dense ──to_sparse()──▶ stored sparse
//!   (NaN = absent)                (0.0 only)                    (0.0 = absent)
//! ```
//!
//! The round trip preserves every non-zero value bit for bit. Signed zero is
//! normalised: `-0.0` is not stored and comes back as `+0.0`.
//!
//! Both forms are immutable once built: every transformation returns a new
//! value so solver runs stay reproducible.

use crate::error::{LioError, LioResult};
use crate::labels::{LabelAxis, SectorLabel};
use faer::Mat;
use sprs::{CsMat, TriMat};
use tracing::debug;

/// An entry counts as absent when it is an exact zero or a NaN sentinel.
#[inline]
fn is_absent(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

fn check_axes(name: &str, shape: (usize, usize), rows: &LabelAxis, cols: &LabelAxis) -> LioResult<()> {
    if rows.len() != shape.0 {
        return Err(LioError::ShapeMismatch {
            matrix: name.to_string(),
            detail: format!("{} row labels for {} rows", rows.len(), shape.0),
        });
    }
    if cols.len() != shape.1 {
        return Err(LioError::ShapeMismatch {
            matrix: name.to_string(),
            detail: format!("{} column labels for {} columns", cols.len(), shape.1),
        });
    }
    Ok(())
}

/// Dense matrix with `(sector, region)` labels on both axes.
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    name: String,
    values: Mat<f64>,
    rows: LabelAxis,
    cols: LabelAxis,
}

impl LabeledMatrix {
    /// Wrap a dense matrix, checking that both label axes match its shape.
    pub fn new(
        name: impl Into<String>,
        values: Mat<f64>,
        rows: LabelAxis,
        cols: LabelAxis,
    ) -> LioResult<Self> {
        let name = name.into();
        check_axes(&name, (values.nrows(), values.ncols()), &rows, &cols)?;
        Ok(Self {
            name,
            values,
            rows,
            cols,
        })
    }

    /// Build from row-major nested vectors.
    pub fn from_rows(
        name: impl Into<String>,
        data: &[Vec<f64>],
        rows: LabelAxis,
        cols: LabelAxis,
    ) -> LioResult<Self> {
        let name = name.into();
        let ncols = cols.len();
        if let Some((i, row)) = data.iter().enumerate().find(|(_, row)| row.len() != ncols) {
            return Err(LioError::ShapeMismatch {
                matrix: name,
                detail: format!("row {} has {} entries, expected {}", i, row.len(), ncols),
            });
        }
        let values = Mat::from_fn(data.len(), ncols, |i, j| data[i][j]);
        Self::new(name, values, rows, cols)
    }

    /// Build a self-indexed (coefficient) matrix where both axes share `labels`.
    pub fn square(name: impl Into<String>, data: &[Vec<f64>], labels: LabelAxis) -> LioResult<Self> {
        Self::from_rows(name, data, labels.clone(), labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn values(&self) -> &Mat<f64> {
        &self.values
    }

    pub fn rows(&self) -> &LabelAxis {
        &self.rows
    }

    pub fn cols(&self) -> &LabelAxis {
        &self.cols
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Entry at `(i, j)`. Panics when out of bounds, like slice indexing.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values.read(i, j)
    }

    /// Check the coefficient-matrix invariant: square, and row labels equal
    /// column labels in content and order.
    pub fn ensure_self_indexed(&self) -> LioResult<()> {
        if !self.is_square() {
            return Err(LioError::ShapeMismatch {
                matrix: self.name.clone(),
                detail: format!(
                    "coefficient matrix must be square, got {}x{}",
                    self.nrows(),
                    self.ncols()
                ),
            });
        }
        if let Some(pos) = self.rows.first_divergence(&self.cols) {
            return Err(LioError::LabelAlignment {
                matrix: self.name.clone(),
                detail: format!(
                    "row and column labels diverge at position {} ({:?} vs {:?})",
                    pos,
                    self.rows.get(pos).map(ToString::to_string),
                    self.cols.get(pos).map(ToString::to_string)
                ),
            });
        }
        Ok(())
    }

    /// First NaN or infinite entry in column-major order.
    pub fn first_non_finite(&self) -> Option<(usize, usize, f64)> {
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                let v = self.values.read(i, j);
                if !v.is_finite() {
                    return Some((i, j, v));
                }
            }
        }
        None
    }

    /// Logical dense copy with every NaN replaced by `0.0`.
    ///
    /// Idempotent: applying it to its own output returns an identical matrix.
    pub fn to_dense(&self) -> LabeledMatrix {
        let values = Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            let v = self.values.read(i, j);
            if v.is_nan() {
                0.0
            } else {
                v
            }
        });
        LabeledMatrix {
            name: self.name.clone(),
            values,
            rows: self.rows.clone(),
            cols: self.cols.clone(),
        }
    }

    /// Compact copy where exact zeros (and NaN) are not stored. `-0.0` counts
    /// as zero, so it reads back as `+0.0`.
    pub fn to_sparse(&self) -> SparseLabeledMatrix {
        let mut triplets = TriMat::new((self.nrows(), self.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                let v = self.values.read(i, j);
                if !is_absent(v) {
                    triplets.add_triplet(i, j, v);
                }
            }
        }
        SparseLabeledMatrix {
            name: self.name.clone(),
            values: triplets.to_csr(),
            rows: self.rows.clone(),
            cols: self.cols.clone(),
        }
    }

    pub fn row_is_zero(&self, i: usize) -> bool {
        (0..self.ncols()).all(|j| is_absent(self.values.read(i, j)))
    }

    pub fn column_is_zero(&self, j: usize) -> bool {
        (0..self.nrows()).all(|i| is_absent(self.values.read(i, j)))
    }

    /// Positions of all-zero rows.
    pub fn zero_rows(&self) -> Vec<usize> {
        (0..self.nrows()).filter(|&i| self.row_is_zero(i)).collect()
    }

    /// Positions of all-zero columns.
    pub fn zero_columns(&self) -> Vec<usize> {
        (0..self.ncols()).filter(|&j| self.column_is_zero(j)).collect()
    }

    /// Row positions belonging to `region`, in row order.
    pub fn region_positions(&self, region: &str) -> Vec<usize> {
        self.rows.positions_in_region(region)
    }

    /// Row labels whose sector name contains `needle`.
    pub fn sectors_containing(&self, needle: &str) -> Vec<SectorLabel> {
        self.rows.sectors_containing(needle)
    }

    /// New matrix keeping only the given row and column positions.
    pub fn select(&self, row_positions: &[usize], col_positions: &[usize]) -> LioResult<LabeledMatrix> {
        let rows = self
            .rows
            .select(row_positions)
            .map_err(|e| e.in_matrix(&self.name))?;
        let cols = self
            .cols
            .select(col_positions)
            .map_err(|e| e.in_matrix(&self.name))?;
        let values = Mat::from_fn(row_positions.len(), col_positions.len(), |i, j| {
            self.values.read(row_positions[i], col_positions[j])
        });
        Ok(LabeledMatrix {
            name: self.name.clone(),
            values,
            rows,
            cols,
        })
    }
}

/// Sparse (CSR) matrix with `(sector, region)` labels on both axes.
#[derive(Debug, Clone)]
pub struct SparseLabeledMatrix {
    name: String,
    values: CsMat<f64>,
    rows: LabelAxis,
    cols: LabelAxis,
}

impl SparseLabeledMatrix {
    pub fn new(
        name: impl Into<String>,
        values: CsMat<f64>,
        rows: LabelAxis,
        cols: LabelAxis,
    ) -> LioResult<Self> {
        let name = name.into();
        check_axes(&name, (values.rows(), values.cols()), &rows, &cols)?;
        Ok(Self {
            name,
            values,
            rows,
            cols,
        })
    }

    /// Build from `(row, col, value)` triplets. Exact zeros are dropped,
    /// NaN sentinels are stored as-is, duplicate coordinates are summed.
    pub fn from_triplets(
        name: impl Into<String>,
        rows: LabelAxis,
        cols: LabelAxis,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> LioResult<Self> {
        let name = name.into();
        let shape = (rows.len(), cols.len());
        let mut tri = TriMat::new(shape);
        for (i, j, v) in triplets {
            if i >= shape.0 || j >= shape.1 {
                return Err(LioError::ShapeMismatch {
                    matrix: name,
                    detail: format!("entry ({i}, {j}) outside {}x{} matrix", shape.0, shape.1),
                });
            }
            if v != 0.0 {
                tri.add_triplet(i, j, v);
            }
        }
        Self::new(name, tri.to_csr(), rows, cols)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn values(&self) -> &CsMat<f64> {
        &self.values
    }

    pub fn rows(&self) -> &LabelAxis {
        &self.rows
    }

    pub fn cols(&self) -> &LabelAxis {
        &self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.values.rows(), self.values.cols())
    }

    /// Number of stored entries (NaN sentinels included).
    pub fn nnz(&self) -> usize {
        self.values.nnz()
    }

    /// Stored fraction of the full matrix (nnz / (rows × cols)).
    pub fn density(&self) -> f64 {
        let (r, c) = self.shape();
        if r == 0 || c == 0 {
            return 0.0;
        }
        self.nnz() as f64 / (r * c) as f64
    }

    /// Memory usage in bytes (approximate).
    pub fn memory_bytes(&self) -> usize {
        // CSR format: nnz values (f64) + nnz column indices (usize) + (rows+1) pointers (usize)
        let nnz = self.nnz();
        nnz * 8 + nnz * 8 + (self.values.rows() + 1) * 8
    }

    /// Logical value at `(i, j)`: absent and NaN entries read as `0.0`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self.values.get(i, j) {
            Some(v) if !v.is_nan() => *v,
            _ => 0.0,
        }
    }

    /// Stored entries as `(row, col, value)`, row-major.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.values.iter().map(|(v, (i, j))| (i, j, *v))
    }

    /// Materialize the logical dense form. Absent entries and NaN sentinels
    /// both become `0.0`.
    pub fn to_dense(&self) -> LabeledMatrix {
        let (r, c) = self.shape();
        let mut values = Mat::<f64>::zeros(r, c);
        let mut sentinels = 0usize;
        for (v, (i, j)) in self.values.iter() {
            if v.is_nan() {
                sentinels += 1;
            } else {
                values.write(i, j, *v);
            }
        }
        if sentinels > 0 {
            debug!(matrix = %self.name, sentinels, "normalized NaN sentinels to 0.0");
        }
        LabeledMatrix {
            name: self.name.clone(),
            values,
            rows: self.rows.clone(),
            cols: self.cols.clone(),
        }
    }

    /// Compact copy without stored zeros or NaN sentinels.
    pub fn to_sparse(&self) -> SparseLabeledMatrix {
        let mut tri = TriMat::new(self.shape());
        for (v, (i, j)) in self.values.iter() {
            if !is_absent(*v) {
                tri.add_triplet(i, j, *v);
            }
        }
        SparseLabeledMatrix {
            name: self.name.clone(),
            values: tri.to_csr(),
            rows: self.rows.clone(),
            cols: self.cols.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> LabelAxis {
        LabelAxis::new(
            (0..n)
                .map(|i| SectorLabel::new(format!("S{i}"), if i % 2 == 0 { "ES" } else { "FR" }))
                .collect(),
        )
        .unwrap()
    }

    fn sample() -> LabeledMatrix {
        LabeledMatrix::square(
            "sample",
            &[
                vec![0.0, 0.25, 0.0],
                vec![0.0, 0.0, -1.5e-9],
                vec![0.125, 0.0, 0.0],
            ],
            labels(3),
        )
        .unwrap()
    }

    fn assert_bit_identical(a: &LabeledMatrix, b: &LabeledMatrix) {
        assert_eq!(a.shape(), b.shape());
        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.cols(), b.cols());
        for i in 0..a.nrows() {
            for j in 0..a.ncols() {
                assert_eq!(a.get(i, j).to_bits(), b.get(i, j).to_bits(), "({i}, {j})");
            }
        }
    }

    #[test]
    fn test_sparse_roundtrip_is_exact() {
        let m = sample();
        let sparse = m.to_sparse();
        assert_eq!(sparse.nnz(), 3);
        assert_bit_identical(&sparse.to_dense(), &m);
    }

    #[test]
    fn test_negative_zero_normalised_in_compact_form() {
        let m = LabeledMatrix::square("signed", &[vec![-0.0, 0.5], vec![0.25, 0.0]], labels(2))
            .unwrap();
        let sparse = m.to_sparse();
        assert_eq!(sparse.nnz(), 2);

        let back = sparse.to_dense();
        assert_eq!(back.get(0, 0), m.get(0, 0));
        assert_eq!(back.get(0, 0).to_bits(), 0.0f64.to_bits());
        assert_eq!(back.get(0, 1).to_bits(), m.get(0, 1).to_bits());
    }

    #[test]
    fn test_to_dense_replaces_nan_and_is_idempotent() {
        let sparse = SparseLabeledMatrix::from_triplets(
            "nan",
            labels(2),
            labels(2),
            vec![(0, 1, f64::NAN), (1, 0, 0.5)],
        )
        .unwrap();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.get(0, 1), 0.0);

        let dense = sparse.to_dense();
        assert_eq!(dense.get(0, 1), 0.0);
        assert_eq!(dense.get(1, 0), 0.5);
        assert!(dense.first_non_finite().is_none());
        assert_bit_identical(&dense.to_dense(), &dense);

        // NaN sentinels are not carried into the compact form
        assert_eq!(sparse.to_sparse().nnz(), 1);
    }

    #[test]
    fn test_from_triplets_checks_bounds_and_drops_zeros() {
        let ok = SparseLabeledMatrix::from_triplets(
            "t",
            labels(2),
            labels(2),
            vec![(0, 0, 0.0), (1, 1, 2.0)],
        )
        .unwrap();
        assert_eq!(ok.nnz(), 1);
        assert_eq!(ok.triplets().collect::<Vec<_>>(), vec![(1, 1, 2.0)]);

        let err = SparseLabeledMatrix::from_triplets("t", labels(2), labels(2), vec![(2, 0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, LioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_shape_checks() {
        let err = LabeledMatrix::from_rows("ragged", &[vec![1.0], vec![1.0, 2.0]], labels(2), labels(2))
            .unwrap_err();
        assert!(matches!(err, LioError::ShapeMismatch { .. }));

        let err = LabeledMatrix::new("axes", Mat::zeros(2, 2), labels(3), labels(2)).unwrap_err();
        assert!(matches!(err, LioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_self_indexed_invariant() {
        assert!(sample().ensure_self_indexed().is_ok());

        let rect = LabeledMatrix::new("rect", Mat::zeros(3, 2), labels(3), labels(2)).unwrap();
        assert!(matches!(
            rect.ensure_self_indexed(),
            Err(LioError::ShapeMismatch { .. })
        ));

        let swapped = labels(3).select(&[1, 0, 2]).unwrap();
        let misaligned = LabeledMatrix::new("swapped", Mat::zeros(3, 3), labels(3), swapped).unwrap();
        assert!(matches!(
            misaligned.ensure_self_indexed(),
            Err(LioError::LabelAlignment { .. })
        ));
    }

    #[test]
    fn test_zero_rows_and_columns() {
        let m = sample();
        assert!(m.zero_rows().is_empty());
        let m = LabeledMatrix::square(
            "z",
            &[vec![0.0, 0.0], vec![3.0, 0.0]],
            labels(2),
        )
        .unwrap();
        assert_eq!(m.zero_rows(), vec![0]);
        assert_eq!(m.zero_columns(), vec![1]);
    }

    #[test]
    fn test_select_keeps_labels_aligned() {
        let m = sample();
        let sub = m.select(&[0, 2], &[1]).unwrap();
        assert_eq!(sub.shape(), (2, 1));
        assert_eq!(sub.get(0, 0), 0.25);
        assert_eq!(sub.cols().get(0), Some(&SectorLabel::new("S1", "FR")));
        assert_eq!(sub.rows().get(1), Some(&SectorLabel::new("S2", "ES")));

        let err = m.select(&[5], &[0]).unwrap_err();
        assert!(matches!(err, LioError::IndexOutOfRange { ref matrix, .. } if matrix == "sample"));
    }

    #[test]
    fn test_density_and_memory() {
        let sparse = sample().to_sparse();
        assert!((sparse.density() - 3.0 / 9.0).abs() < 1e-12);
        assert_eq!(sparse.memory_bytes(), 3 * 16 + 4 * 8);
        assert_eq!(sample().region_positions("ES"), vec![0, 2]);
    }
}
