//! Dense named matrix used throughout the enrichment pipeline.
//!
//! [`NamedMatrix`] stores a row-major dense matrix of `f64` values with
//! associated row and column names. The same type covers all four shapes
//! the crate works with: data (features × samples), loadings (features ×
//! factors), factor scores (samples × factors), and result matrices
//! (feature sets × factors).

use velella_core::{Result, Summarizable, VelellaError};

/// A dense, row-major matrix with named rows and columns.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

impl NamedMatrix {
    /// Create a matrix from row-major 2D data.
    ///
    /// Each inner `Vec` is one row with `col_names.len()` values.
    pub fn new(
        data: Vec<Vec<f64>>,
        row_names: Vec<String>,
        col_names: Vec<String>,
    ) -> Result<Self> {
        let n_rows = data.len();
        let n_cols = col_names.len();

        if row_names.len() != n_rows {
            return Err(VelellaError::InvalidInput(format!(
                "row_names length ({}) does not match row count ({n_rows})",
                row_names.len()
            )));
        }

        let mut flat = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in data.iter().enumerate() {
            if row.len() != n_cols {
                return Err(VelellaError::InvalidInput(format!(
                    "row {i} has {} columns, expected {n_cols}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            data: flat,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// Create a matrix from a flat row-major slice.
    pub fn from_flat(
        data: Vec<f64>,
        row_names: Vec<String>,
        col_names: Vec<String>,
    ) -> Result<Self> {
        let n_rows = row_names.len();
        let n_cols = col_names.len();
        if data.len() != n_rows * n_cols {
            return Err(VelellaError::InvalidInput(format!(
                "flat data length ({}) != {n_rows} rows x {n_cols} columns",
                data.len()
            )));
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// Create a zero-filled matrix with the given axis names.
    pub fn zeros(row_names: Vec<String>, col_names: Vec<String>) -> Self {
        let n_rows = row_names.len();
        let n_cols = col_names.len();
        Self {
            data: vec![0.0; n_rows * n_cols],
            n_rows,
            n_cols,
            row_names,
            col_names,
        }
    }

    /// Matrix shape as `(n_rows, n_cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Value at `(row, col)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.n_rows || col >= self.n_cols {
            return None;
        }
        Some(self.data[row * self.n_cols + col])
    }

    /// Set the value at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(VelellaError::InvalidInput(format!(
                "index ({row}, {col}) out of bounds for {}x{} matrix",
                self.n_rows, self.n_cols
            )));
        }
        self.data[row * self.n_cols + col] = value;
        Ok(())
    }

    /// Borrow one row as a slice.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.n_rows {
            return None;
        }
        let start = row * self.n_cols;
        Some(&self.data[start..start + self.n_cols])
    }

    /// Copy one column into a new `Vec`.
    pub fn column(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.n_cols {
            return None;
        }
        Some(
            (0..self.n_rows)
                .map(|r| self.data[r * self.n_cols + col])
                .collect(),
        )
    }

    /// Position of a row name, if present.
    pub fn row_index(&self, name: &str) -> Option<usize> {
        self.row_names.iter().position(|n| n == name)
    }

    /// Position of a column name, if present.
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.col_names.iter().position(|n| n == name)
    }

    /// New matrix keeping only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<NamedMatrix> {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols);
        let mut row_names = Vec::with_capacity(indices.len());
        for &idx in indices {
            let row = self.row(idx).ok_or_else(|| {
                VelellaError::InvalidInput(format!(
                    "row index {idx} out of bounds for {} rows",
                    self.n_rows
                ))
            })?;
            data.extend_from_slice(row);
            row_names.push(self.row_names[idx].clone());
        }
        Ok(NamedMatrix {
            data,
            n_rows: indices.len(),
            n_cols: self.n_cols,
            row_names,
            col_names: self.col_names.clone(),
        })
    }

    /// New matrix keeping only the given columns, in the given order.
    pub fn select_cols(&self, indices: &[usize]) -> Result<NamedMatrix> {
        for &idx in indices {
            if idx >= self.n_cols {
                return Err(VelellaError::InvalidInput(format!(
                    "column index {idx} out of bounds for {} columns",
                    self.n_cols
                )));
            }
        }
        let mut data = Vec::with_capacity(self.n_rows * indices.len());
        for r in 0..self.n_rows {
            for &idx in indices {
                data.push(self.data[r * self.n_cols + idx]);
            }
        }
        let col_names = indices.iter().map(|&i| self.col_names[i].clone()).collect();
        Ok(NamedMatrix {
            data,
            n_rows: self.n_rows,
            n_cols: indices.len(),
            row_names: self.row_names.clone(),
            col_names,
        })
    }

    /// Full flat row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Row names in order.
    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    /// Column names in order.
    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }
}

impl Summarizable for NamedMatrix {
    fn summary(&self) -> String {
        format!("NamedMatrix: {}x{}", self.n_rows, self.n_cols)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn new_and_get() {
        let m = NamedMatrix::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            names("r", 2),
            names("c", 2),
        )
        .unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.get(0, 1), Some(2.0));
        assert_eq!(m.get(1, 0), Some(3.0));
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn new_ragged_rows_rejected() {
        let result = NamedMatrix::new(
            vec![vec![1.0, 2.0], vec![3.0]],
            names("r", 2),
            names("c", 2),
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_name_length_mismatch_rejected() {
        let result = NamedMatrix::new(vec![vec![1.0]], names("r", 2), names("c", 1));
        assert!(result.is_err());
    }

    #[test]
    fn from_flat_round_trips() {
        let m = NamedMatrix::from_flat(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], names("r", 2), names("c", 3))
            .unwrap();
        assert_eq!(m.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(m.column(2), Some(vec![3.0, 6.0]));
    }

    #[test]
    fn from_flat_bad_length_rejected() {
        assert!(NamedMatrix::from_flat(vec![1.0; 5], names("r", 2), names("c", 3)).is_err());
    }

    #[test]
    fn name_lookup() {
        let m = NamedMatrix::zeros(names("gene", 3), names("factor", 2));
        assert_eq!(m.row_index("gene1"), Some(1));
        assert_eq!(m.col_index("factor0"), Some(0));
        assert_eq!(m.row_index("missing"), None);
    }

    #[test]
    fn select_rows_reorders() {
        let m = NamedMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0]],
            names("r", 3),
            names("c", 1),
        )
        .unwrap();
        let sel = m.select_rows(&[2, 0]).unwrap();
        assert_eq!(sel.n_rows(), 2);
        assert_eq!(sel.row(0), Some(&[3.0][..]));
        assert_eq!(sel.row_names(), &["r2".to_string(), "r0".to_string()]);
    }

    #[test]
    fn select_cols_reorders() {
        let m = NamedMatrix::new(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            names("r", 2),
            names("c", 3),
        )
        .unwrap();
        let sel = m.select_cols(&[2, 0]).unwrap();
        assert_eq!(sel.shape(), (2, 2));
        assert_eq!(sel.row(0), Some(&[3.0, 1.0][..]));
        assert_eq!(sel.col_names(), &["c2".to_string(), "c0".to_string()]);
        assert!(m.select_cols(&[3]).is_err());
    }

    #[test]
    fn select_rows_out_of_bounds() {
        let m = NamedMatrix::zeros(names("r", 2), names("c", 1));
        assert!(m.select_rows(&[0, 5]).is_err());
    }

    #[test]
    fn set_updates_value() {
        let mut m = NamedMatrix::zeros(names("r", 2), names("c", 2));
        m.set(1, 1, 7.0).unwrap();
        assert_eq!(m.get(1, 1), Some(7.0));
        assert!(m.set(2, 0, 1.0).is_err());
    }

    #[test]
    fn summary_format() {
        let m = NamedMatrix::zeros(names("r", 4), names("c", 3));
        assert_eq!(m.summary(), "NamedMatrix: 4x3");
    }
}
