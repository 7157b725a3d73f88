use crate::errors::GbrtError;
use serde::{Deserialize, Serialize};

/// One nonzero cell of a sparse row: the feature it belongs to and its value.
/// Features absent from a row are unknown/missing, not zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowCell {
    pub findex: u32,
    pub fvalue: f32,
}

impl RowCell {
    pub fn new(findex: u32, fvalue: f32) -> Self {
        RowCell { findex, fvalue }
    }
}

/// A jagged row-aligned sparse matrix that owns its data contents.
/// Rows are stored back to back in `data`, with `ends` holding the end
/// index of each row.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SparseRowMatrix {
    /// The nonzero cells of the matrix, row by row.
    data: Vec<RowCell>,
    /// The end index of each row in `data`.
    ends: Vec<usize>,
    /// Number of feature columns.
    n_features: usize,
}

impl SparseRowMatrix {
    /// Create an empty matrix with `n_features` columns.
    pub fn new(n_features: usize) -> Self {
        SparseRowMatrix {
            data: Vec::new(),
            ends: Vec::new(),
            n_features,
        }
    }

    /// Build a matrix from one `(feature_index, feature_value)` list per row.
    pub fn from_rows(rows: &[Vec<(u32, f32)>], n_features: usize) -> Result<Self, GbrtError> {
        let mut matrix = SparseRowMatrix::new(n_features);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    /// Append one row of `(feature_index, feature_value)` cells.
    pub fn push_row(&mut self, cells: &[(u32, f32)]) -> Result<(), GbrtError> {
        for &(findex, fvalue) in cells {
            if findex as usize >= self.n_features {
                return Err(GbrtError::FeatureOutOfBounds(findex, self.n_features));
            }
            self.data.push(RowCell::new(findex, fvalue));
        }
        self.ends.push(self.data.len());
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.ends.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total number of stored cells.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Get the cells of a row.
    pub fn row(&self, row: usize) -> &[RowCell] {
        assert!(row < self.ends.len(), "row {} out of bounds", row);
        let start = if row == 0 { 0 } else { self.ends[row - 1] };
        &self.data[start..self.ends[row]]
    }
}
