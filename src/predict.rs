use crate::data::{RowCell, SparseRowMatrix};
use crate::tree::Tree;
use rayon::prelude::*;

/// Reusable dense scratch for predicting sparse rows.
///
/// A sparse row is spread into a dense feature vector plus a parallel
/// unknown bitmap, traversed, and then cleared again, so the bitmap reads
/// unknown for every feature not present in the row. The scratch makes
/// single-row prediction allocation-free after the first call.
#[derive(Debug, Clone)]
pub struct Predictor {
    tmp_feat: Vec<f32>,
    tmp_unknown: Vec<bool>,
}

impl Predictor {
    pub fn new(num_feature: usize) -> Self {
        Predictor {
            tmp_feat: vec![0.0; num_feature],
            tmp_unknown: vec![true; num_feature],
        }
    }

    /// Predict one sparse row, starting from root `gid`.
    pub fn predict_row(&mut self, tree: &Tree, row: &[RowCell], gid: usize) -> f32 {
        for cell in row {
            let f = cell.findex as usize;
            assert!(f < self.tmp_feat.len(), "input feature exceeds bound");
            self.tmp_feat[f] = cell.fvalue;
            self.tmp_unknown[f] = false;
        }
        let pid = tree.get_leaf_index(&self.tmp_feat, &self.tmp_unknown, gid);
        // Set back, so the next row starts from all-unknown.
        for cell in row {
            self.tmp_unknown[cell.findex as usize] = true;
        }
        tree.nodes[pid].leaf_value
    }
}

/// Predict every row of a sparse matrix, traversing from the root named
/// by `group_id` (root 0 when no groups were used). Rows are scored in
/// parallel with one scratch per worker thread.
pub fn predict_batch(tree: &Tree, smat: &SparseRowMatrix, group_id: Option<&[u32]>) -> Vec<f32> {
    let num_feature = smat.n_features();
    (0..smat.n_rows())
        .into_par_iter()
        .map_init(
            || Predictor::new(num_feature),
            |predictor, i| {
                let gid = group_id.map_or(0, |g| g[i] as usize);
                predictor.predict_row(tree, smat.row(i), gid)
            },
        )
        .collect()
}
