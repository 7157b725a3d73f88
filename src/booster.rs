use crate::config::{CostModel, TrainConfig};
use crate::data::{RowCell, SparseRowMatrix};
use crate::errors::GbrtError;
use crate::grower::{BoostReport, TreeGrower};
use crate::predict::{predict_batch, Predictor};
use crate::tree::Tree;
use log::info;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Single regression tree booster.
///
/// Owns the training configuration and the tree being grown, and exposes
/// the prediction surface over it. One `fit` call grows one tree from the
/// gradient and hessian of the caller's loss; the caller adds the emitted
/// leaf weights to its ensemble and computes fresh derivatives for the
/// next round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegTreeBooster {
    pub config: TrainConfig,
    pub tree: Tree,
    #[serde(skip)]
    predictor: Option<Predictor>,
}

impl RegTreeBooster {
    pub fn new(config: TrainConfig) -> Result<Self, GbrtError> {
        config.validate()?;
        let tree = Tree::new(config.num_roots as usize);
        Ok(RegTreeBooster {
            config,
            tree,
            predictor: None,
        })
    }

    /// Grow one tree with the configuration's own cost model.
    ///
    /// * `grad`, `hess` - first and second derivatives of the loss at the
    ///   current prediction, one per instance.
    /// * `smat` - sparse feature matrix; absent cells are unknown.
    /// * `group_id` - optional per-instance root assignment in
    ///   `[0, num_roots)`.
    /// * `rng` - seeded source for the subsampler, so runs reproduce.
    pub fn fit(
        &mut self,
        grad: &[f32],
        hess: &[f32],
        smat: &SparseRowMatrix,
        group_id: Option<&[u32]>,
        rng: &mut StdRng,
    ) -> Result<BoostReport, GbrtError> {
        let cost = self.config.clone();
        self.fit_with_cost(&cost, grad, hess, smat, group_id, rng)
    }

    /// Grow one tree with a caller-supplied cost model.
    pub fn fit_with_cost<C: CostModel>(
        &mut self,
        cost: &C,
        grad: &[f32],
        hess: &[f32],
        smat: &SparseRowMatrix,
        group_id: Option<&[u32]>,
        rng: &mut StdRng,
    ) -> Result<BoostReport, GbrtError> {
        let n = grad.len();
        if n >= u32::MAX as usize {
            return Err(GbrtError::TooManyInstances(n, u32::MAX));
        }
        if hess.len() != n || smat.n_rows() != n {
            return Err(GbrtError::DimensionMismatch(n, hess.len(), smat.n_rows()));
        }
        if smat.n_features() != self.config.num_feature as usize {
            return Err(GbrtError::FeatureCountMismatch(
                smat.n_features(),
                self.config.num_feature,
            ));
        }
        let group_id = group_id.unwrap_or(&[]);
        if !group_id.is_empty() {
            if group_id.len() != n {
                return Err(GbrtError::GroupLengthMismatch(group_id.len(), n));
            }
            for (i, &g) in group_id.iter().enumerate() {
                if g >= self.config.num_roots {
                    return Err(GbrtError::GroupOutOfRange(g, i, self.config.num_roots));
                }
            }
        }

        info!("growing a regression tree over {} instances", n);
        self.tree = Tree::new(self.config.num_roots as usize);
        let report = {
            let mut grower = TreeGrower::new(&self.config, cost, &mut self.tree, grad, hess, smat, group_id);
            grower.grow(rng)
        };
        info!(
            "tree grown: {} roots, {} extra nodes, {} pruned nodes, max_depth={}",
            self.config.num_roots,
            self.tree.num_extra_nodes(),
            report.num_pruned,
            report.max_depth
        );
        Ok(report)
    }

    /// Predict a sparse row; features absent from it are unknown.
    pub fn predict_row(&mut self, row: &[RowCell], gid: usize) -> f32 {
        let num_feature = self.config.num_feature as usize;
        let predictor = self.predictor.get_or_insert_with(|| Predictor::new(num_feature));
        predictor.predict_row(&self.tree, row, gid)
    }

    /// Predict a dense feature vector with a parallel unknown bitmap.
    pub fn predict_dense(&self, feat: &[f32], unknown: &[bool], gid: usize) -> f32 {
        assert!(
            feat.len() >= self.config.num_feature as usize
                && unknown.len() >= self.config.num_feature as usize,
            "input data smaller than num feature"
        );
        self.tree.predict_dense(feat, unknown, gid)
    }

    /// Score every row of a matrix, in parallel.
    pub fn predict(&self, smat: &SparseRowMatrix, group_id: Option<&[u32]>) -> Vec<f32> {
        predict_batch(&self.tree, smat, group_id)
    }
}
