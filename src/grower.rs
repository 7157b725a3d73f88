use crate::columns::ColumnBuilder;
use crate::config::{CostModel, TrainConfig};
use crate::constants::RT_EPS;
use crate::data::SparseRowMatrix;
use crate::sampler::{RandomSampler, Sampler};
use crate::splitter::{enumerate_split, SCEntry, SplitSelector};
use crate::tree::Tree;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Summary statistics of one tree-growing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostReport {
    /// Deepest node depth observed while growing.
    pub max_depth: usize,
    /// Number of nodes removed by pruning, always even.
    pub num_pruned: usize,
}

/// A pending node expansion: the node to grow and the contiguous slice of
/// the instance-id buffer routed to it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Task {
    pub nid: usize,
    pub start: usize,
    pub len: usize,
    pub parent_base_weight: f32,
}

/// Grows one regression tree over a sparse feature matrix, driven by a
/// LIFO stack of node tasks.
///
/// Expansion order is depth-first on purpose: the pruner walks parent-ward
/// from freshly finalized leaves and relies on a node's sibling having
/// been finalized before it checks `leaf_child_cnt`.
///
/// All tasks borrow disjoint slices of a single instance-id buffer that is
/// re-partitioned in place at every split; within any task's slice the ids
/// are strictly ascending.
pub struct TreeGrower<'a, C: CostModel> {
    pub(crate) param: &'a TrainConfig,
    pub(crate) cost: &'a C,
    pub(crate) tree: &'a mut Tree,
    grad: &'a [f32],
    hess: &'a [f32],
    smat: &'a SparseRowMatrix,
    group_id: &'a [u32],
    max_depth_seen: usize,
    pub(crate) num_pruned: usize,
    task_stack: Vec<Task>,
    idset: Vec<u32>,
    builder: ColumnBuilder,
}

impl<'a, C: CostModel> TreeGrower<'a, C> {
    pub fn new(
        param: &'a TrainConfig,
        cost: &'a C,
        tree: &'a mut Tree,
        grad: &'a [f32],
        hess: &'a [f32],
        smat: &'a SparseRowMatrix,
        group_id: &'a [u32],
    ) -> Self {
        TreeGrower {
            param,
            cost,
            tree,
            grad,
            hess,
            smat,
            group_id,
            max_depth_seen: 0,
            num_pruned: 0,
            task_stack: Vec::new(),
            idset: Vec::new(),
            builder: ColumnBuilder::new(),
        }
    }

    /// Grow the tree to completion and report what happened.
    pub fn grow(&mut self, rng: &mut StdRng) -> BoostReport {
        self.init_tasks(rng);
        while let Some(tsk) = self.task_stack.pop() {
            self.expand(tsk);
        }
        BoostReport {
            max_depth: self.max_depth_seen,
            num_pruned: self.num_pruned,
        }
    }

    /// Seed the root task(s) from the instance set.
    fn init_tasks(&mut self, rng: &mut StdRng) {
        if self.group_id.is_empty() {
            let mut sampler = RandomSampler::new(self.param.subsample);
            self.idset = sampler.sample(rng, self.hess);
            self.task_stack.push(Task {
                nid: 0,
                start: 0,
                len: self.idset.len(),
                parent_base_weight: 0.0,
            });
            return;
        }
        // Bucket instance ids by group, reusing the column transposer with
        // the group id standing in for the column index.
        self.builder.init_budget(self.param.num_roots as usize);
        for (i, &g) in self.group_id.iter().enumerate() {
            if self.hess[i] < 0.0 {
                continue;
            }
            self.builder.add_budget(g);
        }
        let total = self.builder.init_storage();
        self.idset.clear();
        self.idset.resize(total, 0);
        for (i, &g) in self.group_id.iter().enumerate() {
            if self.hess[i] < 0.0 {
                continue;
            }
            self.builder.push_elem(&mut self.idset, g, i as u32);
        }
        for &g in self.builder.touched() {
            let (start, end) = self.builder.run(g);
            self.task_stack.push(Task {
                nid: g as usize,
                start,
                len: end - start,
                parent_base_weight: 0.0,
            });
        }
        self.builder.cleanup();
    }

    /// Expand one task: repivot its rows into per-feature columns, pick
    /// the best split, and either split the node or finalize it as a leaf.
    fn expand(&mut self, tsk: Task) {
        let depth = self.tree.depth(tsk.nid);
        if depth > self.max_depth_seen {
            self.max_depth_seen = depth;
        }
        if depth >= self.param.max_depth {
            self.make_leaf(&tsk, 0.0, 0.0, true);
            return;
        }

        // Budget pass: count nonzero cells per feature and accumulate the
        // task's gradient statistics in one sweep.
        self.builder.init_budget(self.param.num_feature as usize);
        let mut rsum_grad = 0.0f64;
        let mut rsum_hess = 0.0f64;
        for &ridx in &self.idset[tsk.start..tsk.start + tsk.len] {
            let r = ridx as usize;
            rsum_grad += f64::from(self.grad[r]);
            rsum_hess += f64::from(self.hess[r]);
            for cell in self.smat.row(r) {
                self.builder.add_budget(cell.findex);
            }
        }

        if self.cost.cannot_split(rsum_hess, depth) {
            self.make_leaf(&tsk, rsum_grad, rsum_hess, false);
            self.builder.cleanup();
            return;
        }

        // Fill pass: place every cell into its feature's run.
        let total = self.builder.init_storage();
        let mut entries = vec![SCEntry::default(); total];
        for &ridx in &self.idset[tsk.start..tsk.start + tsk.len] {
            let r = ridx as usize;
            for cell in self.smat.row(r) {
                self.builder
                    .push_elem(&mut entries, cell.findex, SCEntry::new(cell.fvalue, ridx));
            }
        }

        let root_cost = self.cost.calc_root_cost(rsum_grad, rsum_hess);
        let base_weight = self
            .cost
            .calc_weight(rsum_grad, rsum_hess, tsk.parent_base_weight);

        let mut sglobal = SplitSelector::new();
        for &findex in self.builder.touched() {
            let (start, end) = self.builder.run(findex);
            debug_assert!(start < end, "touched feature with empty run");
            // Local sort is cheaper than a global sort when features are sparse.
            entries[start..end].sort_unstable();
            enumerate_split(
                self.cost,
                self.param.default_direction,
                self.param.min_child_weight,
                self.grad,
                self.hess,
                &entries,
                start,
                end,
                findex,
                rsum_grad,
                rsum_hess,
                root_cost,
                base_weight,
                &mut sglobal,
            );
        }
        self.builder.cleanup();

        let e = *sglobal.best();
        if e.loss_chg > RT_EPS {
            self.tree
                .set_split(tsk.nid, e.split_index(), e.split_value, e.default_left());
            self.make_split(&tsk, &entries[e.start..e.start + e.len], e.loss_chg, base_weight);
        } else {
            self.make_leaf(&tsk, rsum_grad, rsum_hess, false);
        }
    }

    /// Finalize a node as a leaf and give the pruner a chance to collapse
    /// its parent.
    fn make_leaf(&mut self, tsk: &Task, mut sum_grad: f64, mut sum_hess: f64, compute: bool) {
        if compute {
            for &ridx in &self.idset[tsk.start..tsk.start + tsk.len] {
                sum_grad += f64::from(self.grad[ridx as usize]);
                sum_hess += f64::from(self.hess[ridx as usize]);
            }
        }
        let weight = self.param.learning_rate
            * self
                .cost
                .calc_weight(sum_grad, sum_hess, tsk.parent_base_weight);
        self.tree.change_to_leaf(tsk.nid, weight);
        let depth = self.tree.depth(tsk.nid);
        self.try_prune_leaf(tsk.nid, depth);
    }

    /// Convert the node into a split and re-arrange its id slice into the
    /// two child slices in a single in-place pass.
    fn make_split(&mut self, tsk: &Task, split_entries: &[SCEntry], loss_chg: f32, base_weight: f32) {
        {
            let stat = &mut self.tree.stats[tsk.nid];
            stat.loss_chg = loss_chg;
            stat.base_weight = base_weight;
            stat.leaf_child_cnt = 0;
        }
        self.tree.add_childs(tsk.nid);

        // The split branch holds the rows in which the feature is present;
        // its ids arrive in feature-value order and must be re-sorted.
        let mut qset: Vec<u32> = split_entries.iter().map(|e| e.rindex).collect();
        qset.sort_unstable();

        let ids = &mut self.idset[tsk.start..tsk.start + tsk.len];
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]), "id slice not sorted");
        // Merge-sort style walk: ids absent from qset slide to the front,
        // preserving ascending order in both groups.
        let mut top = 0;
        for i in 0..ids.len() {
            if top < qset.len() {
                if ids[i] != qset[top] {
                    ids[i - top] = ids[i];
                } else {
                    top += 1;
                }
            } else {
                ids[i - qset.len()] = ids[i];
            }
        }
        let def_len = ids.len() - qset.len();
        // Fill back the split part.
        ids[def_len..].copy_from_slice(&qset);

        let node = &self.tree.nodes[tsk.nid];
        let (def_nid, spl_nid) = if node.default_left {
            (node.left_child, node.right_child)
        } else {
            (node.right_child, node.left_child)
        };
        // The default part goes first so the split part is expanded first.
        self.task_stack.push(Task {
            nid: def_nid,
            start: tsk.start,
            len: def_len,
            parent_base_weight: base_weight,
        });
        self.task_stack.push(Task {
            nid: spl_nid,
            start: tsk.start + def_len,
            len: qset.len(),
            parent_base_weight: base_weight,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultDirection;
    use crate::constants::RT_EPS;
    use crate::predict::Predictor;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn test_config(num_feature: u32) -> TrainConfig {
        TrainConfig::new(num_feature)
            .set_learning_rate(1.0)
            .set_reg_lambda(0.0)
            .set_min_child_weight(0.0)
            .set_max_depth(2)
    }

    fn grow(
        cfg: &TrainConfig,
        grad: &[f32],
        hess: &[f32],
        smat: &SparseRowMatrix,
        group_id: &[u32],
        seed: u64,
    ) -> (Tree, BoostReport) {
        let mut tree = Tree::new(cfg.num_roots as usize);
        let mut rng = StdRng::seed_from_u64(seed);
        let report = {
            let mut grower = TreeGrower::new(cfg, cfg, &mut tree, grad, hess, smat, group_id);
            grower.grow(&mut rng)
        };
        (tree, report)
    }

    #[test]
    fn test_single_feature_perfect_split() {
        let cfg = test_config(1);
        let smat = SparseRowMatrix::from_rows(
            &[vec![(0, 1.0)], vec![(0, 1.0)], vec![(0, 3.0)], vec![(0, 3.0)]],
            1,
        )
        .unwrap();
        let grad = [-1.0, -1.0, 1.0, 1.0];
        let hess = [1.0; 4];
        let (tree, report) = grow(&cfg, &grad, &hess, &smat, &[], 0);

        assert!(!tree.nodes[0].is_leaf);
        assert_eq!(tree.nodes[0].split_feature, 0);
        assert_abs_diff_eq!(tree.nodes[0].split_value, 2.0);
        assert_abs_diff_eq!(tree.stats[0].loss_chg, 4.0);
        // Left leaf carries the (-2, 2) sums, right the (+2, 2) sums.
        let left = tree.nodes[0].left_child;
        let right = tree.nodes[0].right_child;
        assert!(tree.nodes[left].is_leaf && tree.nodes[right].is_leaf);
        assert_abs_diff_eq!(tree.nodes[left].leaf_value, 1.0);
        assert_abs_diff_eq!(tree.nodes[right].leaf_value, -1.0);
        assert_eq!(report.max_depth, 1);
        assert_eq!(report.num_pruned, 0);
    }

    #[test]
    fn test_missing_feature_forces_default() {
        let cfg = test_config(1).set_max_depth(3);
        let smat = SparseRowMatrix::from_rows(&[vec![(0, 5.0)], vec![], vec![]], 1).unwrap();
        let grad = [1.0, -1.0, -1.0];
        let hess = [1.0; 3];
        let (tree, _) = grow(&cfg, &grad, &hess, &smat, &[], 0);

        assert!(!tree.nodes[0].is_leaf);
        // The tie between sweep directions keeps the forward candidate, so
        // missing rows default right and row 0 sits alone on the left.
        assert!(!tree.nodes[0].default_left);
        assert_abs_diff_eq!(tree.nodes[0].split_value, 5.0 + RT_EPS);
        let left = tree.nodes[0].left_child;
        let right = tree.nodes[0].right_child;
        assert_abs_diff_eq!(tree.nodes[left].leaf_value, -1.0);
        assert_abs_diff_eq!(tree.nodes[right].leaf_value, 1.0);
        // An unseen row missing the feature lands on the rows-1,2 leaf.
        let mut predictor = Predictor::new(1);
        assert_abs_diff_eq!(predictor.predict_row(&tree, &[], 0), 1.0);
    }

    #[test]
    fn test_min_child_weight_blocks_split() {
        let cfg = test_config(1).set_min_child_weight(3.0);
        let smat = SparseRowMatrix::from_rows(
            &[vec![(0, 1.0)], vec![(0, 1.0)], vec![(0, 3.0)], vec![(0, 3.0)]],
            1,
        )
        .unwrap();
        let grad = [-1.0, -1.0, 1.0, 1.0];
        let hess = [1.0; 4];
        let (tree, report) = grow(&cfg, &grad, &hess, &smat, &[], 0);

        assert!(tree.nodes[0].is_leaf);
        assert_eq!(tree.num_extra_nodes(), 0);
        assert_abs_diff_eq!(tree.nodes[0].leaf_value, 0.0);
        assert_eq!(report.max_depth, 0);
        assert_eq!(report.num_pruned, 0);
    }

    #[test]
    fn test_grouped_roots_grow_independent_subtrees() {
        let cfg = test_config(1).set_num_roots(2);
        let smat = SparseRowMatrix::from_rows(
            &[vec![(0, 1.0)], vec![(0, 3.0)], vec![(0, 10.0)], vec![(0, 30.0)]],
            1,
        )
        .unwrap();
        let grad = [-1.0, 1.0, -2.0, 2.0];
        let hess = [1.0; 4];
        let group_id = [0, 0, 1, 1];
        let (tree, _) = grow(&cfg, &grad, &hess, &smat, &group_id, 0);

        assert!(!tree.nodes[0].is_leaf);
        assert!(!tree.nodes[1].is_leaf);
        assert_abs_diff_eq!(tree.nodes[0].split_value, 2.0);
        assert_abs_diff_eq!(tree.nodes[1].split_value, 20.0);

        let mut predictor = Predictor::new(1);
        // Group 0 rows resolve through root 0, group 1 rows through root 1.
        assert_abs_diff_eq!(predictor.predict_row(&tree, &[crate::data::RowCell::new(0, 1.0)], 0), 1.0);
        assert_abs_diff_eq!(predictor.predict_row(&tree, &[crate::data::RowCell::new(0, 10.0)], 1), 2.0);
        assert_abs_diff_eq!(predictor.predict_row(&tree, &[crate::data::RowCell::new(0, 30.0)], 1), -2.0);
    }

    #[test]
    fn test_subsample_reproducibility() {
        let cfg = test_config(2).set_subsample(0.5).set_max_depth(4);
        let rows: Vec<Vec<(u32, f32)>> = (0..64)
            .map(|i| vec![(0, (i % 8) as f32), (1, (i / 8) as f32)])
            .collect();
        let smat = SparseRowMatrix::from_rows(&rows, 2).unwrap();
        let grad: Vec<f32> = (0..64).map(|i| if i % 3 == 0 { -1.0 } else { 0.5 }).collect();
        let hess = vec![1.0f32; 64];

        let (tree_a, report_a) = grow(&cfg, &grad, &hess, &smat, &[], 99);
        let (tree_b, report_b) = grow(&cfg, &grad, &hess, &smat, &[], 99);
        assert_eq!(tree_a, tree_b);
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn test_default_direction_equivalence_on_present_rows() {
        // With no missing values, forcing either direction yields the same
        // predictions for rows where the split feature is present.
        let smat = SparseRowMatrix::from_rows(
            &[vec![(0, 1.0)], vec![(0, 2.0)], vec![(0, 3.0)], vec![(0, 4.0)]],
            1,
        )
        .unwrap();
        let grad = [-2.0, -1.0, 1.0, 2.0];
        let hess = [1.0; 4];
        let mut predictions = Vec::new();
        for direction in [
            DefaultDirection::Auto,
            DefaultDirection::Left,
            DefaultDirection::Right,
        ] {
            let cfg = test_config(1).set_default_direction(direction);
            let (tree, _) = grow(&cfg, &grad, &hess, &smat, &[], 0);
            let mut predictor = Predictor::new(1);
            let preds: Vec<f32> = (0..4)
                .map(|i| predictor.predict_row(&tree, smat.row(i), 0))
                .collect();
            predictions.push(preds);
        }
        assert_eq!(predictions[0], predictions[1]);
        assert_eq!(predictions[0], predictions[2]);
    }

    #[test]
    fn test_leaf_weights_match_training_sums() {
        // Law: with subsample = 1 and no pruning, each leaf's weight is
        // learning_rate * calc_weight over the instances that reach it.
        let cfg = test_config(2).set_max_depth(3).set_learning_rate(0.5);
        let rows: Vec<Vec<(u32, f32)>> = (0..12)
            .map(|i| vec![(0, (i % 4) as f32), (1, (i % 3) as f32)])
            .collect();
        let smat = SparseRowMatrix::from_rows(&rows, 2).unwrap();
        let grad: Vec<f32> = (0..12).map(|i| (i as f32) * 0.3 - 1.7).collect();
        let hess = vec![1.0f32; 12];
        let (tree, report) = grow(&cfg, &grad, &hess, &smat, &[], 0);
        assert_eq!(report.num_pruned, 0);

        let mut leaf_sums: std::collections::BTreeMap<usize, (f64, f64)> =
            std::collections::BTreeMap::new();
        let mut feat = vec![0.0f32; 2];
        let unknown = vec![false; 2];
        for i in 0..12 {
            for cell in smat.row(i) {
                feat[cell.findex as usize] = cell.fvalue;
            }
            let leaf = tree.get_leaf_index(&feat, &unknown, 0);
            let entry = leaf_sums.entry(leaf).or_insert((0.0, 0.0));
            entry.0 += f64::from(grad[i]);
            entry.1 += f64::from(hess[i]);
        }
        for (leaf, (g, h)) in leaf_sums {
            assert!(tree.nodes[leaf].is_leaf);
            let expected = cfg.learning_rate * cfg.calc_weight(g, h, 0.0);
            assert_abs_diff_eq!(tree.nodes[leaf].leaf_value, expected, epsilon = 1e-6);
        }
    }
}
