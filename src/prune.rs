use crate::config::CostModel;
use crate::grower::TreeGrower;

impl<'a, C: CostModel> TreeGrower<'a, C> {
    /// Called on every leaf finalization at `nid`, sitting at `depth`.
    /// Once both children of a split are leaves, the split is collapsed if
    /// its recorded loss change fails the pruning predicate, and the walk
    /// continues at the parent.
    pub(crate) fn try_prune_leaf(&mut self, nid: usize, depth: usize) {
        if self.tree.nodes[nid].is_root() {
            return;
        }
        let pid = self.tree.nodes[nid].parent;
        let stat = &mut self.tree.stats[pid];
        stat.leaf_child_cnt += 1;

        if stat.leaf_child_cnt >= 2 && self.cost.need_prune(stat.loss_chg, depth - 1) {
            let weight = self.param.learning_rate * stat.base_weight;
            self.tree.change_to_leaf(pid, weight);
            self.num_pruned += 2;
            // Tail recursion up the spine.
            self.try_prune_leaf(pid, depth - 1);
        }
    }
}
