use crate::config::{CostModel, DefaultDirection};
use crate::constants::{RT_2EPS, RT_EPS};
use std::cmp::Ordering;

/// One cell of the transposed column store: a feature value and the row
/// it came from. Runs are sorted ascending by value, with row index as
/// the stable tie-break.
#[derive(Debug, Clone, Copy, Default)]
pub struct SCEntry {
    pub fvalue: f32,
    pub rindex: u32,
}

impl SCEntry {
    pub fn new(fvalue: f32, rindex: u32) -> Self {
        SCEntry { fvalue, rindex }
    }
}

impl Ord for SCEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fvalue
            .total_cmp(&other.fvalue)
            .then(self.rindex.cmp(&other.rindex))
    }
}

impl PartialOrd for SCEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SCEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SCEntry {}

const DEFAULT_LEFT_BIT: u32 = 1 << 31;

/// A candidate split: the loss change it realizes, the range of column
/// entries that form its split branch, and the split condition. The
/// feature index and the default-direction flag share one 32-bit word,
/// with the direction in the top bit.
#[derive(Debug, Clone, Copy)]
pub struct SplitCandidate {
    pub loss_chg: f32,
    pub start: usize,
    pub len: usize,
    sindex: u32,
    pub split_value: f32,
}

impl SplitCandidate {
    pub fn new(
        loss_chg: f32,
        start: usize,
        len: usize,
        split_index: u32,
        split_value: f32,
        default_left: bool,
    ) -> Self {
        let mut sindex = split_index;
        if default_left {
            sindex |= DEFAULT_LEFT_BIT;
        }
        SplitCandidate {
            loss_chg,
            start,
            len,
            sindex,
            split_value,
        }
    }

    pub fn split_index(&self) -> u32 {
        self.sindex & !DEFAULT_LEFT_BIT
    }

    pub fn default_left(&self) -> bool {
        self.sindex & DEFAULT_LEFT_BIT != 0
    }
}

/// Keeps the single best candidate seen so far. The initial best has
/// `loss_chg = 0`, meaning no acceptable split; `push` retains a
/// candidate only on a strict improvement, so between candidates of equal
/// loss change the earlier-pushed one wins.
pub struct SplitSelector {
    best: SplitCandidate,
}

impl SplitSelector {
    pub fn new() -> Self {
        SplitSelector {
            best: SplitCandidate::new(0.0, 0, 0, 0, 0.0, false),
        }
    }

    pub fn push(&mut self, e: SplitCandidate) {
        if e.loss_chg > self.best.loss_chg {
            self.best = e;
        }
    }

    pub fn best(&self) -> &SplitCandidate {
        &self.best
    }
}

impl Default for SplitSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Sweep one feature's sorted run and push the best candidate per
/// admissible default direction into `sglobal`.
///
/// The forward sweep accumulates cells from the low end and proposes
/// splits whose split branch is the left child (missing rows default
/// right); the backward sweep mirrors it and defaults left. A boundary
/// between two cells is only considered when their values are at least
/// `2ε` apart; the extreme end of each sweep is always considered, with
/// the threshold nudged `ε` past the terminal value so the boundary cell
/// routes correctly under strict `<`.
#[allow(clippy::too_many_arguments)]
pub fn enumerate_split<C: CostModel>(
    cost: &C,
    default_direction: DefaultDirection,
    min_child_weight: f32,
    grad: &[f32],
    hess: &[f32],
    entries: &[SCEntry],
    start: usize,
    end: usize,
    findex: u32,
    rsum_grad: f64,
    rsum_hess: f64,
    root_cost: f64,
    parent_base_weight: f32,
    sglobal: &mut SplitSelector,
) {
    debug_assert!(start < end, "empty column run");
    let min_child_weight = f64::from(min_child_weight);
    let mut slocal = SplitSelector::new();

    if default_direction != DefaultDirection::Left {
        // Forward process, missing rows default right.
        let mut csum_grad = 0.0f64;
        let mut csum_hess = 0.0f64;
        for j in start..end {
            let ridx = entries[j].rindex as usize;
            csum_grad += f64::from(grad[ridx]);
            csum_hess += f64::from(hess[ridx]);
            if j == end - 1 || entries[j].fvalue + RT_2EPS < entries[j + 1].fvalue {
                if csum_hess < min_child_weight {
                    continue;
                }
                let dsum_hess = rsum_hess - csum_hess;
                if dsum_hess < min_child_weight {
                    break;
                }
                let loss_chg = cost.calc_cost(csum_grad, csum_hess, parent_base_weight)
                    + cost.calc_cost(rsum_grad - csum_grad, dsum_hess, parent_base_weight)
                    - root_cost;
                let split_value = if j == end - 1 {
                    entries[j].fvalue + RT_EPS
                } else {
                    0.5 * (entries[j].fvalue + entries[j + 1].fvalue)
                };
                slocal.push(SplitCandidate::new(
                    loss_chg as f32,
                    start,
                    j + 1 - start,
                    findex,
                    split_value,
                    false,
                ));
            }
        }
    }

    if default_direction != DefaultDirection::Right {
        // Backward process, missing rows default left.
        let mut csum_grad = 0.0f64;
        let mut csum_hess = 0.0f64;
        for j in (start + 1..=end).rev() {
            let ridx = entries[j - 1].rindex as usize;
            csum_grad += f64::from(grad[ridx]);
            csum_hess += f64::from(hess[ridx]);
            if j == start + 1 || entries[j - 2].fvalue + RT_2EPS < entries[j - 1].fvalue {
                if csum_hess < min_child_weight {
                    continue;
                }
                let dsum_hess = rsum_hess - csum_hess;
                if dsum_hess < min_child_weight {
                    break;
                }
                let loss_chg = cost.calc_cost(csum_grad, csum_hess, parent_base_weight)
                    + cost.calc_cost(rsum_grad - csum_grad, dsum_hess, parent_base_weight)
                    - root_cost;
                let split_value = if j == start + 1 {
                    entries[j - 1].fvalue - RT_EPS
                } else {
                    0.5 * (entries[j - 2].fvalue + entries[j - 1].fvalue)
                };
                slocal.push(SplitCandidate::new(
                    loss_chg as f32,
                    j - 1,
                    end - j + 1,
                    findex,
                    split_value,
                    true,
                ));
            }
        }
    }

    sglobal.push(*slocal.best());
}
