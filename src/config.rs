use crate::errors::GbrtError;
use serde::{Deserialize, Serialize};

/// Which child receives rows in which the split feature is absent.
///
/// `Auto` lets forward and backward threshold sweeps compete by loss
/// change; `Left` and `Right` force every chosen split to route missing
/// values to that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultDirection {
    Auto,
    Left,
    Right,
}

/// The loss contract consumed by the tree learner.
///
/// The learner only ever talks to the loss through these five operations,
/// so a caller with a custom objective (for example a layerwise model that
/// regularizes child weights toward the parent's) can implement this trait
/// and pass it to [`crate::RegTreeBooster::fit_with_cost`].
pub trait CostModel {
    /// Cost of a node before splitting. Returned as a negated regularized
    /// loss, so larger is better.
    fn calc_root_cost(&self, sum_grad: f64, sum_hess: f64) -> f64;
    /// Cost of a hypothetical child with the given sums.
    fn calc_cost(&self, sum_grad: f64, sum_hess: f64, parent_base_weight: f32) -> f64;
    /// Leaf weight from the gradient and hessian sums.
    fn calc_weight(&self, sum_grad: f64, sum_hess: f64, parent_base_weight: f32) -> f32;
    /// Cost-complexity pruning predicate, consulted once both children of
    /// a split have become leaves.
    fn need_prune(&self, loss_chg: f32, depth: usize) -> bool;
    /// A priori refusal to split a node with the given hessian sum.
    fn cannot_split(&self, sum_hess: f64, depth: usize) -> bool;
}

/// Training parameters, consumed read-only by the learner and pruner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Shrinkage applied to emitted leaf weights.
    pub learning_rate: f32,
    /// Minimum hessian sum required in each child of a split.
    pub min_child_weight: f32,
    /// Maximum tree depth; a node at this depth always becomes a leaf.
    pub max_depth: usize,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f32,
    /// Minimum loss change a split must realize to survive pruning.
    pub min_split_loss: f32,
    /// Probability with which each instance is kept when subsampling.
    pub subsample: f32,
    pub default_direction: DefaultDirection,
    /// Number of feature columns in the training matrix.
    pub num_feature: u32,
    /// Number of roots; values above 1 enable group-partitioned training.
    pub num_roots: u32,
}

impl TrainConfig {
    pub fn new(num_feature: u32) -> Self {
        TrainConfig {
            learning_rate: 0.3,
            min_child_weight: 1.0,
            max_depth: 6,
            reg_lambda: 1.0,
            min_split_loss: 0.0,
            subsample: 1.0,
            default_direction: DefaultDirection::Auto,
            num_feature,
            num_roots: 1,
        }
    }

    // Set methods for parameters

    pub fn set_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn set_min_child_weight(mut self, min_child_weight: f32) -> Self {
        self.min_child_weight = min_child_weight;
        self
    }

    pub fn set_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn set_reg_lambda(mut self, reg_lambda: f32) -> Self {
        self.reg_lambda = reg_lambda;
        self
    }

    pub fn set_min_split_loss(mut self, min_split_loss: f32) -> Self {
        self.min_split_loss = min_split_loss;
        self
    }

    pub fn set_subsample(mut self, subsample: f32) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn set_default_direction(mut self, default_direction: DefaultDirection) -> Self {
        self.default_direction = default_direction;
        self
    }

    pub fn set_num_roots(mut self, num_roots: u32) -> Self {
        self.num_roots = num_roots;
        self
    }

    pub fn validate(&self) -> Result<(), GbrtError> {
        validate_float_param(self.learning_rate, 0.0, f32::INFINITY, "learning_rate")?;
        validate_float_param(self.min_child_weight, 0.0, f32::INFINITY, "min_child_weight")?;
        validate_float_param(self.reg_lambda, 0.0, f32::INFINITY, "reg_lambda")?;
        validate_float_param(self.min_split_loss, 0.0, f32::INFINITY, "min_split_loss")?;
        validate_float_param(self.subsample, f32::MIN_POSITIVE, 1.0, "subsample")?;
        if self.num_roots == 0 {
            return Err(GbrtError::InvalidParameter(
                "num_roots".to_string(),
                "a value of at least 1".to_string(),
                self.num_roots.to_string(),
            ));
        }
        Ok(())
    }
}

impl CostModel for TrainConfig {
    fn calc_root_cost(&self, sum_grad: f64, sum_hess: f64) -> f64 {
        let denom = sum_hess + f64::from(self.reg_lambda);
        if denom <= 0.0 {
            return 0.0;
        }
        sum_grad * sum_grad / denom
    }

    fn calc_cost(&self, sum_grad: f64, sum_hess: f64, _parent_base_weight: f32) -> f64 {
        self.calc_root_cost(sum_grad, sum_hess)
    }

    fn calc_weight(&self, sum_grad: f64, sum_hess: f64, _parent_base_weight: f32) -> f32 {
        if sum_hess < f64::from(self.min_child_weight) {
            return 0.0;
        }
        let denom = sum_hess + f64::from(self.reg_lambda);
        if denom <= 0.0 {
            return 0.0;
        }
        (-sum_grad / denom) as f32
    }

    fn need_prune(&self, loss_chg: f32, _depth: usize) -> bool {
        loss_chg < self.min_split_loss
    }

    fn cannot_split(&self, sum_hess: f64, _depth: usize) -> bool {
        // Both children need min_child_weight worth of hessian.
        sum_hess < 2.0 * f64::from(self.min_child_weight)
    }
}

fn validate_float_param(value: f32, min: f32, max: f32, parameter: &str) -> Result<(), GbrtError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(GbrtError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}
