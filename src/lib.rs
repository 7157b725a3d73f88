//! # gbrt
//!
//! `gbrt` is a single-tree gradient boosted regression tree learner: given
//! per-instance first and second derivatives of a differentiable loss and a
//! sparse feature matrix, it grows one CART-style regression tree that
//! greedily reduces a regularized second-order loss, then emits leaf
//! weights to be used as an additive update by an outer boosting loop.
//!
//! Missing values are handled natively. A feature absent from a row is
//! unknown, not zero; every split learns a default direction for unknown
//! values by sweeping candidate thresholds from both ends of the sorted
//! feature column and letting the two directions compete by loss change.
//!
//! The learner works on a sparse, per-node column pivot: for each node it
//! transposes just the rows routed to that node into compact per-feature
//! runs, so split finding costs time proportional to those rows' nonzero
//! cells rather than to the whole matrix. Instance ids live in one shared
//! buffer that is re-partitioned in place at every split, and a cascading
//! pruner collapses splits whose realized gain fails a cost-complexity
//! threshold as soon as both their children finalize.
//!
//! ## Quick Start
//!
//! ```rust
//! use gbrt::{RegTreeBooster, RowCell, SparseRowMatrix, TrainConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // Four instances of one feature; gradients from the caller's loss.
//! let smat = SparseRowMatrix::from_rows(
//!     &[vec![(0, 1.0)], vec![(0, 1.0)], vec![(0, 3.0)], vec![(0, 3.0)]],
//!     1,
//! )
//! .unwrap();
//! let grad = vec![-1.0, -1.0, 1.0, 1.0];
//! let hess = vec![1.0; 4];
//!
//! let config = TrainConfig::new(1)
//!     .set_learning_rate(1.0)
//!     .set_reg_lambda(0.0)
//!     .set_min_child_weight(0.0)
//!     .set_max_depth(2);
//! let mut booster = RegTreeBooster::new(config).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let report = booster.fit(&grad, &hess, &smat, None, &mut rng).unwrap();
//! assert_eq!(report.max_depth, 1);
//!
//! // Negative gradients pull the prediction up.
//! assert!(booster.predict_row(&[RowCell::new(0, 1.0)], 0) > 0.0);
//! assert!(booster.predict_row(&[RowCell::new(0, 3.0)], 0) < 0.0);
//! ```

// Modules
pub mod booster;
pub mod columns;
pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod grower;
pub mod node;
pub mod predict;
pub mod prune;
pub mod sampler;
pub mod splitter;
pub mod tree;

// Individual classes, and functions
pub use booster::RegTreeBooster;
pub use config::{CostModel, DefaultDirection, TrainConfig};
pub use data::{RowCell, SparseRowMatrix};
pub use grower::BoostReport;
pub use tree::Tree;
