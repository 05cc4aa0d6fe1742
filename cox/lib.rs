#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

//! Linear-time Cox partial likelihood with tied event times.
//!
//! Given the sort/rank structure of a survival data set ([`RiskSets`]) and a linear
//! predictor, [`accumulate`] performs the two ordered cumulative sweeps that replace
//! the quadratic risk-set computation. The resulting [`Accumulated`] evaluates the
//! negative log partial likelihood, its gradient, its Hessian diagonal and Hessian
//! actions against arbitrary right-hand vectors or matrices.
//!
//! ```
//! use coxph_kernel::{KernelConfig, RiskSets, accumulate};
//! use ndarray::array;
//! use std::sync::Arc;
//!
//! let times = array![1.0, 2.0, 3.0, 4.0];
//! let sets = Arc::new(RiskSets::from_times(times.view(), array![1, 0, 1, 1]).unwrap());
//! let acc = accumulate(&sets, array![0.0, 0.0, 0.0, 0.0].view(), &KernelConfig::default()).unwrap();
//! assert_eq!(acc.exp_accum(), array![4.0, 3.0, 2.0, 1.0]);
//! let gradient = acc.gradient();
//! assert!(gradient.sum().abs() < 1e-12);
//! ```

pub mod accumulate;
pub mod batch;
pub mod config;
mod evaluate;
pub mod observe;
pub mod problem;
mod ranking;
pub mod sweep;
pub mod types;
pub mod working;

pub use accumulate::{Accumulated, DirectionalAccumulated, Workspace, accumulate, accumulate_in};
pub use batch::evaluate_batch;
pub use config::{ConfigError, KernelConfig};
pub use observe::{AccumulationSummary, LogObserver, NoopObserver, SweepObserver};
pub use problem::{CoxEvaluation, CoxProblem};
pub use types::{KernelError, RiskSets};
pub use working::{CoxWorkingModel, WorkingModel, WorkingState};
