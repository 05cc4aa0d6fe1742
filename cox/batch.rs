//! Evaluates many independent linear predictors against one set of risk sets.
//!
//! Each row is its own problem with its own buffers, so rows run in parallel while
//! every sweep inside a row stays sequential and deterministic.

use crate::accumulate::accumulate;
use crate::config::KernelConfig;
use crate::problem::CoxEvaluation;
use crate::types::{KernelError, RiskSets, ensure_len};
use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use std::sync::Arc;

/// Evaluates every row of `etas` (problems x subjects). Results come back in row
/// order. If any row fails, the error of one failing row is returned.
pub fn evaluate_batch(
    risk_sets: &Arc<RiskSets>,
    etas: ArrayView2<'_, f64>,
    config: &KernelConfig,
) -> Result<Vec<CoxEvaluation>, KernelError> {
    ensure_len("linear predictor", risk_sets.len(), etas.ncols())?;
    log::debug!(
        "Evaluating {} linear predictors over {} subjects",
        etas.nrows(),
        risk_sets.len()
    );
    etas.axis_iter(Axis(0))
        .into_par_iter()
        .map(|eta| {
            let accumulated = accumulate(risk_sets, eta, config)?;
            Ok(CoxEvaluation::from_accumulated(&accumulated))
        })
        .collect()
}
