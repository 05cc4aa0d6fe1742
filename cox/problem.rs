//! A reusable evaluation session for an outer optimizer.
//!
//! An optimizer typically asks for the objective, then the gradient, then a few
//! Hessian actions at the same linear predictor before moving on. [`CoxProblem`]
//! keeps the accumulation for the current predictor and recycles its buffers on the
//! next [`CoxProblem::update`].

use crate::accumulate::{Accumulated, Workspace, accumulate_in};
use crate::config::KernelConfig;
use crate::observe::{LogObserver, NoopObserver, SweepObserver};
use crate::types::{KernelError, RiskSets};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::sync::Arc;

/// Objective, gradient and Hessian diagonal at one linear predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct CoxEvaluation {
    pub objective: f64,
    pub gradient: Array1<f64>,
    pub hessian_diagonal: Array1<f64>,
}

impl CoxEvaluation {
    pub(crate) fn from_accumulated(accumulated: &Accumulated) -> Self {
        Self {
            objective: accumulated.objective(),
            gradient: accumulated.gradient(),
            hessian_diagonal: accumulated.hessian_diagonal(),
        }
    }
}

#[derive(Debug)]
pub struct CoxProblem {
    risk_sets: Arc<RiskSets>,
    config: KernelConfig,
    observer: Arc<dyn SweepObserver>,
    current: Option<Accumulated>,
    workspace: Workspace,
}

impl CoxProblem {
    /// Builds a session; summaries go to the `log` facade when `log_summaries` is set.
    pub fn new(risk_sets: RiskSets, config: KernelConfig) -> Self {
        let observer: Arc<dyn SweepObserver> = if config.log_summaries {
            Arc::new(LogObserver)
        } else {
            Arc::new(NoopObserver)
        };
        Self::with_observer(Arc::new(risk_sets), config, observer)
    }

    /// Builds a session around an explicit observer, which sees a summary after every
    /// successful update. `log_summaries` only picks the observer in [`CoxProblem::new`].
    pub fn with_observer(
        risk_sets: Arc<RiskSets>,
        config: KernelConfig,
        observer: Arc<dyn SweepObserver>,
    ) -> Self {
        let workspace = Workspace::with_capacity(risk_sets.len());
        Self {
            risk_sets,
            config,
            observer,
            current: None,
            workspace,
        }
    }

    #[inline]
    pub fn risk_sets(&self) -> &Arc<RiskSets> {
        &self.risk_sets
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Re-runs the accumulators for `eta`. On failure the session holds no current
    /// accumulation until the next successful update.
    pub fn update(&mut self, eta: ArrayView1<'_, f64>) -> Result<&Accumulated, KernelError> {
        let workspace = match self.current.take() {
            Some(previous) => previous.into_workspace(),
            None => std::mem::take(&mut self.workspace),
        };
        let accumulated = accumulate_in(&self.risk_sets, eta, &self.config, workspace)?;
        self.observer.on_accumulated(&accumulated.summary());
        let current: &Accumulated = self.current.insert(accumulated);
        Ok(current)
    }

    /// Drops the current accumulation, e.g. after the caller mutated its predictor.
    pub fn invalidate(&mut self) {
        if let Some(previous) = self.current.take() {
            self.workspace = previous.into_workspace();
        }
    }

    /// The current accumulation, or `StaleAccumulator` if there is none.
    pub fn accumulated(&self) -> Result<&Accumulated, KernelError> {
        self.current.as_ref().ok_or(KernelError::StaleAccumulator)
    }

    /// True when the current accumulation was built from exactly `eta`.
    pub fn is_current(&self, eta: ArrayView1<'_, f64>) -> bool {
        self.current.as_ref().is_some_and(|acc| acc.is_current(eta))
    }

    pub fn objective(&self) -> Result<f64, KernelError> {
        Ok(self.accumulated()?.objective())
    }

    pub fn gradient(&self) -> Result<Array1<f64>, KernelError> {
        Ok(self.accumulated()?.gradient())
    }

    pub fn hessian_action(&self, z: ArrayView1<'_, f64>) -> Result<Array1<f64>, KernelError> {
        self.accumulated()?.hessian_action(z)
    }

    pub fn hessian_diagonal(&self) -> Result<Array1<f64>, KernelError> {
        Ok(self.accumulated()?.hessian_diagonal())
    }

    pub fn hessian_matmul(&self, right: ArrayView2<'_, f64>) -> Result<Array2<f64>, KernelError> {
        self.accumulated()?.hessian_matmul(right)
    }

    /// Updates to `eta` and returns objective, gradient and Hessian diagonal.
    pub fn evaluate(&mut self, eta: ArrayView1<'_, f64>) -> Result<CoxEvaluation, KernelError> {
        let accumulated = self.update(eta)?;
        Ok(CoxEvaluation::from_accumulated(accumulated))
    }
}
