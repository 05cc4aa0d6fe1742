//! The accumulation step and the value types it produces.
//!
//! [`accumulate`] runs components 1 and 3 for one linear predictor and returns an
//! [`Accumulated`], which owns both the predictor and the buffers derived from it.
//! The evaluators in `evaluate.rs` are methods on that type, so a stale or missing
//! accumulation is unrepresentable. [`Accumulated::direction`] runs components 2 and 4
//! for one right vector on top of it.

use crate::config::KernelConfig;
use crate::observe::AccumulationSummary;
use crate::sweep;
use crate::types::{KernelError, RiskSets, ensure_len};
use ndarray::{Array1, ArrayView1};
use std::sync::Arc;

/// Recyclable buffers for repeated accumulation against the same risk sets.
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    eta: Array1<f64>,
    relative_hazard: Array1<f64>,
    exp_accum: Array1<f64>,
    outer_1st: Array1<f64>,
}

impl Workspace {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            eta: Array1::zeros(n),
            relative_hazard: Array1::zeros(n),
            exp_accum: Array1::zeros(n),
            outer_1st: Array1::zeros(n),
        }
    }

    fn fit_to(&mut self, n: usize) {
        for buffer in [
            &mut self.eta,
            &mut self.relative_hazard,
            &mut self.exp_accum,
            &mut self.outer_1st,
        ] {
            if buffer.len() != n {
                *buffer = Array1::zeros(n);
            }
        }
    }
}

/// Risk-set sums and first-order inverse-risk mass for one linear predictor.
#[derive(Debug, Clone)]
pub struct Accumulated {
    pub(crate) risk_sets: Arc<RiskSets>,
    pub(crate) eta: Array1<f64>,
    pub(crate) relative_hazard: Array1<f64>,
    pub(crate) exp_accum: Array1<f64>,
    pub(crate) outer_1st: Array1<f64>,
}

/// Runs the risk-set and first-order sweeps with fresh buffers.
pub fn accumulate(
    risk_sets: &Arc<RiskSets>,
    eta: ArrayView1<'_, f64>,
    config: &KernelConfig,
) -> Result<Accumulated, KernelError> {
    accumulate_in(risk_sets, eta, config, Workspace::default())
}

/// Runs the risk-set and first-order sweeps, reusing the buffers in `workspace`.
pub fn accumulate_in(
    risk_sets: &Arc<RiskSets>,
    eta: ArrayView1<'_, f64>,
    config: &KernelConfig,
    mut workspace: Workspace,
) -> Result<Accumulated, KernelError> {
    let n = risk_sets.len();
    ensure_len("linear predictor", n, eta.len())?;
    if config.reject_non_finite {
        if let Some(subject) = eta.iter().position(|v| !v.is_finite()) {
            return Err(KernelError::NonFiniteLinearPredictor { subject });
        }
    }

    workspace.fit_to(n);
    workspace.eta.assign(&eta);
    workspace.relative_hazard.zip_mut_with(&eta, |hazard, &v| *hazard = v.exp());

    sweep::risk_set_sums(
        risk_sets,
        workspace.relative_hazard.view(),
        workspace.exp_accum.view_mut(),
    )?;
    if config.reject_non_finite {
        // Sums only grow toward position 0, so overflow shows up there first.
        if let Some(position) = workspace.exp_accum.iter().position(|v| !v.is_finite()) {
            return Err(KernelError::NonFiniteRiskSet { position });
        }
    }
    sweep::inverse_risk_first(
        risk_sets,
        workspace.exp_accum.view(),
        workspace.outer_1st.view_mut(),
    )?;
    if config.reject_non_finite {
        // A zero or subnormal sum under an event makes its inverse-risk term infinite.
        if let Some(first) = workspace.outer_1st.iter().position(|v| !v.is_finite()) {
            let subject = risk_sets.ordering()[first];
            return Err(KernelError::VanishingRiskSet {
                position: risk_sets.rankmin()[subject],
            });
        }
    }

    Ok(Accumulated {
        risk_sets: Arc::clone(risk_sets),
        eta: workspace.eta,
        relative_hazard: workspace.relative_hazard,
        exp_accum: workspace.exp_accum,
        outer_1st: workspace.outer_1st,
    })
}

impl Accumulated {
    #[inline]
    pub fn risk_sets(&self) -> &Arc<RiskSets> {
        &self.risk_sets
    }

    /// The linear predictor this accumulation was computed for.
    #[inline]
    pub fn linear_predictor(&self) -> ArrayView1<'_, f64> {
        self.eta.view()
    }

    /// `exp(eta)` per subject.
    #[inline]
    pub fn relative_hazard(&self) -> ArrayView1<'_, f64> {
        self.relative_hazard.view()
    }

    /// Risk-set sums per sorted position.
    #[inline]
    pub fn exp_accum(&self) -> ArrayView1<'_, f64> {
        self.exp_accum.view()
    }

    /// First-order inverse-risk mass per sorted position.
    #[inline]
    pub fn outer_1st(&self) -> ArrayView1<'_, f64> {
        self.outer_1st.view()
    }

    /// True when `eta` is exactly the predictor these buffers were built from.
    pub fn is_current(&self, eta: ArrayView1<'_, f64>) -> bool {
        self.eta.view() == eta
    }

    pub fn summary(&self) -> AccumulationSummary {
        let last = self.exp_accum.len() - 1;
        AccumulationSummary {
            subjects: self.risk_sets.len(),
            events: self.risk_sets.events(),
            largest_risk_set: self.exp_accum[0],
            smallest_risk_set: self.exp_accum[last],
            inverse_risk_mass: self.outer_1st[last],
        }
    }

    /// Hands the buffers back for the next accumulation.
    pub fn into_workspace(self) -> Workspace {
        Workspace {
            eta: self.eta,
            relative_hazard: self.relative_hazard,
            exp_accum: self.exp_accum,
            outer_1st: self.outer_1st,
        }
    }

    /// Runs the weighted risk-set and second-order sweeps for the right vector `z`.
    pub fn direction(&self, z: ArrayView1<'_, f64>) -> Result<DirectionalAccumulated<'_>, KernelError> {
        let n = self.risk_sets.len();
        ensure_len("right vector", n, z.len())?;
        let mut expz_accum = Array1::zeros(n);
        let mut outer_2nd = Array1::zeros(n);
        sweep::weighted_risk_set_sums(
            &self.risk_sets,
            self.relative_hazard.view(),
            z,
            expz_accum.view_mut(),
        )?;
        sweep::inverse_risk_second(
            &self.risk_sets,
            self.exp_accum.view(),
            expz_accum.view(),
            outer_2nd.view_mut(),
        )?;
        Ok(DirectionalAccumulated {
            base: self,
            z: z.to_owned(),
            expz_accum,
            outer_2nd,
        })
    }
}

/// Weighted risk-set sums and second-order mass for one right vector, tied to the
/// accumulation they were derived from.
#[derive(Debug, Clone)]
pub struct DirectionalAccumulated<'a> {
    pub(crate) base: &'a Accumulated,
    pub(crate) z: Array1<f64>,
    pub(crate) expz_accum: Array1<f64>,
    pub(crate) outer_2nd: Array1<f64>,
}

impl DirectionalAccumulated<'_> {
    #[inline]
    pub fn right_vector(&self) -> ArrayView1<'_, f64> {
        self.z.view()
    }

    /// Weighted risk-set sums per sorted position.
    #[inline]
    pub fn expz_accum(&self) -> ArrayView1<'_, f64> {
        self.expz_accum.view()
    }

    /// Second-order inverse-risk mass per sorted position.
    #[inline]
    pub fn outer_2nd(&self) -> ArrayView1<'_, f64> {
        self.outer_2nd.view()
    }
}
