use crate::config::KernelConfig;
use crate::problem::CoxProblem;
use crate::types::{KernelError, RiskSets};
use ndarray::{Array1, Array2};

/// Coefficient-space state handed to an outer Newton or P-IRLS loop.
///
/// `gradient` and `hessian` are derivatives of the negative log partial likelihood
/// `L`, while `deviance` is `2 L`. A Newton step is `-hessian^-1 gradient` as is;
/// derivatives of the deviance are twice the stored ones.
#[derive(Debug, Clone)]
pub struct WorkingState {
    pub eta: Array1<f64>,
    pub gradient: Array1<f64>,
    pub hessian: Array2<f64>,
    pub deviance: f64,
}

pub trait WorkingModel {
    fn update(&mut self, beta: &Array1<f64>) -> Result<WorkingState, KernelError>;
}

/// Lifts the per-subject kernel to coefficients through a design matrix:
/// `eta = X beta + offset`, gradient `X^T g`, Hessian `X^T H X`, deviance `2 L`.
#[derive(Debug)]
pub struct CoxWorkingModel {
    design: Array2<f64>,
    offset: Option<Array1<f64>>,
    problem: CoxProblem,
}

impl CoxWorkingModel {
    pub fn new(risk_sets: RiskSets, design: Array2<f64>, config: KernelConfig) -> Result<Self, KernelError> {
        if design.nrows() != risk_sets.len() {
            return Err(KernelError::DesignMismatch {
                rows: design.nrows(),
                cols: design.ncols(),
                subjects: risk_sets.len(),
                coefficients: design.ncols(),
            });
        }
        Ok(Self {
            design,
            offset: None,
            problem: CoxProblem::new(risk_sets, config),
        })
    }

    /// Adds a fixed per-subject offset to every linear predictor.
    pub fn with_offset(mut self, offset: Array1<f64>) -> Result<Self, KernelError> {
        crate::types::ensure_len("offset", self.design.nrows(), offset.len())?;
        self.offset = Some(offset);
        Ok(self)
    }

    #[inline]
    pub fn problem(&self) -> &CoxProblem {
        &self.problem
    }
}

impl WorkingModel for CoxWorkingModel {
    fn update(&mut self, beta: &Array1<f64>) -> Result<WorkingState, KernelError> {
        if beta.len() != self.design.ncols() {
            return Err(KernelError::DesignMismatch {
                rows: self.design.nrows(),
                cols: self.design.ncols(),
                subjects: self.problem.risk_sets().len(),
                coefficients: beta.len(),
            });
        }
        let mut eta = self.design.dot(beta);
        if let Some(offset) = &self.offset {
            eta += offset;
        }

        let accumulated = self.problem.update(eta.view())?;
        let deviance = 2.0 * accumulated.objective();
        let gradient = self.design.t().dot(&accumulated.gradient());
        let hessian_design = accumulated.hessian_matmul(self.design.view())?;
        let hessian = self.design.t().dot(&hessian_design);
        log::trace!(
            "Cox working state: deviance={deviance:.6}, |grad|={:.3e}",
            gradient.dot(&gradient).sqrt()
        );

        Ok(WorkingState {
            eta,
            gradient,
            hessian,
            deviance,
        })
    }
}
