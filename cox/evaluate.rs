// ========================================================================================
//                     Objective, gradient and Hessian evaluators
// ========================================================================================
//
// All quantities are derivatives of the NEGATIVE log partial likelihood
//
//     L(eta) = sum_i d_i * (ln W(t_i) - eta_i),   W(t) = sum_{j : t_j >= t} exp(eta_j),
//
// with Breslow handling of ties. Risk-set reads go through rankmin, cumulative
// inverse-risk reads through rankmax.

use crate::accumulate::{Accumulated, DirectionalAccumulated};
use crate::sweep;
use crate::types::{KernelError, ensure_len};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};

impl Accumulated {
    /// Component 5: the negative log partial likelihood.
    pub fn objective(&self) -> f64 {
        let sets = &self.risk_sets;
        let rankmin = sets.rankmin();
        let mut total = 0.0;
        for (subject, &eta) in self.eta.iter().enumerate() {
            if sets.is_event(subject) {
                total += self.exp_accum[rankmin[subject]].ln() - eta;
            }
        }
        total
    }

    /// Component 6: `grad[i] = exp(eta_i) * outer_1st[rankmax[i]] - d_i`.
    pub fn gradient(&self) -> Array1<f64> {
        let mut gradient = Array1::zeros(self.eta.len());
        self.fill_gradient(gradient.view_mut());
        gradient
    }

    /// Writes the gradient into a caller-owned buffer.
    pub fn gradient_into(&self, out: ArrayViewMut1<'_, f64>) -> Result<(), KernelError> {
        ensure_len("gradient buffer", self.eta.len(), out.len())?;
        self.fill_gradient(out);
        Ok(())
    }

    fn fill_gradient(&self, mut out: ArrayViewMut1<'_, f64>) {
        let rankmax = self.risk_sets.rankmax();
        let censoring = self.risk_sets.censoring();
        for (subject, value) in out.iter_mut().enumerate() {
            *value = self.relative_hazard[subject] * self.outer_1st[rankmax[subject]]
                - f64::from(censoring[subject]);
        }
    }

    /// Exact Hessian diagonal,
    /// `H_ii = exp(eta_i) * outer_1st[rankmax[i]] - exp(eta_i)^2 * outer_sq[rankmax[i]]`.
    pub fn hessian_diagonal(&self) -> Array1<f64> {
        let n = self.eta.len();
        let mut outer_sq = Array1::zeros(n);
        sweep::forward_sweep(&self.risk_sets, &mut outer_sq.view_mut(), |rank| {
            let w = self.exp_accum[rank];
            1.0 / (w * w)
        });
        let rankmax = self.risk_sets.rankmax();
        Array1::from_shape_fn(n, |subject| {
            let hazard = self.relative_hazard[subject];
            let rank = rankmax[subject];
            hazard * self.outer_1st[rank] - hazard * hazard * outer_sq[rank]
        })
    }

    /// Component 7 for a single right vector: `(H z)_i`.
    pub fn hessian_action(&self, z: ArrayView1<'_, f64>) -> Result<Array1<f64>, KernelError> {
        Ok(self.direction(z)?.hessian_action())
    }

    /// `H V`, computed one column of `V` at a time with the same two sweeps.
    pub fn hessian_matmul(&self, right: ArrayView2<'_, f64>) -> Result<Array2<f64>, KernelError> {
        ensure_len("right-hand matrix rows", self.eta.len(), right.nrows())?;
        let mut product = Array2::zeros(right.raw_dim());
        for (column, target) in right.axis_iter(Axis(1)).zip(product.axis_iter_mut(Axis(1))) {
            self.direction(column)?.write_hessian_action(target);
        }
        Ok(product)
    }
}

impl DirectionalAccumulated<'_> {
    /// `hess[i] = exp(eta_i) * (z_i * outer_1st[rankmax[i]] - outer_2nd[rankmax[i]])`.
    pub fn hessian_action(&self) -> Array1<f64> {
        let mut action = Array1::zeros(self.z.len());
        self.write_hessian_action(action.view_mut());
        action
    }

    fn write_hessian_action(&self, out: ArrayViewMut1<'_, f64>) {
        let base = self.base;
        let rankmax = base.risk_sets.rankmax();
        Zip::indexed(out)
            .and(&base.relative_hazard)
            .and(&self.z)
            .for_each(|subject, value, &hazard, &z| {
                let rank = rankmax[subject];
                *value = hazard * (z * base.outer_1st[rank] - self.outer_2nd[rank]);
            });
    }
}

#[cfg(test)]
mod tests {
    use crate::accumulate::accumulate;
    use crate::config::KernelConfig;
    use crate::types::RiskSets;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, array};
    use std::sync::Arc;

    fn accumulated(times: Array1<f64>, censoring: Array1<u8>, eta: Array1<f64>) -> crate::Accumulated {
        let sets = Arc::new(RiskSets::from_times(times.view(), censoring).unwrap());
        accumulate(&sets, eta.view(), &KernelConfig::default()).unwrap()
    }

    #[test]
    fn objective_at_zero_predictor_is_sum_of_log_risk_sets() {
        let acc = accumulated(array![1.0, 2.0, 3.0, 4.0], array![1, 0, 1, 1], Array1::zeros(4));
        let expected = 4.0f64.ln() + 2.0f64.ln() + 1.0f64.ln();
        assert_abs_diff_eq!(acc.objective(), expected, epsilon = 1e-14);
    }

    #[test]
    fn gradient_at_zero_predictor_matches_hand_computation() {
        let acc = accumulated(array![1.0, 2.0, 3.0, 4.0], array![1, 0, 1, 1], Array1::zeros(4));
        let gradient = acc.gradient();
        let expected = array![0.25 - 1.0, 0.25, 0.75 - 1.0, 1.75 - 1.0];
        for (got, want) in gradient.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-14);
        }
        assert_abs_diff_eq!(gradient.sum(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn gradient_into_checks_length() {
        let acc = accumulated(array![1.0, 2.0], array![1, 1], Array1::zeros(2));
        let mut short = Array1::zeros(1);
        assert!(acc.gradient_into(short.view_mut()).is_err());
        let mut exact = Array1::zeros(2);
        acc.gradient_into(exact.view_mut()).unwrap();
        assert_eq!(exact, acc.gradient());
    }

    #[test]
    fn constant_direction_is_in_the_null_space() {
        let acc = accumulated(
            array![2.0, 1.0, 2.0, 3.0, 1.0],
            array![1, 1, 0, 1, 1],
            array![0.3, -0.2, 0.8, 0.1, -0.5],
        );
        let action = acc.hessian_action(Array1::ones(5).view()).unwrap();
        for value in action.iter() {
            assert_abs_diff_eq!(*value, 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn hessian_matmul_matches_columnwise_action() {
        let acc = accumulated(
            array![0.5, 1.5, 1.5, 2.5],
            array![1, 1, 1, 0],
            array![0.1, 0.2, -0.3, 0.4],
        );
        let right = array![[1.0, 0.0], [0.0, 2.0], [-1.0, 0.5], [0.25, 1.0]];
        let product = acc.hessian_matmul(right.view()).unwrap();
        for c in 0..2 {
            let column = acc.hessian_action(right.column(c)).unwrap();
            for r in 0..4 {
                assert_abs_diff_eq!(product[[r, c]], column[r], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn hessian_diagonal_matches_unit_vector_actions() {
        let acc = accumulated(
            array![3.0, 1.0, 2.0, 2.0, 4.0],
            array![0, 1, 1, 1, 1],
            array![0.4, -0.1, 0.2, 0.0, -0.6],
        );
        let diagonal = acc.hessian_diagonal();
        let identity = Array2::<f64>::eye(5);
        let dense = acc.hessian_matmul(identity.view()).unwrap();
        for i in 0..5 {
            assert_abs_diff_eq!(diagonal[i], dense[[i, i]], epsilon = 1e-14);
        }
    }

    #[test]
    fn hessian_matmul_rejects_wrong_row_count() {
        let acc = accumulated(array![1.0, 2.0], array![1, 1], Array1::zeros(2));
        assert!(acc.hessian_matmul(Array2::zeros((3, 1)).view()).is_err());
    }
}
