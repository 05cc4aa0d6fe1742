// ========================================================================================
//
//                      The sweeps: linear-time risk-set accumulation
//
// ========================================================================================
//
// Every function here is one pass over the sorted positions with a single running sum.
// Reverse passes build risk-set sums (later times are subsets of earlier risk sets),
// forward passes build cumulative inverse-risk mass. Buffer lengths are checked once at
// entry; the indices inside `RiskSets` were validated when it was constructed.
//
// Indexing conventions:
//   * risk-set buffers and forward accumulators are indexed by SORTED POSITION;
//   * relative hazards and right vectors are indexed by SUBJECT;
//   * a risk-set read for subject s uses rankmin[s] so a whole tie group shares one sum.

use crate::types::{KernelError, RiskSets, ensure_len};
use ndarray::{ArrayView1, ArrayViewMut1};

/// Component 1: `exp_accum[p] = sum of exp(eta_j) over subjects at sorted position >= p`.
///
/// Takes relative hazards `exp(eta)` rather than `eta`, so callers that also need the
/// hazards for the gradient exponentiate once.
pub fn risk_set_sums(
    risk_sets: &RiskSets,
    relative_hazard: ArrayView1<'_, f64>,
    mut exp_accum: ArrayViewMut1<'_, f64>,
) -> Result<(), KernelError> {
    let n = risk_sets.len();
    ensure_len("relative hazard", n, relative_hazard.len())?;
    ensure_len("risk-set buffer", n, exp_accum.len())?;
    reverse_sweep(risk_sets.ordering(), &mut exp_accum, |subject| relative_hazard[subject]);
    Ok(())
}

/// Component 2: the same reverse sweep accumulating `z_j * exp(eta_j)`.
pub fn weighted_risk_set_sums(
    risk_sets: &RiskSets,
    relative_hazard: ArrayView1<'_, f64>,
    right: ArrayView1<'_, f64>,
    mut expz_accum: ArrayViewMut1<'_, f64>,
) -> Result<(), KernelError> {
    let n = risk_sets.len();
    ensure_len("relative hazard", n, relative_hazard.len())?;
    ensure_len("right vector", n, right.len())?;
    ensure_len("weighted risk-set buffer", n, expz_accum.len())?;
    reverse_sweep(risk_sets.ordering(), &mut expz_accum, |subject| {
        right[subject] * relative_hazard[subject]
    });
    Ok(())
}

/// Component 3: `outer_1st[p] = sum over q <= p of d / exp_accum[rankmin]` for the
/// subject at each sorted position q. Censored subjects add nothing.
pub fn inverse_risk_first(
    risk_sets: &RiskSets,
    exp_accum: ArrayView1<'_, f64>,
    mut outer_1st: ArrayViewMut1<'_, f64>,
) -> Result<(), KernelError> {
    let n = risk_sets.len();
    ensure_len("risk-set buffer", n, exp_accum.len())?;
    ensure_len("first-order buffer", n, outer_1st.len())?;
    forward_sweep(risk_sets, &mut outer_1st, |rank| 1.0 / exp_accum[rank]);
    Ok(())
}

/// Component 4: `outer_2nd[p] = sum over q <= p of d * expz_accum[r] / exp_accum[r]^2`
/// with `r` the rankmin of the subject at position q.
pub fn inverse_risk_second(
    risk_sets: &RiskSets,
    exp_accum: ArrayView1<'_, f64>,
    expz_accum: ArrayView1<'_, f64>,
    mut outer_2nd: ArrayViewMut1<'_, f64>,
) -> Result<(), KernelError> {
    let n = risk_sets.len();
    ensure_len("risk-set buffer", n, exp_accum.len())?;
    ensure_len("weighted risk-set buffer", n, expz_accum.len())?;
    ensure_len("second-order buffer", n, outer_2nd.len())?;
    forward_sweep(risk_sets, &mut outer_2nd, |rank| {
        let w = exp_accum[rank];
        expz_accum[rank] / (w * w)
    });
    Ok(())
}

/// `outer_sq[p] = sum over q <= p of d / exp_accum[rankmin]^2`, the unit-direction
/// analogue of [`inverse_risk_second`] needed for the exact Hessian diagonal.
pub fn inverse_risk_squared(
    risk_sets: &RiskSets,
    exp_accum: ArrayView1<'_, f64>,
    mut outer_sq: ArrayViewMut1<'_, f64>,
) -> Result<(), KernelError> {
    let n = risk_sets.len();
    ensure_len("risk-set buffer", n, exp_accum.len())?;
    ensure_len("squared buffer", n, outer_sq.len())?;
    forward_sweep(risk_sets, &mut outer_sq, |rank| {
        let w = exp_accum[rank];
        1.0 / (w * w)
    });
    Ok(())
}

#[inline]
fn reverse_sweep<F>(ordering: &[usize], out: &mut ArrayViewMut1<'_, f64>, weight: F)
where
    F: Fn(usize) -> f64,
{
    let mut running = 0.0;
    for (position, &subject) in ordering.iter().enumerate().rev() {
        running += weight(subject);
        out[position] = running;
    }
}

#[inline]
pub(crate) fn forward_sweep<F>(risk_sets: &RiskSets, out: &mut ArrayViewMut1<'_, f64>, term: F)
where
    F: Fn(usize) -> f64,
{
    let rankmin = risk_sets.rankmin();
    let mut running = 0.0;
    for (position, &subject) in risk_sets.ordering().iter().enumerate() {
        if risk_sets.is_event(subject) {
            running += term(rankmin[subject]);
        }
        out[position] = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};

    fn four_subjects() -> RiskSets {
        RiskSets::from_times(array![1.0, 2.0, 3.0, 4.0].view(), array![1, 0, 1, 1]).unwrap()
    }

    #[test]
    fn risk_sets_at_zero_predictor_count_survivors() {
        let sets = four_subjects();
        let hazards = Array1::<f64>::ones(4);
        let mut exp_accum = Array1::<f64>::zeros(4);
        risk_set_sums(&sets, hazards.view(), exp_accum.view_mut()).unwrap();
        assert_eq!(exp_accum, array![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn first_order_skips_censored_subjects() {
        let sets = four_subjects();
        let exp_accum = array![4.0, 3.0, 2.0, 1.0];
        let mut outer = Array1::<f64>::zeros(4);
        inverse_risk_first(&sets, exp_accum.view(), outer.view_mut()).unwrap();
        let expected = [0.25, 0.25, 0.75, 1.75];
        for (got, want) in outer.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-15);
        }
    }

    #[test]
    fn censored_term_is_skipped_even_when_risk_set_is_zero() {
        // A zero risk-set sum under a censored subject must not poison the sum.
        let sets = RiskSets::from_times(array![1.0, 2.0].view(), array![1, 0]).unwrap();
        let exp_accum = array![1.0, 0.0];
        let mut outer = Array1::<f64>::zeros(2);
        inverse_risk_first(&sets, exp_accum.view(), outer.view_mut()).unwrap();
        assert_eq!(outer, array![1.0, 1.0]);
    }

    #[test]
    fn weighted_sums_with_unit_direction_match_plain_sums() {
        let sets = RiskSets::from_times(array![0.3, 0.1, 0.2].view(), array![1, 1, 1]).unwrap();
        let hazards = array![0.5, 2.0, 1.5];
        let mut plain = Array1::<f64>::zeros(3);
        let mut weighted = Array1::<f64>::zeros(3);
        risk_set_sums(&sets, hazards.view(), plain.view_mut()).unwrap();
        weighted_risk_set_sums(&sets, hazards.view(), Array1::ones(3).view(), weighted.view_mut())
            .unwrap();
        assert_eq!(plain, weighted);

        // With z = 1 the second-order terms reduce to the first-order ones.
        let mut first = Array1::<f64>::zeros(3);
        let mut second = Array1::<f64>::zeros(3);
        inverse_risk_first(&sets, plain.view(), first.view_mut()).unwrap();
        inverse_risk_second(&sets, plain.view(), weighted.view(), second.view_mut()).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn squared_sweep_divides_by_square() {
        let sets = four_subjects();
        let exp_accum = array![4.0, 3.0, 2.0, 1.0];
        let mut outer = Array1::<f64>::zeros(4);
        inverse_risk_squared(&sets, exp_accum.view(), outer.view_mut()).unwrap();
        assert_abs_diff_eq!(outer[3], 1.0 / 16.0 + 1.0 / 4.0 + 1.0, epsilon = 1e-15);
    }

    #[test]
    fn buffer_length_is_checked_at_entry() {
        let sets = four_subjects();
        let mut short = Array1::<f64>::zeros(3);
        let err = risk_set_sums(&sets, Array1::ones(4).view(), short.view_mut()).unwrap_err();
        assert_eq!(
            err,
            KernelError::LengthMismatch {
                what: "risk-set buffer",
                expected: 4,
                found: 3
            }
        );
    }
}
