//! Builds the sort/rank structure the sweeps consume from raw observation times.

use crate::types::{KernelError, RiskSets, ensure_len};
use ndarray::{Array1, ArrayView1};

impl RiskSets {
    /// Sorts subjects by time and assigns min/max tie ranks.
    ///
    /// The sort is stable, so subjects sharing a time keep their natural order inside
    /// the tie group. Every member of a group receives the group's first sorted
    /// position as `rankmin` and its last as `rankmax`.
    pub fn from_times(times: ArrayView1<'_, f64>, censoring: Array1<u8>) -> Result<Self, KernelError> {
        let n = times.len();
        if n == 0 {
            return Err(KernelError::Empty);
        }
        ensure_len("censoring", n, censoring.len())?;
        if let Some(subject) = times.iter().position(|t| !t.is_finite()) {
            return Err(KernelError::NonFiniteTime { subject });
        }
        for (subject, &value) in censoring.iter().enumerate() {
            if value > 1 {
                return Err(KernelError::InvalidCensoring { subject, value });
            }
        }

        let mut ordering: Vec<usize> = (0..n).collect();
        ordering.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

        let mut rankmin = vec![0usize; n];
        let mut rankmax = vec![0usize; n];
        let mut start = 0usize;
        while start < n {
            let value = times[ordering[start]];
            let mut end = start;
            while end + 1 < n && times[ordering[end + 1]] == value {
                end += 1;
            }
            for &subject in &ordering[start..=end] {
                rankmin[subject] = start;
                rankmax[subject] = end;
            }
            start = end + 1;
        }

        Ok(Self::from_parts_unchecked(ordering, rankmin, rankmax, censoring))
    }
}
