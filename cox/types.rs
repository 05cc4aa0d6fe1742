// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use crate::config::KernelConfig;
use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Errors surfaced while validating kernel inputs or evaluating the partial likelihood.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("the kernel needs at least one subject")]
    Empty,
    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("ordering is not a permutation: position {position} holds subject {subject}")]
    InvalidPermutation { position: usize, subject: usize },
    #[error("rank of subject {subject} is invalid: {reason}")]
    InvalidRank { subject: usize, reason: &'static str },
    #[error("censoring indicator of subject {subject} must be 0 or 1, found {value}")]
    InvalidCensoring { subject: usize, value: u8 },
    #[error("time of subject {subject} is not finite")]
    NonFiniteTime { subject: usize },
    #[error("linear predictor of subject {subject} is not finite")]
    NonFiniteLinearPredictor { subject: usize },
    #[error("risk-set sum at sorted position {position} is not finite; center the linear predictor")]
    NonFiniteRiskSet { position: usize },
    #[error("risk-set sum at sorted position {position} vanished for an event; center the linear predictor")]
    VanishingRiskSet { position: usize },
    #[error("no accumulation is current for this problem; call update with a linear predictor first")]
    StaleAccumulator,
    #[error(
        "design matrix is {rows}x{cols} but the problem has {subjects} subjects and {coefficients} coefficients"
    )]
    DesignMismatch {
        rows: usize,
        cols: usize,
        subjects: usize,
        coefficients: usize,
    },
}

/// Checks a caller-supplied buffer length against the subject count.
#[inline]
pub(crate) fn ensure_len(what: &'static str, expected: usize, found: usize) -> Result<(), KernelError> {
    if expected == found {
        Ok(())
    } else {
        Err(KernelError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

/// The validated sort/rank structure of one survival data set.
///
/// `ordering[p]` is the subject occupying ascending sorted position `p`. `rankmin[s]`
/// and `rankmax[s]` are the first and last sorted positions of the tie group that
/// subject `s` belongs to. Once constructed the bundle is immutable and every index
/// it holds is in bounds, so the sweeps never need to re-check it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSets {
    ordering: Vec<usize>,
    rankmin: Vec<usize>,
    rankmax: Vec<usize>,
    censoring: Array1<u8>,
    events: usize,
}

impl RiskSets {
    /// Validates externally produced ranks with the default configuration.
    pub fn new(
        ordering: Vec<usize>,
        rankmin: Vec<usize>,
        rankmax: Vec<usize>,
        censoring: Array1<u8>,
    ) -> Result<Self, KernelError> {
        Self::with_config(ordering, rankmin, rankmax, censoring, &KernelConfig::default())
    }

    /// Validates externally produced ranks.
    ///
    /// Lengths, the permutation and `rankmin[s] <= position(s) <= rankmax[s]` are
    /// always checked. With `validate_ties` the tie groups must also be contiguous
    /// and agree on their ranks.
    pub fn with_config(
        ordering: Vec<usize>,
        rankmin: Vec<usize>,
        rankmax: Vec<usize>,
        censoring: Array1<u8>,
        config: &KernelConfig,
    ) -> Result<Self, KernelError> {
        let n = censoring.len();
        if n == 0 {
            return Err(KernelError::Empty);
        }
        ensure_len("ordering", n, ordering.len())?;
        ensure_len("rankmin", n, rankmin.len())?;
        ensure_len("rankmax", n, rankmax.len())?;

        let mut events = 0usize;
        for (subject, &value) in censoring.iter().enumerate() {
            match value {
                0 => {}
                1 => events += 1,
                _ => return Err(KernelError::InvalidCensoring { subject, value }),
            }
        }

        let positions = invert_ordering(&ordering)?;

        for subject in 0..n {
            let lo = rankmin[subject];
            let hi = rankmax[subject];
            if hi >= n {
                return Err(KernelError::InvalidRank {
                    subject,
                    reason: "rankmax is out of bounds",
                });
            }
            let position = positions[subject];
            if lo > position {
                return Err(KernelError::InvalidRank {
                    subject,
                    reason: "rankmin is after the subject's sorted position",
                });
            }
            if hi < position {
                return Err(KernelError::InvalidRank {
                    subject,
                    reason: "rankmax is before the subject's sorted position",
                });
            }
        }

        if config.validate_ties {
            check_tie_groups(&ordering, &rankmin, &rankmax)?;
        }

        Ok(Self {
            ordering,
            rankmin,
            rankmax,
            censoring,
            events,
        })
    }

    /// Assembles a bundle whose structure is correct by construction.
    pub(crate) fn from_parts_unchecked(
        ordering: Vec<usize>,
        rankmin: Vec<usize>,
        rankmax: Vec<usize>,
        censoring: Array1<u8>,
    ) -> Self {
        let events = censoring.iter().filter(|&&flag| flag == 1).count();
        Self {
            ordering,
            rankmin,
            rankmax,
            censoring,
            events,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ordering.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ordering.is_empty()
    }

    /// Number of subjects with an observed event.
    #[inline]
    pub fn events(&self) -> usize {
        self.events
    }

    #[inline]
    pub fn ordering(&self) -> &[usize] {
        &self.ordering
    }

    #[inline]
    pub fn rankmin(&self) -> &[usize] {
        &self.rankmin
    }

    #[inline]
    pub fn rankmax(&self) -> &[usize] {
        &self.rankmax
    }

    #[inline]
    pub fn censoring(&self) -> ArrayView1<'_, u8> {
        self.censoring.view()
    }

    #[inline]
    pub(crate) fn is_event(&self, subject: usize) -> bool {
        self.censoring[subject] == 1
    }
}

/// Returns the sorted position of every subject, rejecting anything that is not a
/// bijection on `0..n`.
fn invert_ordering(ordering: &[usize]) -> Result<Vec<usize>, KernelError> {
    let n = ordering.len();
    let mut positions = vec![usize::MAX; n];
    for (position, &subject) in ordering.iter().enumerate() {
        if subject >= n || positions[subject] != usize::MAX {
            return Err(KernelError::InvalidPermutation { position, subject });
        }
        positions[subject] = position;
    }
    Ok(positions)
}

fn check_tie_groups(ordering: &[usize], rankmin: &[usize], rankmax: &[usize]) -> Result<(), KernelError> {
    let mut group_start = 0usize;
    let mut group_end = 0usize;
    for (position, &subject) in ordering.iter().enumerate() {
        let lo = rankmin[subject];
        let hi = rankmax[subject];
        if lo == position {
            // Opening a group requires the previous one to have ended right here.
            if position > 0 && group_end + 1 != position {
                return Err(KernelError::InvalidRank {
                    subject,
                    reason: "tie group starts before the previous group ended",
                });
            }
            group_start = lo;
            group_end = hi;
        } else if lo != group_start || hi != group_end {
            return Err(KernelError::InvalidRank {
                subject,
                reason: "ranks disagree with the rest of the tie group",
            });
        }
    }
    if group_end + 1 != ordering.len() {
        return Err(KernelError::InvalidRank {
            subject: ordering[ordering.len() - 1],
            reason: "last tie group does not reach the final sorted position",
        });
    }
    Ok(())
}
