//! Diagnostics hook for accumulation passes.
//!
//! The sweeps themselves never log. After a pass finishes, the session hands a
//! small summary to whichever observer it was built with.

use std::fmt;

/// Cheap statistics describing one accumulation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationSummary {
    pub subjects: usize,
    pub events: usize,
    /// Risk-set sum at sorted position 0, i.e. the sum of all relative hazards.
    pub largest_risk_set: f64,
    /// Risk-set sum at the last sorted position.
    pub smallest_risk_set: f64,
    /// Total inverse-risk mass, the last entry of the first-order accumulator.
    pub inverse_risk_mass: f64,
}

impl fmt::Display for AccumulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} events={} risk-set range=[{:.6e}, {:.6e}] inverse-risk mass={:.6e}",
            self.subjects,
            self.events,
            self.smallest_risk_set,
            self.largest_risk_set,
            self.inverse_risk_mass
        )
    }
}

pub trait SweepObserver: fmt::Debug + Send + Sync {
    fn on_accumulated(&self, summary: &AccumulationSummary);
}

/// Discards every summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SweepObserver for NoopObserver {
    fn on_accumulated(&self, _: &AccumulationSummary) {}
}

/// Forwards summaries to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SweepObserver for LogObserver {
    fn on_accumulated(&self, summary: &AccumulationSummary) {
        log::debug!("[Cox accumulation] {summary}");
        // A risk-set sum this far below the total means exp(eta) spans many orders
        // of magnitude and the inverse-risk terms lose precision.
        if summary.smallest_risk_set > 0.0
            && summary.largest_risk_set / summary.smallest_risk_set > 1e12
        {
            log::warn!(
                "Risk-set sums span {:.3e} to {:.3e}; consider centering the linear predictor",
                summary.smallest_risk_set,
                summary.largest_risk_set
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_display_mentions_counts() {
        let summary = AccumulationSummary {
            subjects: 4,
            events: 3,
            largest_risk_set: 4.0,
            smallest_risk_set: 1.0,
            inverse_risk_mass: 1.75,
        };
        let rendered = summary.to_string();
        assert!(rendered.starts_with("n=4 events=3"));
        // Both observers accept the summary without side effects on it.
        LogObserver.on_accumulated(&summary);
        NoopObserver.on_accumulated(&summary);
    }
}
