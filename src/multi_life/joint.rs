//! Joint-life survival and reversionary (survivor) annuities
//!
//! Lives are assumed independent, so the probability both are alive is the
//! product of the single-life probabilities.

use crate::participant::PaymentTiming;
use crate::present_value::discount_factor;

/// p_xy(t) = p_x(t) * p_y(t), truncated to the shorter vector
pub fn joint_survival(px: &[f64], py: &[f64]) -> Vec<f64> {
    px.iter().zip(py).map(|(x, y)| x * y).collect()
}

/// Window of a reversionary annuity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversionWindow {
    pub start: usize,
    pub end: usize,
    /// First month in which the dependent no longer qualifies
    pub cutoff: Option<usize>,
}

/// PV of `reversion_pct`% of the participant's benefit, paid while the
/// dependent survives the participant
///
/// Σ rev% × benefit_t × (p_y(t) − p_xy(t)) / DF_t over the window.
pub fn survivor_vpa(
    benefits: &[f64],
    participant_survival: &[f64],
    dependent_survival: &[f64],
    reversion_pct: f64,
    rate: f64,
    timing: PaymentTiming,
    window: ReversionWindow,
) -> f64 {
    let len = benefits
        .len()
        .min(participant_survival.len())
        .min(dependent_survival.len());
    let end = window.end.min(len).min(window.cutoff.unwrap_or(usize::MAX));
    let share = reversion_pct / 100.0;

    (window.start.min(end)..end)
        .filter(|&t| benefits[t] > 0.0)
        .map(|t| {
            let py = dependent_survival[t];
            let pxy = participant_survival[t] * py;
            share * benefits[t] * (py - pxy).max(0.0) / discount_factor(rate, t, timing)
        })
        .filter(|term| term.is_finite())
        .sum()
}
