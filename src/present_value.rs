//! Present value (VPA) and annuity factor calculations
//!
//! All functions take monthly rates and monthly vectors. Flows in projection
//! month `t` are discounted by `(1 + rate)^(t + adj)`, where `adj` is 1 for
//! payments in arrears and 0 for payments in advance.
//!
//! Numerical degeneracy never panics: a rate at or below -100% yields the
//! [`DISCOUNT_SENTINEL`] factor (so the affected terms vanish), exponents are
//! clamped, and non-finite terms are skipped.

use crate::error::{EngineResult, ValuationError};
use crate::participant::PaymentTiming;
use crate::projection::calendar::{average_payments_per_month, payments_in_month};

/// Discount factor returned for rates at or below -100%
pub const DISCOUNT_SENTINEL: f64 = 1e300;

/// Largest |ln(factor)| allowed before exponentiation
const MAX_LOG_FACTOR: f64 = 700.0;

/// Accumulation factor `(1 + rate)^(periods + adj)`
pub fn discount_factor(rate: f64, periods: usize, timing: PaymentTiming) -> f64 {
    if rate <= -1.0 || !rate.is_finite() {
        log::warn!("Discount rate {} is degenerate; using sentinel factor", rate);
        return DISCOUNT_SENTINEL;
    }
    let exponent = (periods + timing.adjustment() as usize) as f64;
    let log_factor = (exponent * rate.ln_1p()).clamp(-MAX_LOG_FACTOR, MAX_LOG_FACTOR);
    log_factor.exp()
}

fn usable_range(len: usize, start: usize, end: usize) -> std::ops::Range<usize> {
    let end = end.min(len);
    start.min(end)..end
}

fn checked_lengths(flows: &[f64], survival: &[f64]) -> usize {
    if flows.len() != survival.len() {
        log::warn!(
            "Cash flows ({}) and survival ({}) differ in length; truncating",
            flows.len(),
            survival.len()
        );
    }
    flows.len().min(survival.len())
}

/// Survival-weighted present value of `flows` over months `[start, end)`
///
/// Terms with non-positive flow or survival are skipped, as are non-finite
/// terms. Mismatched lengths are truncated to the shorter vector.
pub fn present_value(
    flows: &[f64],
    survival: &[f64],
    rate: f64,
    timing: PaymentTiming,
    start: usize,
    end: usize,
) -> f64 {
    let len = checked_lengths(flows, survival);
    usable_range(len, start, end)
        .filter(|&t| flows[t] > 0.0 && survival[t] > 0.0)
        .map(|t| flows[t] * survival[t] / discount_factor(rate, t, timing))
        .filter(|term| term.is_finite())
        .sum()
}

/// As [`present_value`], but mismatched lengths are an error
pub fn try_present_value(
    flows: &[f64],
    survival: &[f64],
    rate: f64,
    timing: PaymentTiming,
    start: usize,
    end: usize,
) -> EngineResult<f64> {
    if flows.len() != survival.len() {
        return Err(ValuationError::LengthMismatch {
            left: flows.len(),
            right: survival.len(),
        });
    }
    Ok(present_value(flows, survival, rate, timing, start, end))
}

/// Unit life annuity over `[start, end)`, valued at month 0
pub fn life_annuity_factor(survival: &[f64], rate: f64, timing: PaymentTiming, start: usize, end: usize) -> f64 {
    usable_range(survival.len(), start, end)
        .filter(|&t| survival[t] > 0.0)
        .map(|t| survival[t] / discount_factor(rate, t, timing))
        .filter(|term| term.is_finite())
        .sum()
}

/// Life annuity over `[start, end)` paying the calendar's extra payments,
/// valued at month 0
pub fn multi_payment_life_annuity_factor(
    survival: &[f64],
    rate: f64,
    timing: PaymentTiming,
    start: usize,
    end: usize,
    payments_per_year: u32,
) -> f64 {
    usable_range(survival.len(), start, end)
        .filter(|&t| survival[t] > 0.0)
        .map(|t| payments_in_month(t, payments_per_year) * survival[t] / discount_factor(rate, t, timing))
        .filter(|term| term.is_finite())
        .sum()
}

/// Life annuity valued at month `from`, conditional on survival to `from`
///
/// This is the price of one unit of monthly income bought at `from`, with
/// extra payments weighted at their average monthly rate.
pub fn conditional_life_annuity_factor(
    survival: &[f64],
    rate: f64,
    timing: PaymentTiming,
    from: usize,
    end: usize,
    payments_per_year: u32,
) -> f64 {
    let alive_at_from = match survival.get(from) {
        Some(&s) if s > 0.0 => s,
        _ => return 0.0,
    };
    let weight = average_payments_per_month(payments_per_year);
    usable_range(survival.len(), from, end)
        .filter(|&t| survival[t] > 0.0)
        .map(|t| weight * (survival[t] / alive_at_from) / discount_factor(rate, t - from, timing))
        .filter(|term| term.is_finite())
        .sum()
}

/// Annuity certain of `months` monthly payments
pub fn certain_annuity_factor(rate: f64, months: usize, timing: PaymentTiming, payments_per_year: u32) -> f64 {
    let weight = average_payments_per_month(payments_per_year);
    (0..months)
        .map(|t| weight / discount_factor(rate, t, timing))
        .filter(|term| term.is_finite())
        .sum()
}

/// Present value of contributions net of the admin fee charged until retirement
///
/// Each contribution made in month `t` is eroded by `(1 - fee_m)` for every
/// month it stays invested before retirement.
pub fn vpa_with_admin_fee_erosion(
    contributions: &[f64],
    survival: &[f64],
    rate: f64,
    admin_fee_monthly: f64,
    timing: PaymentTiming,
    months_to_retirement: usize,
) -> f64 {
    let len = checked_lengths(contributions, survival);
    let adj = timing.adjustment() as usize;
    let retention = (1.0 - admin_fee_monthly).clamp(0.0, 1.0);

    usable_range(len, 0, months_to_retirement)
        .filter(|&t| contributions[t] > 0.0 && survival[t] > 0.0)
        .map(|t| {
            let months_under_fee = months_to_retirement.saturating_sub(t + adj);
            let erosion = retention.powi(months_under_fee as i32);
            contributions[t] * survival[t] * erosion / discount_factor(rate, t, timing)
        })
        .filter(|term| term.is_finite())
        .sum()
}
