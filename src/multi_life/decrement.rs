//! Active-life multi-decrement survival and the disability benefit

use crate::assumptions::{DisabilityTable, MortalityVector};
use crate::participant::PaymentTiming;
use crate::present_value::{conditional_life_annuity_factor, discount_factor};

/// Probability of being alive and not disabled at the start of each month
///
/// Decrements compound as (1 − q_m)(1 − i_m) up to `active_months`; the
/// vector stops there.
pub fn active_in_force(
    mortality: &MortalityVector,
    disability: &DisabilityTable,
    start_age: u32,
    active_months: usize,
    max_age: u32,
) -> Vec<f64> {
    let mut in_force = Vec::with_capacity(active_months);
    let mut probability = 1.0_f64;

    for t in 0..active_months {
        let age = start_age + (t / 12) as u32;
        in_force.push(probability);

        let q = if age > max_age { 1.0 } else { mortality.monthly_rate(age).unwrap_or(0.0) };
        let i = disability.monthly_rate(age);
        probability = (probability * (1.0 - q) * (1.0 - i)).max(0.0);
    }

    in_force
}

/// Pricing inputs for the disability benefit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisabilityBasis {
    pub monthly_benefit: f64,
    pub rate: f64,
    pub timing: PaymentTiming,
    pub payments_per_year: u32,
    pub max_age: u32,
}

/// PV of a disability pension granted on disablement before retirement
///
/// Σ in_force(t) × i_m(age_t) × benefit × ä_disabled(age_t) / DF_t over the
/// active months, where ä_disabled is a life annuity on the disabled life.
pub fn disability_vpa(
    mortality: &MortalityVector,
    disability: &DisabilityTable,
    start_age: u32,
    active_months: usize,
    basis: &DisabilityBasis,
) -> f64 {
    if basis.monthly_benefit <= 0.0 || active_months == 0 {
        return 0.0;
    }

    let in_force = active_in_force(mortality, disability, start_age, active_months, basis.max_age);

    // One annuity factor per attained age
    let last_age = start_age + ((active_months - 1) / 12) as u32;
    let factors: Vec<f64> = (start_age..=last_age)
        .map(|age| {
            let months = (basis.max_age.saturating_sub(age) as usize + 1) * 12;
            let survival = mortality.survival_curve(age, months, basis.max_age);
            conditional_life_annuity_factor(&survival, basis.rate, basis.timing, 0, months, basis.payments_per_year)
        })
        .collect();

    (0..active_months)
        .map(|t| {
            let age = start_age + (t / 12) as u32;
            let factor = factors[(age - start_age) as usize];
            in_force[t] * disability.monthly_rate(age) * basis.monthly_benefit * factor / discount_factor(basis.rate, t, basis.timing)
        })
        .filter(|term| term.is_finite())
        .sum()
}
