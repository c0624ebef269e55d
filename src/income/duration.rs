//! Expected length of the CD benefit phase

use crate::assumptions::MortalityVector;
use crate::config::CdSettings;
use crate::participant::CdConversionMode;

use super::conversion::{conversion_factor, income_from_balance, ConversionBasis};

/// Expected benefit duration in years from the retirement date
///
/// Term-certain and programmed modes last exactly their term. Lifetime modes
/// run until survival falls below the configured floor. Percentage drawdown
/// runs until the income drops under the income floor or the balance is gone.
/// Every simulation stops at `max_duration_years`.
pub fn expected_duration_years(
    mode: &CdConversionMode,
    mortality: &MortalityVector,
    retirement_age: u32,
    balance_at_retirement: f64,
    basis: &ConversionBasis,
    settings: &CdSettings,
) -> f64 {
    if let Some(years) = mode.finite_years() {
        return years as f64;
    }

    let max_months = settings.max_duration_years as usize * 12;
    let survival = mortality.survival_curve(retirement_age, max_months, basis.max_age);
    let growth = 1.0 + basis.net_rate;

    let mut balance = balance_at_retirement;
    let mut income = 0.0;
    let mut months = 0;

    for t in 0..max_months {
        if survival[t] < settings.survival_floor {
            break;
        }

        if t % 12 == 0 && (t == 0 || mode.recomputes_annually()) {
            let years_elapsed = (t / 12) as u32;
            let age = retirement_age + years_elapsed;
            income = income_from_balance(balance, conversion_factor(mode, mortality, age, years_elapsed, basis));
        }

        if !mode.is_lifelong() && (balance <= 0.0 || income < settings.income_floor) {
            break;
        }

        balance = (balance * growth - income).max(0.0);
        months += 1;
    }

    months as f64 / 12.0
}
