//! Conversion of a CD balance into periodic income
//!
//! Income is expressed per payment: the amount paid in an ordinary month.
//! Months carrying a 13th or 14th payment pay a multiple of it.

use crate::assumptions::MortalityVector;
use crate::participant::{CdConversionMode, PaymentTiming};
use crate::present_value::{certain_annuity_factor, conditional_life_annuity_factor};

/// Pricing basis shared by every conversion mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionBasis {
    /// Monthly conversion rate net of the admin fee
    pub net_rate: f64,
    pub timing: PaymentTiming,
    pub payments_per_year: u32,
    pub max_age: u32,
}

impl ConversionBasis {
    /// Net rate from monthly conversion rate and monthly admin fee
    pub fn new(conversion_monthly: f64, admin_fee_monthly: f64, timing: PaymentTiming, payments_per_year: u32, max_age: u32) -> Self {
        Self {
            net_rate: (1.0 + conversion_monthly) * (1.0 - admin_fee_monthly) - 1.0,
            timing,
            payments_per_year,
            max_age,
        }
    }

    /// Net rate at or below -100%: the fee leaves nothing to pay out
    pub fn is_degenerate(&self) -> bool {
        !(self.net_rate > -1.0)
    }
}

/// Single-life annuity factor for an annuitant aged `age`, through `max_age`
pub fn lifetime_factor(mortality: &MortalityVector, age: u32, basis: &ConversionBasis) -> f64 {
    let months = (basis.max_age.saturating_sub(age) as usize + 1) * 12;
    let survival = mortality.survival_curve(age, months, basis.max_age);
    conditional_life_annuity_factor(&survival, basis.net_rate, basis.timing, 0, months, basis.payments_per_year)
}

/// Balance needed per unit of income under `mode`
///
/// `age` is the attained age at the time of (re)conversion and
/// `years_elapsed` the whole years since retirement.
pub fn conversion_factor(
    mode: &CdConversionMode,
    mortality: &MortalityVector,
    age: u32,
    years_elapsed: u32,
    basis: &ConversionBasis,
) -> f64 {
    if basis.is_degenerate() {
        return 0.0;
    }
    match *mode {
        CdConversionMode::Actuarial | CdConversionMode::ActuarialEquivalent => {
            lifetime_factor(mortality, age, basis)
        }
        CdConversionMode::Certain { years } => {
            certain_annuity_factor(basis.net_rate, years as usize * 12, basis.timing, basis.payments_per_year)
        }
        CdConversionMode::Programmed { years } => {
            let remaining = years.saturating_sub(years_elapsed) as usize;
            certain_annuity_factor(basis.net_rate, remaining * 12, basis.timing, basis.payments_per_year)
        }
        CdConversionMode::Percentage { annual_pct } => {
            if annual_pct > 0.0 {
                basis.payments_per_year as f64 * 100.0 / annual_pct
            } else {
                0.0
            }
        }
    }
}

/// Income per payment bought by `balance` at `factor`
pub fn income_from_balance(balance: f64, factor: f64) -> f64 {
    if factor > 0.0 && factor.is_finite() && balance > 0.0 {
        balance / factor
    } else {
        0.0
    }
}

/// Whether income stops being paid `months_since_retirement` into the benefit phase
pub fn income_expired(mode: &CdConversionMode, months_since_retirement: usize) -> bool {
    match mode.finite_years() {
        Some(years) => months_since_retirement >= years as usize * 12,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::TableRegistry;
    use crate::participant::Gender;
    use approx::assert_relative_eq;

    fn basis(net_rate: f64) -> ConversionBasis {
        ConversionBasis {
            net_rate,
            timing: PaymentTiming::Arrears,
            payments_per_year: 12,
            max_age: 110,
        }
    }

    fn table() -> MortalityVector {
        TableRegistry::bundled().build("BR_EMS_2021", Gender::Male, 0.0).unwrap()
    }

    #[test]
    fn test_net_rate_includes_admin_fee() {
        let b = ConversionBasis::new(0.004, 0.001, PaymentTiming::Arrears, 12, 110);
        assert_relative_eq!(b.net_rate, 1.004 * 0.999 - 1.0);
    }

    #[test]
    fn test_full_admin_fee_pays_no_income() {
        let b = ConversionBasis::new(0.004, 1.0, PaymentTiming::Arrears, 12, 110);
        assert!(b.is_degenerate());
        assert!(!basis(0.004).is_degenerate());

        let table = table();
        for mode in [
            CdConversionMode::Certain { years: 10 },
            CdConversionMode::Programmed { years: 10 },
            CdConversionMode::Actuarial,
            CdConversionMode::Percentage { annual_pct: 6.0 },
        ] {
            let factor = conversion_factor(&mode, &table, 65, 0, &b);
            assert_eq!(factor, 0.0, "{:?}", mode);
            assert_eq!(income_from_balance(500_000.0, factor), 0.0);
        }
    }

    #[test]
    fn test_percentage_factor() {
        let mode = CdConversionMode::Percentage { annual_pct: 6.0 };
        let factor = conversion_factor(&mode, &table(), 65, 0, &basis(0.004));
        assert_relative_eq!(factor, 200.0);
        assert_relative_eq!(income_from_balance(1_200_000.0, factor), 6_000.0);
    }

    #[test]
    fn test_certain_factor_is_level() {
        let mode = CdConversionMode::Certain { years: 10 };
        let at_start = conversion_factor(&mode, &table(), 65, 0, &basis(0.0));
        let later = conversion_factor(&mode, &table(), 70, 5, &basis(0.0));
        assert_relative_eq!(at_start, 120.0);
        assert_relative_eq!(later, 120.0);
    }

    #[test]
    fn test_programmed_factor_shrinks() {
        let mode = CdConversionMode::Programmed { years: 20 };
        let table = table();
        assert_relative_eq!(conversion_factor(&mode, &table, 65, 0, &basis(0.0)), 240.0);
        assert_relative_eq!(conversion_factor(&mode, &table, 84, 19, &basis(0.0)), 12.0);
        assert_eq!(conversion_factor(&mode, &table, 85, 20, &basis(0.0)), 0.0);
        assert_eq!(income_from_balance(1000.0, 0.0), 0.0);
    }

    #[test]
    fn test_lifetime_factor_falls_with_age() {
        let table = table();
        let at_60 = lifetime_factor(&table, 60, &basis(0.004));
        let at_75 = lifetime_factor(&table, 75, &basis(0.004));
        assert!(at_60 > at_75);
        assert!(at_60 < certain_annuity_factor(0.004, 50 * 12, PaymentTiming::Arrears, 12));
    }

    #[test]
    fn test_income_expiry() {
        let certain = CdConversionMode::Certain { years: 5 };
        assert!(!income_expired(&certain, 59));
        assert!(income_expired(&certain, 60));
        assert!(!income_expired(&CdConversionMode::Actuarial, 10_000));
    }
}
