//! Defined contribution income calculations
//!
//! The accumulated balance at retirement is converted into income under one
//! of the closed [`CdConversionMode`]s. The deficit/surplus compares that
//! balance, at the retirement date, with the balance the target income would
//! require under the same conversion factor.

pub mod conversion;
mod duration;

pub use conversion::{conversion_factor, income_from_balance, lifetime_factor, ConversionBasis};
pub use duration::expected_duration_years;

use serde::{Deserialize, Serialize};

use crate::assumptions::MortalityVector;
use crate::config::CdSettings;
use crate::participant::{CdConversionMode, ParticipantState};
use crate::present_value::{present_value, vpa_with_admin_fee_erosion};
use crate::projection::{ActuarialContext, ProjectionSeries};
use crate::validation::sanitize;

/// Complete set of CD figures for one valuation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CdFigures {
    pub conversion_mode: CdConversionMode,

    /// Balance available at the retirement date
    pub balance_at_retirement: f64,

    /// Income per ordinary payment bought by that balance
    pub monthly_income: f64,

    /// Balance per unit of income
    pub conversion_factor: f64,

    /// Expected years of income from retirement
    pub expected_duration_years: f64,

    /// Income the participant targets
    pub target_income: f64,

    /// Balance minus the balance needed for the target, at the retirement date
    pub deficit_surplus: f64,

    /// Income as percent of final salary
    pub replacement_ratio: Option<f64>,

    /// PV today of net contributions, eroded by the admin fee
    pub vpa_contributions: f64,

    /// PV today of projected income
    pub vpa_benefits: f64,
}

/// Trait for CD income calculators
pub trait CdIncomeCalculator: Send + Sync {
    /// Balance per unit of income at retirement
    fn conversion_factor(&self, state: &ParticipantState, mortality: &MortalityVector, basis: &ConversionBasis) -> f64;

    /// Expected years of income from retirement
    fn expected_duration(
        &self,
        state: &ParticipantState,
        mortality: &MortalityVector,
        balance_at_retirement: f64,
        basis: &ConversionBasis,
    ) -> f64;

    /// Pricing basis for a participant's conversion
    fn basis(&self, ctx: &ActuarialContext) -> ConversionBasis;

    /// All CD figures for one projection
    fn calculate(
        &self,
        state: &ParticipantState,
        series: &ProjectionSeries,
        ctx: &ActuarialContext,
        mortality: &MortalityVector,
    ) -> CdFigures {
        let basis = self.basis(ctx);
        let balance = series.balance_at_retirement;
        let factor = self.conversion_factor(state, mortality, &basis);
        let monthly_income = income_from_balance(balance, factor);
        let target_income = state.benefit_target.monthly_amount(series.final_salary);

        let replacement_ratio = if series.final_salary > 0.0 {
            sanitize(monthly_income / series.final_salary * 100.0)
        } else {
            None
        };

        let rate = ctx.discount_rate_monthly;
        let mtr = ctx.months_to_retirement;

        CdFigures {
            conversion_mode: state.cd_conversion_mode,
            balance_at_retirement: balance,
            monthly_income,
            conversion_factor: factor,
            expected_duration_years: self.expected_duration(state, mortality, balance, &basis),
            target_income,
            // No income can be bought when the fee eats the whole return
            deficit_surplus: if basis.is_degenerate() {
                f64::NAN
            } else {
                balance - target_income * factor
            },
            replacement_ratio,
            vpa_contributions: vpa_with_admin_fee_erosion(
                &series.contributions,
                &series.survival,
                rate,
                ctx.admin_fee_monthly,
                ctx.payment_timing,
                mtr,
            ),
            vpa_benefits: present_value(&series.benefits, &series.survival, rate, ctx.payment_timing, mtr, series.len()),
        }
    }
}

/// Standard CD conversion
#[derive(Debug, Clone)]
pub struct DefaultCdIncomeCalculator {
    max_age: u32,
    settings: CdSettings,
}

impl DefaultCdIncomeCalculator {
    pub fn new(max_age: u32, settings: CdSettings) -> Self {
        Self { max_age, settings }
    }
}

impl Default for DefaultCdIncomeCalculator {
    fn default() -> Self {
        Self::new(110, CdSettings::default())
    }
}

fn conversion_age(state: &ParticipantState) -> u32 {
    state.age.max(state.retirement_age)
}

impl CdIncomeCalculator for DefaultCdIncomeCalculator {
    fn conversion_factor(&self, state: &ParticipantState, mortality: &MortalityVector, basis: &ConversionBasis) -> f64 {
        conversion_factor(&state.cd_conversion_mode, mortality, conversion_age(state), 0, basis)
    }

    fn expected_duration(
        &self,
        state: &ParticipantState,
        mortality: &MortalityVector,
        balance_at_retirement: f64,
        basis: &ConversionBasis,
    ) -> f64 {
        expected_duration_years(
            &state.cd_conversion_mode,
            mortality,
            conversion_age(state),
            balance_at_retirement,
            basis,
            &self.settings,
        )
    }

    fn basis(&self, ctx: &ActuarialContext) -> ConversionBasis {
        ConversionBasis::new(
            ctx.conversion_monthly(),
            ctx.admin_fee_monthly,
            ctx.payment_timing,
            ctx.benefit_payments_per_year,
            self.max_age,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::TableRegistry;
    use crate::config::EngineConfig;
    use crate::participant::{BenefitTarget, Gender};
    use crate::projection::CashFlowProjector;
    use approx::assert_relative_eq;

    fn figures(state: &ParticipantState) -> CdFigures {
        let config = EngineConfig::default();
        let ctx = ActuarialContext::build(state, &config)
            .unwrap()
            .with_conversion_rates(state.effective_accumulation_rate(), state.effective_conversion_rate());
        let mortality = TableRegistry::bundled().build("BR_EMS_2021", state.gender, 0.0).unwrap();
        let series = CashFlowProjector::new(&config).project_cd(state, &ctx, &mortality);
        DefaultCdIncomeCalculator::new(config.max_age, config.cd.clone()).calculate(state, &series, &ctx, &mortality)
    }

    fn cd(mode: CdConversionMode) -> ParticipantState {
        ParticipantState::new_cd(35, Gender::Female, 7_000.0, 62, 10.0, mode, 0.05)
    }

    #[test]
    fn test_certain_ten_years() {
        let f = figures(&cd(CdConversionMode::Certain { years: 10 }));

        assert_eq!(f.expected_duration_years, 10.0);
        assert!(f.balance_at_retirement > 0.0);
        assert_relative_eq!(f.monthly_income * f.conversion_factor, f.balance_at_retirement, epsilon = 1e-6);
    }

    #[test]
    fn test_deficit_stated_at_retirement() {
        let f = figures(&cd(CdConversionMode::Actuarial).with_benefit_target(BenefitTarget::Value(1_000.0)));
        assert_relative_eq!(f.deficit_surplus, f.balance_at_retirement - 1_000.0 * f.conversion_factor, epsilon = 1e-6);
        assert!(f.deficit_surplus > 0.0);

        let f = figures(&cd(CdConversionMode::Actuarial).with_benefit_target(BenefitTarget::Value(100_000.0)));
        assert!(f.deficit_surplus < 0.0);
    }

    #[test]
    fn test_longer_term_buys_lower_income() {
        let short = figures(&cd(CdConversionMode::Certain { years: 5 }));
        let long = figures(&cd(CdConversionMode::Certain { years: 20 }));
        assert!(short.monthly_income > long.monthly_income);
        assert_relative_eq!(short.balance_at_retirement, long.balance_at_retirement);
    }

    #[test]
    fn test_lifetime_conversion() {
        let f = figures(&cd(CdConversionMode::Actuarial));
        assert!(f.conversion_factor > 100.0);
        assert!(f.expected_duration_years > 20.0);
        assert!(f.replacement_ratio.unwrap() > 0.0);
        assert!(f.vpa_benefits > 0.0);
    }

    #[test]
    fn test_retired_cd_uses_initial_balance() {
        let mut state = cd(CdConversionMode::Programmed { years: 20 }).with_initial_balance(300_000.0);
        state.age = 66;
        let f = figures(&state);

        assert_relative_eq!(f.balance_at_retirement, 300_000.0);
        assert_eq!(f.expected_duration_years, 20.0);
        assert_eq!(f.vpa_contributions, 0.0);
    }
}
