//! Monthly actuarial context derived from a participant snapshot
//!
//! Every rate the projector and the present-value engine consume is converted
//! here once, from annual decimals to monthly compounding equivalents, and the
//! projection horizon is fixed. A context is never mutated after `build`.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::participant::{ParticipantState, PaymentTiming};
use crate::validation::validate_state;

/// Convert an annual effective rate to the equivalent monthly rate
pub fn annual_to_monthly_rate(annual: f64) -> f64 {
    if annual == 0.0 {
        return 0.0;
    }
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}

/// Convert a monthly effective rate to the equivalent annual rate
pub fn monthly_to_annual_rate(monthly: f64) -> f64 {
    (1.0 + monthly).powi(12) - 1.0
}

/// Monthly haircut equivalent to an annual fee on the balance
///
/// A fee of 100% or more wipes the balance every month.
pub fn admin_fee_monthly(annual_fee: f64) -> f64 {
    if annual_fee >= 1.0 {
        log::warn!(
            "Admin fee {:.2}% is not below 100%; monthly haircut set to 1.0",
            annual_fee * 100.0
        );
        return 1.0;
    }
    if annual_fee <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - annual_fee).powf(1.0 / 12.0)
}

/// Derived monthly parameters for one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuarialContext {
    pub discount_rate_monthly: f64,
    pub salary_growth_monthly: f64,
    pub inflation_monthly: f64,

    /// Monthly fraction of the balance taken by the admin fee
    pub admin_fee_monthly: f64,

    /// Share of each contribution withheld (0..1)
    pub loading_fee: f64,

    /// Discount rate net of the admin fee: (1+i)(1-fee) - 1
    pub effective_discount_monthly: f64,

    /// Months until the first benefit month (0 once retired)
    pub months_to_retirement: usize,

    /// Length of every projected vector
    pub total_months: usize,

    pub is_already_retired: bool,

    /// Whether the requested horizon was lengthened to cover retirement
    pub horizon_extended: bool,

    pub salary_payments_per_year: u32,
    pub benefit_payments_per_year: u32,
    pub payment_timing: PaymentTiming,

    /// CD accumulation-phase monthly rate, when attached
    pub accumulation_rate_monthly: Option<f64>,

    /// CD distribution-phase monthly rate, when attached
    pub conversion_rate_monthly: Option<f64>,
}

impl ActuarialContext {
    /// Validate the participant and derive its monthly context
    pub fn build(state: &ParticipantState, config: &EngineConfig) -> EngineResult<Self> {
        validate_state(state, config)?;

        let is_already_retired = state.is_already_retired();
        let years_to_retirement = state.years_to_retirement();

        let (total_years, horizon_extended) = if is_already_retired {
            let remaining_lifetime = config.max_age.saturating_sub(state.age);
            (config.max_retirement_projection_years.min(remaining_lifetime).max(1), false)
        } else if state.projection_years.saturating_sub(years_to_retirement) < config.min_retirement_years {
            let extended = years_to_retirement + config.min_retirement_years;
            log::info!(
                "Projection horizon extended from {} to {} years to cover {} retirement years",
                state.projection_years,
                extended,
                config.min_retirement_years
            );
            (extended, true)
        } else {
            (state.projection_years, false)
        };

        let discount_rate_monthly = annual_to_monthly_rate(state.discount_rate);
        let admin_fee_monthly = admin_fee_monthly(state.admin_fee_rate);

        Ok(Self {
            discount_rate_monthly,
            salary_growth_monthly: annual_to_monthly_rate(state.salary_growth_rate),
            inflation_monthly: annual_to_monthly_rate(state.inflation_rate),
            admin_fee_monthly,
            loading_fee: state.loading_fee_rate / 100.0,
            effective_discount_monthly: (1.0 + discount_rate_monthly) * (1.0 - admin_fee_monthly) - 1.0,
            months_to_retirement: years_to_retirement as usize * 12,
            total_months: total_years as usize * 12,
            is_already_retired,
            horizon_extended,
            salary_payments_per_year: state.salary_payments_per_year,
            benefit_payments_per_year: state.benefit_payments_per_year,
            payment_timing: state.payment_timing,
            accumulation_rate_monthly: None,
            conversion_rate_monthly: None,
        })
    }

    /// Attach CD phase rates (annual decimals)
    pub fn with_conversion_rates(mut self, accumulation_annual: f64, conversion_annual: f64) -> Self {
        self.accumulation_rate_monthly = Some(annual_to_monthly_rate(accumulation_annual));
        self.conversion_rate_monthly = Some(annual_to_monthly_rate(conversion_annual));
        self
    }

    /// CD accumulation rate, falling back to the discount rate
    pub fn accumulation_monthly(&self) -> f64 {
        self.accumulation_rate_monthly.unwrap_or(self.discount_rate_monthly)
    }

    /// CD conversion rate, falling back to the discount rate
    pub fn conversion_monthly(&self) -> f64 {
        self.conversion_rate_monthly.unwrap_or(self.discount_rate_monthly)
    }

    /// Months of benefit payment inside the horizon
    pub fn benefit_months(&self) -> usize {
        self.total_months.saturating_sub(self.months_to_retirement)
    }
}
