//! Input validation, output sanitation and advisory economic checks

use crate::config::{EngineConfig, WarningThresholds};
use crate::error::{EngineResult, ValuationError};
use crate::participant::{BenefitTarget, CdConversionMode, ParticipantState, PlanType};

pub const MIN_AGE: u32 = 16;
pub const MAX_ENTRY_AGE: u32 = 100;
pub const MIN_RETIREMENT_AGE: u32 = 40;
pub const MAX_RETIREMENT_AGE: u32 = 85;

/// Certain-annuity terms offered by CD plans
pub const CERTAIN_TERMS: [u32; 4] = [5, 10, 15, 20];

fn check_range(field: &str, value: f64, min: f64, max: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(ValuationError::invalid(field, format!("{} is not finite", value)));
    }
    if value < min || value > max {
        return Err(ValuationError::invalid(
            field,
            format!("{} outside [{}, {}]", value, min, max),
        ));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> EngineResult<()> {
    check_range(field, value, 0.0, f64::MAX)
}

/// Reject states the engine cannot value
pub fn validate_state(state: &ParticipantState, config: &EngineConfig) -> EngineResult<()> {
    let max_age = MAX_ENTRY_AGE.min(config.max_age.saturating_sub(1));
    if state.age < MIN_AGE || state.age > max_age {
        return Err(ValuationError::invalid(
            "age",
            format!("{} outside [{}, {}]", state.age, MIN_AGE, max_age),
        ));
    }
    if state.retirement_age < MIN_RETIREMENT_AGE || state.retirement_age > MAX_RETIREMENT_AGE {
        return Err(ValuationError::invalid(
            "retirement_age",
            format!(
                "{} outside [{}, {}]",
                state.retirement_age, MIN_RETIREMENT_AGE, MAX_RETIREMENT_AGE
            ),
        ));
    }

    check_non_negative("salary", state.salary)?;
    check_non_negative("initial_balance", state.initial_balance)?;
    check_range("contribution_rate", state.contribution_rate, 0.0, 100.0)?;
    check_range("accrual_rate", state.accrual_rate, 0.0, 100.0)?;
    check_range("discount_rate", state.discount_rate, -0.10, 0.30)?;
    check_range("salary_growth_rate", state.salary_growth_rate, -0.10, 0.20)?;
    check_range("inflation_rate", state.inflation_rate, -0.05, 0.30)?;
    check_range("admin_fee_rate", state.admin_fee_rate, 0.0, 1.0)?;
    check_range("mortality_aggravation", state.mortality_aggravation, -50.0, 50.0)?;

    if !(0.0..100.0).contains(&state.loading_fee_rate) {
        return Err(ValuationError::invalid(
            "loading_fee_rate",
            format!("{} outside [0, 100)", state.loading_fee_rate),
        ));
    }

    match state.benefit_target {
        BenefitTarget::Value(amount) => check_non_negative("benefit_target", amount)?,
        BenefitTarget::ReplacementRate(pct) => check_range("benefit_target", pct, 0.0, 200.0)?,
    }

    for (field, ppy) in [
        ("salary_payments_per_year", state.salary_payments_per_year),
        ("benefit_payments_per_year", state.benefit_payments_per_year),
    ] {
        if !(12..=14).contains(&ppy) {
            return Err(ValuationError::invalid(field, format!("{} outside [12, 14]", ppy)));
        }
    }

    if !(1..=100).contains(&state.projection_years) {
        return Err(ValuationError::invalid(
            "projection_years",
            format!("{} outside [1, 100]", state.projection_years),
        ));
    }

    if state.mortality_table.trim().is_empty() {
        return Err(ValuationError::invalid("mortality_table", "empty table code"));
    }

    if state.plan_type == PlanType::Cd {
        validate_cd(state)?;
    }

    for (i, dependent) in state.dependents.iter().enumerate() {
        let field = format!("dependents[{}]", i);
        if dependent.age > max_age {
            return Err(ValuationError::invalid(field, format!("age {} above {}", dependent.age, max_age)));
        }
        check_range(&field, dependent.reversion_pct, 0.0, 100.0)?;
        if let Some(limit) = dependent.until_age {
            if limit <= dependent.age {
                return Err(ValuationError::invalid(
                    field,
                    format!("until_age {} not above age {}", limit, dependent.age),
                ));
            }
        }
    }

    if let Some(amount) = state.disability_benefit {
        check_non_negative("disability_benefit", amount)?;
    }

    Ok(())
}

fn validate_cd(state: &ParticipantState) -> EngineResult<()> {
    if let Some(rate) = state.accumulation_rate {
        check_range("accumulation_rate", rate, -0.10, 0.30)?;
    }
    if let Some(rate) = state.conversion_rate {
        check_range("conversion_rate", rate, -0.10, 0.30)?;
    }

    match state.cd_conversion_mode {
        CdConversionMode::Certain { years } if !CERTAIN_TERMS.contains(&years) => Err(ValuationError::invalid(
            "cd_conversion_mode",
            format!("certain term {} not one of {:?}", years, CERTAIN_TERMS),
        )),
        CdConversionMode::Programmed { years } if !(1..=50).contains(&years) => Err(ValuationError::invalid(
            "cd_conversion_mode",
            format!("programmed term {} outside [1, 50]", years),
        )),
        CdConversionMode::Percentage { annual_pct } if !(annual_pct > 0.0 && annual_pct <= 100.0) => {
            Err(ValuationError::invalid(
                "cd_conversion_mode",
                format!("withdrawal percentage {} outside (0, 100]", annual_pct),
            ))
        }
        _ => Ok(()),
    }
}

/// Map non-finite outputs to `None`
pub fn sanitize(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Inputs to the advisory economic checks
#[derive(Debug, Clone, Copy, Default)]
pub struct EconomicSnapshot {
    pub vpa_contributions: f64,
    pub vpa_benefits: f64,
    pub deficit_surplus: f64,
    pub monthly_salary: f64,
    pub replacement_ratio: Option<f64>,
}

/// Advisory warnings; never block a valuation
pub fn economic_warnings(snapshot: &EconomicSnapshot, thresholds: &WarningThresholds) -> Vec<String> {
    let mut warnings = Vec::new();

    if snapshot.vpa_benefits > 0.0
        && snapshot.vpa_contributions > thresholds.contribution_to_benefit_ratio * snapshot.vpa_benefits
    {
        warnings.push(format!(
            "VPA of contributions ({:.2}) exceeds {}x VPA of benefits ({:.2})",
            snapshot.vpa_contributions, thresholds.contribution_to_benefit_ratio, snapshot.vpa_benefits
        ));
    }

    if snapshot.monthly_salary > 0.0
        && snapshot.deficit_surplus.abs() > thresholds.deficit_to_salary_ratio * snapshot.monthly_salary
    {
        warnings.push(format!(
            "Deficit/surplus ({:.2}) exceeds {}x the monthly salary",
            snapshot.deficit_surplus, thresholds.deficit_to_salary_ratio
        ));
    }

    if let Some(ratio) = snapshot.replacement_ratio {
        if ratio > thresholds.max_replacement_ratio {
            warnings.push(format!(
                "Replacement ratio {:.1}% exceeds {}%",
                ratio, thresholds.max_replacement_ratio
            ));
        }
    }

    for warning in &warnings {
        log::warn!("{}", warning);
    }
    warnings
}
