//! Normal cost under the projected unit credit and entry age normal methods

use crate::participant::{CalculationMethod, ParticipantState};
use crate::present_value::multi_payment_life_annuity_factor;
use crate::projection::{ActuarialContext, ProjectionSeries};

use super::types::PresentValues;

/// PUC: value today of one year's accrual of `accrual_rate`% of final salary
///
/// The accrued monthly benefit is annuitised over the benefit phase with the
/// calendar's extra payments, at the discount rate net of the admin fee.
pub fn puc(state: &ParticipantState, series: &ProjectionSeries, ctx: &ActuarialContext) -> f64 {
    if ctx.is_already_retired {
        return 0.0;
    }
    let accrued_monthly = series.final_salary * state.accrual_rate / 100.0;
    let annuity = multi_payment_life_annuity_factor(
        &series.survival,
        ctx.effective_discount_monthly,
        ctx.payment_timing,
        ctx.months_to_retirement,
        series.len(),
        ctx.benefit_payments_per_year,
    );
    accrued_monthly * annuity
}

/// EAN: level cost rate over future salary applied to the current annual salary
pub fn ean(state: &ParticipantState, pv: &PresentValues, ctx: &ActuarialContext) -> f64 {
    if ctx.is_already_retired || pv.salaries <= 0.0 {
        return 0.0;
    }
    let level_rate = ((pv.benefits - state.initial_balance) / pv.salaries).max(0.0);
    level_rate * state.annual_salary()
}

/// Normal cost under the participant's chosen method
pub fn normal_cost(
    state: &ParticipantState,
    series: &ProjectionSeries,
    pv: &PresentValues,
    ctx: &ActuarialContext,
) -> f64 {
    match state.calculation_method {
        CalculationMethod::Puc => puc(state, series, ctx),
        CalculationMethod::Ean => ean(state, pv, ctx),
    }
}
