//! Reserve for benefits to be granted (active participants)

use crate::present_value::{present_value, vpa_with_admin_fee_erosion};
use crate::projection::{ActuarialContext, ProjectionSeries};

use super::types::PresentValues;

/// PVs of benefits, fee-eroded contributions and salaries, discounted at the plan rate
pub fn present_values(series: &ProjectionSeries, ctx: &ActuarialContext) -> PresentValues {
    let rate = ctx.discount_rate_monthly;
    let timing = ctx.payment_timing;
    let mtr = ctx.months_to_retirement;
    let n = series.len();

    PresentValues {
        benefits: present_value(&series.benefits, &series.survival, rate, timing, mtr, n),
        contributions: vpa_with_admin_fee_erosion(
            &series.contributions,
            &series.survival,
            rate,
            ctx.admin_fee_monthly,
            timing,
            mtr,
        ),
        salaries: present_value(&series.salaries, &series.survival, rate, timing, 0, mtr),
    }
}

/// RMBA = VPA(benefits) - VPA(contributions); zero once retired
pub fn rmba(pv: &PresentValues, ctx: &ActuarialContext) -> f64 {
    if ctx.is_already_retired {
        return 0.0;
    }
    pv.benefits - pv.contributions
}
