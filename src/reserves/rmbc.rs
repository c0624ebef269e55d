//! Reserve for benefits already granted (retired participants)

use crate::present_value::present_value;
use crate::projection::{ActuarialContext, ProjectionSeries};

/// RMBC = VPA of all benefits from month 0; zero while active
pub fn rmbc(series: &ProjectionSeries, ctx: &ActuarialContext) -> f64 {
    if !ctx.is_already_retired {
        return 0.0;
    }
    present_value(
        &series.benefits,
        &series.survival,
        ctx.discount_rate_monthly,
        ctx.payment_timing,
        0,
        series.len(),
    )
}
