//! Defined benefit reserve calculations
//!
//! A BD participant is in one of two states at the valuation date:
//! - **Active**: the required reserve is the RMBA, benefits to be granted net
//!   of future contributions
//! - **Retired**: the required reserve is the RMBC, all benefits in payment
//!
//! The reserve of the other state is reported as zero. Normal cost follows the
//! participant's cost method (PUC or EAN) and is zero once retired.
//!
//! # Example
//!
//! ```rust,ignore
//! use pension_valuation::reserves::{BdReserveCalculator, DefaultBdReserveCalculator};
//!
//! let calculator = DefaultBdReserveCalculator::new(50.0);
//! let figures = calculator.calculate(&state, &series, &ctx);
//! println!("RMBA: {:.2}", figures.rmba);
//! ```

mod normal_cost;
mod rmba;
mod rmbc;
mod sufficiency;
mod types;

pub use types::{BdFigures, PresentValues, ReserveState, Sufficiency};

use crate::participant::ParticipantState;
use crate::projection::{ActuarialContext, ProjectionSeries};

/// Trait for BD reserve calculators
///
/// Implement this trait to plug a different reserving basis into the engine.
pub trait BdReserveCalculator: Send + Sync {
    /// Present values of benefits, contributions and salaries
    fn present_values(&self, series: &ProjectionSeries, ctx: &ActuarialContext) -> PresentValues;

    /// Reserve for benefits to be granted
    fn rmba(&self, pv: &PresentValues, ctx: &ActuarialContext) -> f64;

    /// Reserve for benefits granted
    fn rmbc(&self, series: &ProjectionSeries, ctx: &ActuarialContext) -> f64;

    /// Normal cost for the coming year
    fn normal_cost(
        &self,
        state: &ParticipantState,
        series: &ProjectionSeries,
        pv: &PresentValues,
        ctx: &ActuarialContext,
    ) -> f64;

    /// Deficit/surplus against the applicable reserve
    fn sufficiency(
        &self,
        state: &ParticipantState,
        reserve_state: ReserveState,
        rmba: f64,
        rmbc: f64,
        pv: &PresentValues,
    ) -> Sufficiency;

    /// All BD figures for one projection
    fn calculate(&self, state: &ParticipantState, series: &ProjectionSeries, ctx: &ActuarialContext) -> BdFigures {
        let reserve_state = ReserveState::of(ctx);
        let pv = self.present_values(series, ctx);
        let rmba = self.rmba(&pv, ctx);
        let rmbc = self.rmbc(series, ctx);
        let normal_cost = self.normal_cost(state, series, &pv, ctx);
        let sufficiency = self.sufficiency(state, reserve_state, rmba, rmbc, &pv);

        BdFigures {
            state: reserve_state,
            rmba,
            rmbc,
            normal_cost,
            present_values: pv,
            sufficiency,
        }
    }
}

/// Standard reserving basis
#[derive(Debug, Clone)]
pub struct DefaultBdReserveCalculator {
    /// Cap on the reported required contribution rate (percent)
    max_contribution_rate: f64,
}

impl DefaultBdReserveCalculator {
    pub fn new(max_contribution_rate: f64) -> Self {
        Self { max_contribution_rate }
    }
}

impl Default for DefaultBdReserveCalculator {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl BdReserveCalculator for DefaultBdReserveCalculator {
    fn present_values(&self, series: &ProjectionSeries, ctx: &ActuarialContext) -> PresentValues {
        rmba::present_values(series, ctx)
    }

    fn rmba(&self, pv: &PresentValues, ctx: &ActuarialContext) -> f64 {
        rmba::rmba(pv, ctx)
    }

    fn rmbc(&self, series: &ProjectionSeries, ctx: &ActuarialContext) -> f64 {
        rmbc::rmbc(series, ctx)
    }

    fn normal_cost(
        &self,
        state: &ParticipantState,
        series: &ProjectionSeries,
        pv: &PresentValues,
        ctx: &ActuarialContext,
    ) -> f64 {
        normal_cost::normal_cost(state, series, pv, ctx)
    }

    fn sufficiency(
        &self,
        state: &ParticipantState,
        reserve_state: ReserveState,
        rmba: f64,
        rmbc: f64,
        pv: &PresentValues,
    ) -> Sufficiency {
        sufficiency::sufficiency(state, reserve_state, rmba, rmbc, pv, self.max_contribution_rate)
    }
}
