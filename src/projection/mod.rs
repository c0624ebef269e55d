//! Actuarial context derivation and monthly cash-flow projection

pub mod calendar;
mod cashflows;
pub mod context;
mod engine;

pub use cashflows::{write_yearly_csv, ProjectionSeries, YearlyRow};
pub use context::{annual_to_monthly_rate, monthly_to_annual_rate, ActuarialContext};
pub use engine::CashFlowProjector;
