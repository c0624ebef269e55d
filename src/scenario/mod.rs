//! What-if analysis on top of a single valuation
//!
//! - [`solve`]: find the benefit, contribution rate, salary or retirement age
//!   that brings the deficit/surplus to zero
//! - [`run_sensitivity`]: re-value under a set of assumption shocks

mod memo;
mod root_finding;
mod sensitivity;
mod solver;

pub use memo::{MemoTable, TrialKey};
pub use root_finding::{Bounds, SolverOutcome, Strategy};
pub use sensitivity::{
    run_sensitivity, shocks_from_config, SensitivityMetrics, SensitivityRow, Shock, ShockParameter,
};
pub use solver::{solve, SolveFor, SolverReport};
