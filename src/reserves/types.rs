//! Core types for BD reserve calculations

use serde::{Deserialize, Serialize};

use crate::projection::ActuarialContext;

/// Phase of a BD participant at the valuation date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReserveState {
    /// Contributing; benefits not yet granted (RMBA applies)
    Active,
    /// Receiving benefits (RMBC applies)
    Retired,
}

impl ReserveState {
    pub fn of(ctx: &ActuarialContext) -> Self {
        if ctx.is_already_retired {
            ReserveState::Retired
        } else {
            ReserveState::Active
        }
    }
}

/// Present values underlying the BD reserves
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentValues {
    /// Survival-weighted PV of benefits from the first benefit month
    pub benefits: f64,

    /// Survival-weighted PV of net contributions until retirement, eroded by the admin fee
    pub contributions: f64,

    /// Survival-weighted PV of salaries until retirement
    pub salaries: f64,
}

/// Funding position against the required reserve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sufficiency {
    /// Available resources minus the required reserve (positive = surplus)
    pub deficit_surplus: f64,

    /// Deficit/surplus as percent of the PV of benefits
    pub deficit_surplus_pct: Option<f64>,

    /// Contribution rate (percent of salary) that closes the gap, capped by policy
    pub required_contribution_rate: f64,
}

/// Complete set of BD figures for one valuation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BdFigures {
    pub state: ReserveState,
    pub rmba: f64,
    pub rmbc: f64,
    pub normal_cost: f64,
    pub present_values: PresentValues,
    pub sufficiency: Sufficiency,
}

impl BdFigures {
    /// Reserve that applies in the participant's phase
    pub fn required_reserve(&self) -> f64 {
        match self.state {
            ReserveState::Active => self.rmba,
            ReserveState::Retired => self.rmbc,
        }
    }
}
