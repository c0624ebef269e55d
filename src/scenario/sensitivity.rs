//! Sensitivity sweep: re-value under shocked assumptions
//!
//! Rows are evaluated in parallel and collected in the order the shocks were
//! generated, so two sweeps of the same input serialise identically.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SensitivityShocks;
use crate::error::EngineResult;
use crate::participant::ParticipantState;
use crate::validation::sanitize;

/// Assumption moved by a shock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockParameter {
    DiscountRate,
    MortalityAggravation,
    RetirementAge,
    SalaryGrowth,
    Inflation,
}

/// Additive shift to one assumption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shock {
    pub parameter: ShockParameter,
    pub delta: f64,
}

impl Shock {
    /// Participant with the shock applied; `None` when the shifted value is not representable
    pub fn apply(&self, state: &ParticipantState) -> Option<ParticipantState> {
        let mut shocked = state.clone();
        match self.parameter {
            ShockParameter::DiscountRate => shocked.discount_rate += self.delta,
            ShockParameter::MortalityAggravation => shocked.mortality_aggravation += self.delta,
            ShockParameter::SalaryGrowth => shocked.salary_growth_rate += self.delta,
            ShockParameter::Inflation => shocked.inflation_rate += self.delta,
            ShockParameter::RetirementAge => {
                let age = state.retirement_age as i64 + self.delta.round() as i64;
                shocked.retirement_age = u32::try_from(age).ok()?;
            }
        }
        Some(shocked)
    }
}

/// Expand configured magnitudes into down/up shocks in a fixed order
pub fn shocks_from_config(config: &SensitivityShocks) -> Vec<Shock> {
    let groups: [(ShockParameter, Vec<f64>); 5] = [
        (ShockParameter::DiscountRate, config.discount_rate.clone()),
        (ShockParameter::MortalityAggravation, config.mortality_aggravation.clone()),
        (
            ShockParameter::RetirementAge,
            config.retirement_age.iter().map(|&y| y as f64).collect(),
        ),
        (ShockParameter::SalaryGrowth, config.salary_growth.clone()),
        (ShockParameter::Inflation, config.inflation.clone()),
    ];

    groups
        .into_iter()
        .flat_map(|(parameter, magnitudes)| {
            magnitudes.into_iter().flat_map(move |m| {
                let m = m.abs();
                [
                    Shock { parameter, delta: -m },
                    Shock { parameter, delta: m },
                ]
            })
        })
        .filter(|shock| shock.delta != 0.0)
        .collect()
}

/// Figures compared across shocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMetrics {
    /// Required reserve (BD) or balance at retirement (CD)
    pub reserve: f64,
    pub deficit_surplus: f64,
    /// Normal cost (BD) or monthly income (CD)
    pub cost: f64,
}

/// One shocked valuation and its movement from the base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub parameter: ShockParameter,
    pub delta: f64,
    pub reserve: Option<f64>,
    pub deficit_surplus: Option<f64>,
    pub cost: Option<f64>,
    pub reserve_change: Option<f64>,
    pub deficit_surplus_change: Option<f64>,
    pub cost_change: Option<f64>,
}

impl SensitivityRow {
    fn new(shock: Shock, base: &SensitivityMetrics, shocked: &SensitivityMetrics) -> Self {
        Self {
            parameter: shock.parameter,
            delta: shock.delta,
            reserve: sanitize(shocked.reserve),
            deficit_surplus: sanitize(shocked.deficit_surplus),
            cost: sanitize(shocked.cost),
            reserve_change: sanitize(shocked.reserve - base.reserve),
            deficit_surplus_change: sanitize(shocked.deficit_surplus - base.deficit_surplus),
            cost_change: sanitize(shocked.cost - base.cost),
        }
    }
}

/// Value the participant under every shock
///
/// The base valuation must succeed. Shocks that push the participant out of
/// the valid input space are skipped.
pub fn run_sensitivity<F>(state: &ParticipantState, shocks: &[Shock], evaluate: F) -> EngineResult<Vec<SensitivityRow>>
where
    F: Fn(&ParticipantState) -> EngineResult<SensitivityMetrics> + Sync,
{
    let base = evaluate(state)?;

    let rows: Vec<SensitivityRow> = shocks
        .par_iter()
        .filter_map(|shock| {
            let shocked_state = shock.apply(state)?;
            match evaluate(&shocked_state) {
                Ok(metrics) => Some(SensitivityRow::new(*shock, &base, &metrics)),
                Err(err) => {
                    log::debug!("Skipping shock {:?} {:+}: {}", shock.parameter, shock.delta, err);
                    None
                }
            }
        })
        .collect();

    log::info!("Sensitivity sweep produced {} of {} rows", rows.len(), shocks.len());
    Ok(rows)
}
