//! Survivor and disability add-ons
//!
//! These figures are reported next to the BD/CD reserves and are never folded
//! into RMBA or RMBC.

mod decrement;
mod joint;

pub use decrement::{active_in_force, disability_vpa, DisabilityBasis};
pub use joint::{joint_survival, survivor_vpa, ReversionWindow};

use serde::{Deserialize, Serialize};

use crate::assumptions::{DisabilityTable, MortalityProvider, MortalityVector};
use crate::error::EngineResult;
use crate::participant::ParticipantState;
use crate::projection::{ActuarialContext, ProjectionSeries};

/// Survivor pension value for one dependent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivorValue {
    pub dependent_index: usize,
    pub vpa: f64,
}

/// Multi-life figures for one valuation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiLifeFigures {
    pub survivors: Vec<SurvivorValue>,
    pub disability_vpa: Option<f64>,
}

impl MultiLifeFigures {
    pub fn survivor_total(&self) -> f64 {
        self.survivors.iter().map(|s| s.vpa).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.survivors.is_empty() && self.disability_vpa.is_none()
    }
}

/// Value the survivor and disability benefits attached to a participant
pub fn evaluate(
    state: &ParticipantState,
    ctx: &ActuarialContext,
    series: &ProjectionSeries,
    mortality: &MortalityVector,
    provider: &dyn MortalityProvider,
    disability: &DisabilityTable,
    max_age: u32,
) -> EngineResult<MultiLifeFigures> {
    let n = series.len();
    let mut survivors = Vec::with_capacity(state.dependents.len());

    for (index, dependent) in state.dependents.iter().enumerate() {
        let table = provider.get_table(&state.mortality_table, dependent.gender, state.mortality_aggravation)?;
        let dependent_survival = table.survival_curve(dependent.age, n, max_age);
        let window = ReversionWindow {
            start: ctx.months_to_retirement,
            end: n,
            cutoff: dependent
                .until_age
                .map(|limit| limit.saturating_sub(dependent.age) as usize * 12),
        };

        let vpa = survivor_vpa(
            &series.benefits,
            &series.survival,
            &dependent_survival,
            dependent.reversion_pct,
            ctx.discount_rate_monthly,
            ctx.payment_timing,
            window,
        );
        log::debug!("Survivor pension for dependent {} valued at {:.2}", index, vpa);
        survivors.push(SurvivorValue { dependent_index: index, vpa });
    }

    let disability_vpa = match state.disability_benefit {
        Some(benefit) if !ctx.is_already_retired => {
            let basis = DisabilityBasis {
                monthly_benefit: benefit,
                rate: ctx.discount_rate_monthly,
                timing: ctx.payment_timing,
                payments_per_year: ctx.benefit_payments_per_year,
                max_age,
            };
            Some(disability_vpa(mortality, disability, state.age, ctx.months_to_retirement, &basis))
        }
        Some(_) => Some(0.0),
        None => None,
    };

    Ok(MultiLifeFigures {
        survivors,
        disability_vpa,
    })
}
