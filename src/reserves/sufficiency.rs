//! Deficit/surplus and the contribution rate that closes it

use crate::participant::ParticipantState;
use crate::validation::sanitize;

use super::types::{PresentValues, ReserveState, Sufficiency};

/// Compare the available balance with the reserve of the participant's phase
pub fn sufficiency(
    state: &ParticipantState,
    reserve_state: ReserveState,
    rmba: f64,
    rmbc: f64,
    pv: &PresentValues,
    max_contribution_rate: f64,
) -> Sufficiency {
    let required = match reserve_state {
        ReserveState::Active => rmba,
        ReserveState::Retired => rmbc,
    };
    let deficit_surplus = state.initial_balance - required;

    let deficit_surplus_pct = if pv.benefits > 0.0 {
        sanitize(deficit_surplus / pv.benefits * 100.0)
    } else {
        None
    };

    let required_contribution_rate = match reserve_state {
        ReserveState::Active if pv.salaries > 0.0 => {
            ((rmba - state.initial_balance) / pv.salaries * 100.0).clamp(0.0, max_contribution_rate)
        }
        _ => 0.0,
    };

    Sufficiency {
        deficit_surplus,
        deficit_surplus_pct,
        required_contribution_rate,
    }
}
