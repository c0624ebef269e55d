//! Valuation engine: wires the pipeline for one participant
//!
//! validate → context → projection → BD or CD calculator → add-ons → result.
//! Sensitivity and the solver re-run the whole pipeline per trial point.

use std::sync::Arc;

use rayon::prelude::*;

use crate::assumptions::{default_provider, DisabilityTable, MortalityProvider};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::income::{CdIncomeCalculator, DefaultCdIncomeCalculator};
use crate::multi_life::{self, MultiLifeFigures};
use crate::participant::{ParticipantState, PlanType};
use crate::projection::{ActuarialContext, CashFlowProjector, ProjectionSeries};
use crate::reserves::{BdReserveCalculator, DefaultBdReserveCalculator};
use crate::results::{PlanFigures, ValuationResult};
use crate::scenario::{self, run_sensitivity, shocks_from_config, SensitivityRow, Shock, SolveFor, SolverReport};
use crate::validation::{economic_warnings, EconomicSnapshot};

/// Intermediate products of one pipeline run
#[derive(Debug, Clone)]
pub struct Valuation {
    pub context: ActuarialContext,
    pub series: ProjectionSeries,
    pub figures: PlanFigures,
    pub multi_life: MultiLifeFigures,
}

/// Main valuation engine
pub struct ValuationEngine {
    config: EngineConfig,
    mortality: Arc<dyn MortalityProvider>,
    projector: CashFlowProjector,
    bd_calculator: Box<dyn BdReserveCalculator>,
    cd_calculator: Box<dyn CdIncomeCalculator>,
    disability: DisabilityTable,
}

impl ValuationEngine {
    /// Engine over the bundled tables with the default calculators
    pub fn new(config: EngineConfig) -> Self {
        let provider = Arc::new(default_provider(&config.cache));
        Self::with_provider(config, provider)
    }

    /// Engine over a caller-supplied mortality source
    pub fn with_provider(config: EngineConfig, mortality: Arc<dyn MortalityProvider>) -> Self {
        Self {
            projector: CashFlowProjector::new(&config),
            bd_calculator: Box::new(DefaultBdReserveCalculator::new(config.max_contribution_rate)),
            cd_calculator: Box::new(DefaultCdIncomeCalculator::new(config.max_age, config.cd.clone())),
            disability: DisabilityTable::standard(),
            mortality,
            config,
        }
    }

    /// Replace the BD and CD calculators
    pub fn with_calculators(mut self, bd: Box<dyn BdReserveCalculator>, cd: Box<dyn CdIncomeCalculator>) -> Self {
        self.bd_calculator = bd;
        self.cd_calculator = cd;
        self
    }

    pub fn with_disability_table(mut self, table: DisabilityTable) -> Self {
        self.disability = table;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mortality(&self) -> &Arc<dyn MortalityProvider> {
        &self.mortality
    }

    /// Run the pipeline without assembling the output record
    pub fn run(&self, state: &ParticipantState) -> EngineResult<Valuation> {
        let mut context = ActuarialContext::build(state, &self.config)?;
        if state.plan_type == PlanType::Cd {
            context = context.with_conversion_rates(state.effective_accumulation_rate(), state.effective_conversion_rate());
        }

        let mortality = self
            .mortality
            .get_table(&state.mortality_table, state.gender, state.mortality_aggravation)?;
        let series = self.projector.project(state, &context, &mortality);

        let figures = match state.plan_type {
            PlanType::Bd => PlanFigures::Bd(self.bd_calculator.calculate(state, &series, &context)),
            PlanType::Cd => PlanFigures::Cd(self.cd_calculator.calculate(state, &series, &context, &mortality)),
        };

        let multi_life = multi_life::evaluate(
            state,
            &context,
            &series,
            &mortality,
            self.mortality.as_ref(),
            &self.disability,
            self.config.max_age,
        )?;

        Ok(Valuation {
            context,
            series,
            figures,
            multi_life,
        })
    }

    /// Full valuation of one participant
    pub fn valuate(&self, state: &ParticipantState) -> EngineResult<ValuationResult> {
        let valuation = self.run(state)?;
        let warnings = self.warnings(state, &valuation);

        log::debug!(
            "Valuation complete: {:?}, deficit/surplus {:.2}",
            state.plan_type,
            valuation.figures.deficit_surplus()
        );

        Ok(ValuationResult::new(
            state,
            &valuation.context,
            &valuation.series,
            &valuation.figures,
            &valuation.multi_life,
        )
        .with_warnings(warnings))
    }

    /// Valuation plus the configured sensitivity sweep
    pub fn valuate_with_sensitivity(&self, state: &ParticipantState) -> EngineResult<ValuationResult> {
        let result = self.valuate(state)?;
        let rows = self.sensitivity(state, &shocks_from_config(&self.config.sensitivity))?;
        Ok(result.with_sensitivity(rows))
    }

    /// Sensitivity rows for an explicit set of shocks
    pub fn sensitivity(&self, state: &ParticipantState, shocks: &[Shock]) -> EngineResult<Vec<SensitivityRow>> {
        run_sensitivity(state, shocks, |shocked| self.run(shocked).map(|v| v.figures.metrics()))
    }

    /// Find the parameter value that brings the deficit/surplus to zero
    pub fn solve(&self, state: &ParticipantState, parameter: SolveFor) -> EngineResult<SolverReport> {
        let report = scenario::solve(state, parameter, &self.config.solver, |trial| {
            self.run(trial).map(|v| v.figures.deficit_surplus())
        })?;

        if report.validated {
            log::info!(
                "Solved {:?} = {:.4} (residual {:.2}, {:?})",
                parameter,
                report.value,
                report.residual,
                report.strategy
            );
        } else {
            log::warn!(
                "Solver for {:?} did not meet tolerance; best estimate {:.4} (residual {:.2})",
                parameter,
                report.value,
                report.residual
            );
        }
        Ok(report)
    }

    /// Value many participants in parallel; results keep the input order
    pub fn valuate_batch(&self, states: &[ParticipantState]) -> Vec<EngineResult<ValuationResult>> {
        states.par_iter().map(|state| self.valuate(state)).collect()
    }

    fn warnings(&self, state: &ParticipantState, valuation: &Valuation) -> Vec<String> {
        let mut warnings = Vec::new();
        if valuation.context.horizon_extended {
            warnings.push(format!(
                "Projection horizon extended to {} years to cover {} years of retirement",
                valuation.context.total_months / 12,
                self.config.min_retirement_years
            ));
        }

        if valuation.context.admin_fee_monthly >= 1.0 {
            warnings.push("Admin fee consumes the whole balance; no income is payable".to_string());
        }

        let snapshot = match &valuation.figures {
            PlanFigures::Bd(bd) => EconomicSnapshot {
                vpa_contributions: bd.present_values.contributions,
                vpa_benefits: bd.present_values.benefits,
                deficit_surplus: bd.sufficiency.deficit_surplus,
                monthly_salary: state.salary,
                replacement_ratio: if valuation.series.final_salary > 0.0 {
                    Some(valuation.series.initial_benefit / valuation.series.final_salary * 100.0)
                } else {
                    None
                },
            },
            PlanFigures::Cd(cd) => EconomicSnapshot {
                vpa_contributions: cd.vpa_contributions,
                vpa_benefits: cd.vpa_benefits,
                deficit_surplus: cd.deficit_surplus,
                monthly_salary: state.salary,
                replacement_ratio: cd.replacement_ratio,
            },
        };
        warnings.extend(economic_warnings(&snapshot, &self.config.warnings));
        warnings
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValuationError;
    use crate::participant::{BenefitTarget, CdConversionMode, Dependent, DependentKind, Gender};
    use crate::scenario::ShockParameter;

    fn bd_state() -> ParticipantState {
        ParticipantState::new_bd(40, Gender::Male, 8_000.0, 65, BenefitTarget::Value(5_000.0), 0.05)
            .with_contribution_rate(10.0)
            .with_salary_growth(0.02)
    }

    #[test]
    fn test_bd_valuation() {
        let engine = ValuationEngine::default();
        let result = engine.valuate(&bd_state()).unwrap();

        assert_eq!(result.plan_type, PlanType::Bd);
        assert!(result.rmba.unwrap() > 0.0);
        assert_eq!(result.rmbc, Some(0.0));
        assert!(result.normal_cost.unwrap() > 0.0);
        assert!(result.balance_at_retirement.is_none());
        assert!(!result.yearly.is_empty());
    }

    #[test]
    fn test_cd_valuation() {
        let engine = ValuationEngine::default();
        let state =
            ParticipantState::new_cd(35, Gender::Female, 6_000.0, 65, 12.0, CdConversionMode::Certain { years: 15 }, 0.05);
        let result = engine.valuate(&state).unwrap();

        assert_eq!(result.plan_type, PlanType::Cd);
        assert!(result.rmba.is_none());
        assert!(result.balance_at_retirement.unwrap() > 0.0);
        assert!(result.monthly_income.unwrap() > 0.0);
        assert_eq!(result.expected_duration_years, Some(15.0));
    }

    #[test]
    fn test_full_admin_fee_pays_no_cd_income() {
        let engine = ValuationEngine::default();
        let state =
            ParticipantState::new_cd(65, Gender::Male, 0.0, 65, 0.0, CdConversionMode::Certain { years: 10 }, 0.05)
                .with_initial_balance(500_000.0)
                .with_fees(1.0, 0.0);
        let result = engine.valuate(&state).unwrap();

        assert_eq!(result.monthly_income, Some(0.0));
        assert_eq!(result.balance_at_retirement, Some(500_000.0));
        assert!(result.deficit_surplus.is_none());
        assert!(result.warnings.iter().any(|w| w.contains("Admin fee")));
    }

    #[test]
    fn test_invalid_state_is_rejected() {
        let engine = ValuationEngine::default();
        let mut state = bd_state();
        state.retirement_age = 30;

        let err = engine.valuate(&state).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_table() {
        let engine = ValuationEngine::default();
        let state = bd_state().with_mortality("NOT_A_TABLE", 0.0);
        assert!(matches!(
            engine.valuate(&state),
            Err(ValuationError::UnknownMortalityTable { .. })
        ));
    }

    #[test]
    fn test_horizon_extension_is_reported() {
        let engine = ValuationEngine::default();
        let mut state = bd_state();
        state.projection_years = 30;

        let result = engine.valuate(&state).unwrap();
        assert!(result.horizon_extended);
        assert_eq!(result.projection_months, (25 + 25) * 12);
        assert!(result.warnings.iter().any(|w| w.contains("horizon extended")));
    }

    #[test]
    fn test_add_ons_are_reported_separately() {
        let engine = ValuationEngine::default();
        let base = engine.valuate(&bd_state()).unwrap();

        let mut with_spouse = bd_state().with_dependent(Dependent {
            kind: DependentKind::Spouse,
            age: 38,
            gender: Gender::Female,
            reversion_pct: 60.0,
            until_age: None,
        });
        with_spouse.disability_benefit = Some(3_000.0);
        let result = engine.valuate(&with_spouse).unwrap();

        assert!(result.survivor_vpa_total.unwrap() > 0.0);
        assert!(result.disability_vpa.unwrap() > 0.0);
        assert_eq!(result.rmba, base.rmba);
    }

    #[test]
    fn test_sensitivity_directions() {
        let engine = ValuationEngine::new(EngineConfig::quick());
        let result = engine.valuate_with_sensitivity(&bd_state()).unwrap();

        let discount_up = result
            .sensitivity
            .iter()
            .find(|r| r.parameter == ShockParameter::DiscountRate && r.delta > 0.0)
            .unwrap();
        assert!(discount_up.reserve_change.unwrap() < 0.0);
        assert_eq!(result.sensitivity.len(), 10);
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = ValuationEngine::default();
        let mut bad = bd_state();
        bad.salary = -1.0;
        let states = vec![bd_state(), bad, bd_state().with_contribution_rate(5.0)];

        let results = engine.valuate_batch(&states);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].as_ref().unwrap().deficit_surplus < results[0].as_ref().unwrap().deficit_surplus);
    }
}
