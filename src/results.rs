//! Valuation output record
//!
//! `ValuationResult` is the flat record handed to report generators and API
//! responders. Every floating field passes through [`sanitize`], so a
//! serialised result never carries NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::income::CdFigures;
use crate::multi_life::{MultiLifeFigures, SurvivorValue};
use crate::participant::{CalculationMethod, CdConversionMode, ParticipantState, PlanType};
use crate::projection::{ActuarialContext, ProjectionSeries, YearlyRow};
use crate::reserves::{BdFigures, ReserveState};
use crate::scenario::{SensitivityMetrics, SensitivityRow};
use crate::validation::sanitize;

/// Plan-specific figures of one valuation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanFigures {
    Bd(BdFigures),
    Cd(CdFigures),
}

impl PlanFigures {
    pub fn deficit_surplus(&self) -> f64 {
        match self {
            PlanFigures::Bd(bd) => bd.sufficiency.deficit_surplus,
            PlanFigures::Cd(cd) => cd.deficit_surplus,
        }
    }

    /// Figures tracked by the sensitivity sweep
    pub fn metrics(&self) -> SensitivityMetrics {
        match self {
            PlanFigures::Bd(bd) => SensitivityMetrics {
                reserve: bd.required_reserve(),
                deficit_surplus: bd.sufficiency.deficit_surplus,
                cost: bd.normal_cost,
            },
            PlanFigures::Cd(cd) => SensitivityMetrics {
                reserve: cd.balance_at_retirement,
                deficit_surplus: cd.deficit_surplus,
                cost: cd.monthly_income,
            },
        }
    }
}

/// Yearly roll-up row as reported; non-finite amounts become `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyFigures {
    pub year: u32,
    pub age: u32,
    pub salary: Option<f64>,
    pub contribution: Option<f64>,
    pub benefit: Option<f64>,
    pub survival: Option<f64>,
    pub reserve: Option<f64>,
}

impl From<&YearlyRow> for YearlyFigures {
    fn from(row: &YearlyRow) -> Self {
        Self {
            year: row.year,
            age: row.age,
            salary: sanitize(row.salary),
            contribution: sanitize(row.contribution),
            benefit: sanitize(row.benefit),
            survival: sanitize(row.survival),
            reserve: sanitize(row.reserve),
        }
    }
}

/// Complete output of one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub plan_type: PlanType,
    pub calculation_method: CalculationMethod,

    /// BD phase at the valuation date; absent for CD plans
    pub reserve_state: Option<ReserveState>,
    pub is_already_retired: bool,
    pub horizon_extended: bool,
    pub projection_months: usize,
    pub months_to_retirement: usize,

    // BD reserves
    pub rmba: Option<f64>,
    pub rmbc: Option<f64>,
    pub normal_cost: Option<f64>,
    pub required_contribution_rate: Option<f64>,

    // Funding position
    pub deficit_surplus: Option<f64>,
    pub deficit_surplus_pct: Option<f64>,

    // VPA decomposition
    pub vpa_benefits: Option<f64>,
    pub vpa_contributions: Option<f64>,
    pub vpa_salaries: Option<f64>,

    pub final_salary: Option<f64>,
    pub initial_benefit: Option<f64>,
    pub replacement_ratio: Option<f64>,

    // CD income
    pub conversion_mode: Option<CdConversionMode>,
    pub balance_at_retirement: Option<f64>,
    pub monthly_income: Option<f64>,
    pub conversion_factor: Option<f64>,
    pub expected_duration_years: Option<f64>,
    pub target_income: Option<f64>,

    // Add-ons, reported outside the reserves
    pub survivor_benefits: Vec<SurvivorValue>,
    pub survivor_vpa_total: Option<f64>,
    pub disability_vpa: Option<f64>,

    pub yearly: Vec<YearlyFigures>,
    pub sensitivity: Vec<SensitivityRow>,
    pub warnings: Vec<String>,
}

impl ValuationResult {
    /// Assemble the record from the pieces of a finished valuation
    pub fn new(
        state: &ParticipantState,
        ctx: &ActuarialContext,
        series: &ProjectionSeries,
        figures: &PlanFigures,
        multi_life: &MultiLifeFigures,
    ) -> Self {
        let mut result = Self {
            plan_type: state.plan_type,
            calculation_method: state.calculation_method,
            reserve_state: None,
            is_already_retired: ctx.is_already_retired,
            horizon_extended: ctx.horizon_extended,
            projection_months: ctx.total_months,
            months_to_retirement: ctx.months_to_retirement,
            rmba: None,
            rmbc: None,
            normal_cost: None,
            required_contribution_rate: None,
            deficit_surplus: sanitize(figures.deficit_surplus()),
            deficit_surplus_pct: None,
            vpa_benefits: None,
            vpa_contributions: None,
            vpa_salaries: None,
            final_salary: sanitize(series.final_salary),
            initial_benefit: sanitize(series.initial_benefit),
            replacement_ratio: None,
            conversion_mode: None,
            balance_at_retirement: None,
            monthly_income: None,
            conversion_factor: None,
            expected_duration_years: None,
            target_income: None,
            survivor_benefits: multi_life
                .survivors
                .iter()
                .filter(|s| s.vpa.is_finite())
                .cloned()
                .collect(),
            survivor_vpa_total: if multi_life.survivors.is_empty() {
                None
            } else {
                sanitize(multi_life.survivor_total())
            },
            disability_vpa: multi_life.disability_vpa.and_then(sanitize),
            yearly: series.yearly_rollup().iter().map(YearlyFigures::from).collect(),
            sensitivity: Vec::new(),
            warnings: Vec::new(),
        };

        match figures {
            PlanFigures::Bd(bd) => {
                result.reserve_state = Some(bd.state);
                result.rmba = sanitize(bd.rmba);
                result.rmbc = sanitize(bd.rmbc);
                result.normal_cost = sanitize(bd.normal_cost);
                result.required_contribution_rate = sanitize(bd.sufficiency.required_contribution_rate);
                result.deficit_surplus_pct = bd.sufficiency.deficit_surplus_pct.and_then(sanitize);
                result.vpa_benefits = sanitize(bd.present_values.benefits);
                result.vpa_contributions = sanitize(bd.present_values.contributions);
                result.vpa_salaries = sanitize(bd.present_values.salaries);
                result.replacement_ratio = if series.final_salary > 0.0 {
                    sanitize(series.initial_benefit / series.final_salary * 100.0)
                } else {
                    None
                };
            }
            PlanFigures::Cd(cd) => {
                result.vpa_benefits = sanitize(cd.vpa_benefits);
                result.vpa_contributions = sanitize(cd.vpa_contributions);
                result.replacement_ratio = cd.replacement_ratio.and_then(sanitize);
                result.conversion_mode = Some(cd.conversion_mode);
                result.balance_at_retirement = sanitize(cd.balance_at_retirement);
                result.monthly_income = sanitize(cd.monthly_income);
                result.conversion_factor = sanitize(cd.conversion_factor);
                result.expected_duration_years = sanitize(cd.expected_duration_years);
                result.target_income = sanitize(cd.target_income);
            }
        }

        result
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_sensitivity(mut self, rows: Vec<SensitivityRow>) -> Self {
        self.sensitivity = rows;
        self
    }

    /// Reserve that applies to the participant (RMBA or RMBC), BD only
    pub fn required_reserve(&self) -> Option<f64> {
        match self.reserve_state? {
            ReserveState::Active => self.rmba,
            ReserveState::Retired => self.rmbc,
        }
    }

    /// Print summary to stdout
    pub fn print_summary(&self) {
        println!("\n=== Valuation Summary ===");
        println!("Plan:                  {:?} ({:?})", self.plan_type, self.calculation_method);
        if let Some(state) = self.reserve_state {
            println!("State:                 {:?}", state);
        }
        print_row("RMBA", self.rmba);
        print_row("RMBC", self.rmbc);
        print_row("Normal cost", self.normal_cost);
        print_row("Balance at retirement", self.balance_at_retirement);
        print_row("Monthly income", self.monthly_income);
        print_row("Conversion factor", self.conversion_factor);
        print_row("Expected duration (y)", self.expected_duration_years);
        print_row("VPA benefits", self.vpa_benefits);
        print_row("VPA contributions", self.vpa_contributions);
        print_row("Deficit/surplus", self.deficit_surplus);
        print_row("Deficit/surplus %", self.deficit_surplus_pct);
        print_row("Required contrib. %", self.required_contribution_rate);
        print_row("Replacement ratio %", self.replacement_ratio);
        print_row("Survivor VPA", self.survivor_vpa_total);
        print_row("Disability VPA", self.disability_vpa);
        for warning in &self.warnings {
            println!("WARNING: {}", warning);
        }
    }
}

fn print_row(label: &str, value: Option<f64>) {
    if let Some(value) = value {
        println!("{:<22} {:>16.2}", format!("{}:", label), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserves::{PresentValues, Sufficiency};

    fn bd_figures(rmba: f64) -> BdFigures {
        BdFigures {
            state: ReserveState::Active,
            rmba,
            rmbc: 0.0,
            normal_cost: 1_200.0,
            present_values: PresentValues {
                benefits: 500_000.0,
                contributions: 100_000.0,
                salaries: 1_000_000.0,
            },
            sufficiency: Sufficiency {
                deficit_surplus: -rmba,
                deficit_surplus_pct: Some(-rmba / 5_000.0),
                required_contribution_rate: 40.0,
            },
        }
    }

    #[test]
    fn test_non_finite_figures_become_absent() {
        let state = crate::participant::ParticipantState::new_bd(
            40,
            crate::participant::Gender::Male,
            5_000.0,
            65,
            crate::participant::BenefitTarget::Value(3_000.0),
            0.05,
        );
        let ctx = ActuarialContext::build(&state, &crate::config::EngineConfig::default()).unwrap();
        let series = ProjectionSeries::default();

        let result = ValuationResult::new(
            &state,
            &ctx,
            &series,
            &PlanFigures::Bd(bd_figures(f64::INFINITY)),
            &MultiLifeFigures::default(),
        );

        assert_eq!(result.rmba, None);
        assert_eq!(result.deficit_surplus, None);
        assert_eq!(result.rmbc, Some(0.0));
        assert_eq!(result.required_reserve(), None);
        assert!(result.survivor_vpa_total.is_none());

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"rmba\":null"));
    }

    #[test]
    fn test_yearly_rows_are_sanitized() {
        let state = crate::participant::ParticipantState::new_bd(
            64,
            crate::participant::Gender::Female,
            5_000.0,
            65,
            crate::participant::BenefitTarget::Value(3_000.0),
            0.05,
        );
        let ctx = ActuarialContext::build(&state, &crate::config::EngineConfig::default()).unwrap();
        let mut series = ProjectionSeries::with_capacity(12);
        for t in 0..12 {
            let reserve = if t == 11 { f64::NAN } else { 1_000.0 };
            series.push_month(64, 5_000.0, 500.0, 0.0, 1.0, reserve);
        }

        let result = ValuationResult::new(
            &state,
            &ctx,
            &series,
            &PlanFigures::Bd(bd_figures(10_000.0)),
            &MultiLifeFigures::default(),
        );

        assert_eq!(result.yearly.len(), 1);
        assert_eq!(result.yearly[0].reserve, None);
        assert_eq!(result.yearly[0].contribution, Some(6_000.0));

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"reserve\":null"));
        assert!(!json.contains("NaN"));

        let mut buffer = Vec::new();
        crate::projection::write_yearly_csv(&result.yearly, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(','));
    }

    #[test]
    fn test_metrics_follow_plan_type() {
        let metrics = PlanFigures::Bd(bd_figures(250_000.0)).metrics();
        assert_eq!(metrics.reserve, 250_000.0);
        assert_eq!(metrics.deficit_surplus, -250_000.0);
        assert_eq!(metrics.cost, 1_200.0);
    }
}
