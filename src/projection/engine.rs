//! Monthly cash-flow projector for BD and CD participants

use crate::assumptions::MortalityVector;
use crate::config::{CdSettings, EngineConfig};
use crate::income::conversion::{conversion_factor, income_expired, income_from_balance, ConversionBasis};
use crate::participant::{ParticipantState, PlanType};

use super::calendar::{payments_in_month, MonthPosition};
use super::cashflows::ProjectionSeries;
use super::context::ActuarialContext;

/// Builds the monthly salary, contribution, benefit, survival and reserve vectors
#[derive(Debug, Clone)]
pub struct CashFlowProjector {
    max_age: u32,
    cd: CdSettings,
}

impl CashFlowProjector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_age: config.max_age,
            cd: config.cd.clone(),
        }
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn cd_settings(&self) -> &CdSettings {
        &self.cd
    }

    /// Project a participant according to its plan type
    pub fn project(&self, state: &ParticipantState, ctx: &ActuarialContext, mortality: &MortalityVector) -> ProjectionSeries {
        match state.plan_type {
            PlanType::Bd => self.project_bd(state, ctx, mortality),
            PlanType::Cd => self.project_cd(state, ctx, mortality),
        }
    }

    /// Salary growth factor applicable in projection year `year`
    fn growth_factor(ctx: &ActuarialContext, year: usize) -> f64 {
        (1.0 + ctx.salary_growth_monthly).powi((year * 12) as i32)
    }

    /// Monthly salary in the last active month, or the current salary once retired
    pub fn final_salary(state: &ParticipantState, ctx: &ActuarialContext) -> f64 {
        if ctx.is_already_retired || ctx.months_to_retirement == 0 {
            return state.salary;
        }
        let last_active = MonthPosition::of(ctx.months_to_retirement - 1);
        state.salary * Self::growth_factor(ctx, last_active.year)
    }

    /// Salary and net contribution paid in month `t` (zero once retired)
    fn active_flows(state: &ParticipantState, ctx: &ActuarialContext, t: usize) -> (f64, f64) {
        if ctx.is_already_retired || t >= ctx.months_to_retirement {
            return (0.0, 0.0);
        }
        let position = MonthPosition::of(t);
        let salary = state.salary
            * Self::growth_factor(ctx, position.year)
            * payments_in_month(t, ctx.salary_payments_per_year);
        let contribution = salary * state.contribution_rate / 100.0 * (1.0 - ctx.loading_fee);
        (salary, contribution)
    }

    /// Defined benefit projection with reserve roll-forward
    pub fn project_bd(&self, state: &ParticipantState, ctx: &ActuarialContext, mortality: &MortalityVector) -> ProjectionSeries {
        let n = ctx.total_months;
        let mtr = ctx.months_to_retirement;
        let survival = mortality.survival_curve(state.age, n, self.max_age);

        let final_salary = Self::final_salary(state, ctx);
        let base_benefit = state.benefit_target.monthly_amount(final_salary);
        let inflation_annual = (1.0 + ctx.inflation_monthly).powi(12);

        let mut series = ProjectionSeries::with_capacity(n);
        series.final_salary = final_salary;
        series.initial_benefit = base_benefit;
        series.balance_at_retirement = state.initial_balance;

        let growth = (1.0 + ctx.discount_rate_monthly) * (1.0 - ctx.admin_fee_monthly);
        let mut reserve = state.initial_balance;

        for t in 0..n {
            let (salary, contribution) = Self::active_flows(state, ctx, t);
            let benefit = if t >= mtr {
                let years_retired = ((t - mtr) / 12) as i32;
                base_benefit * payments_in_month(t, ctx.benefit_payments_per_year) * inflation_annual.powi(years_retired)
            } else {
                0.0
            };

            reserve = reserve * growth + contribution - benefit;
            series.push_month(state.attained_age(t), salary, contribution, benefit, survival[t], reserve);
        }

        series
    }

    /// Defined contribution projection: accumulation then drawdown
    pub fn project_cd(&self, state: &ParticipantState, ctx: &ActuarialContext, mortality: &MortalityVector) -> ProjectionSeries {
        let n = ctx.total_months;
        let mtr = ctx.months_to_retirement;
        let survival = mortality.survival_curve(state.age, n, self.max_age);
        let mode = state.cd_conversion_mode;
        let basis = ConversionBasis::new(
            ctx.conversion_monthly(),
            ctx.admin_fee_monthly,
            ctx.payment_timing,
            ctx.benefit_payments_per_year,
            self.max_age,
        );

        let mut series = ProjectionSeries::with_capacity(n);
        series.final_salary = Self::final_salary(state, ctx);

        let accumulation_growth = (1.0 + ctx.accumulation_monthly()) * (1.0 - ctx.admin_fee_monthly);
        let distribution_growth = (1.0 + ctx.conversion_monthly()) * (1.0 - ctx.admin_fee_monthly);

        let mut balance = state.initial_balance;
        let mut income = 0.0;

        for t in 0..n {
            let (salary, contribution) = Self::active_flows(state, ctx, t);
            let age = state.attained_age(t);

            let benefit = if t < mtr {
                balance = balance * accumulation_growth + contribution;
                0.0
            } else {
                let since_retirement = t - mtr;
                let years_elapsed = (since_retirement / 12) as u32;

                if since_retirement == 0 {
                    series.balance_at_retirement = balance;
                    income = income_from_balance(balance, conversion_factor(&mode, mortality, age, 0, &basis));
                    series.initial_benefit = income;
                } else if since_retirement % 12 == 0 && mode.recomputes_annually() {
                    income = income_from_balance(balance, conversion_factor(&mode, mortality, age, years_elapsed, &basis));
                }

                let due = if income_expired(&mode, since_retirement) {
                    0.0
                } else {
                    income * payments_in_month(t, ctx.benefit_payments_per_year)
                };

                let available = balance * distribution_growth;
                let paid = due.min(available.max(0.0));
                balance = (available - paid).max(0.0);
                paid
            };

            series.push_month(age, salary, contribution, benefit, survival[t], balance);
        }

        if mtr >= n {
            series.balance_at_retirement = balance;
        }

        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::TableRegistry;
    use crate::participant::{BenefitTarget, CdConversionMode, Gender};
    use approx::assert_relative_eq;

    fn table(gender: Gender) -> MortalityVector {
        TableRegistry::bundled().build("BR_EMS_2021", gender, 0.0).unwrap()
    }

    fn run(state: &ParticipantState) -> (ActuarialContext, ProjectionSeries) {
        let config = EngineConfig::default();
        let ctx = ActuarialContext::build(state, &config)
            .unwrap()
            .with_conversion_rates(state.effective_accumulation_rate(), state.effective_conversion_rate());
        let series = CashFlowProjector::new(&config).project(state, &ctx, &table(state.gender));
        (ctx, series)
    }

    fn bd_active() -> ParticipantState {
        ParticipantState::new_bd(30, Gender::Male, 8_000.0, 65, BenefitTarget::Value(5_000.0), 0.06)
            .with_contribution_rate(10.0)
    }

    #[test]
    fn test_bd_phases() {
        let (ctx, series) = run(&bd_active());

        assert_eq!(series.len(), ctx.total_months);
        assert!(series.is_consistent());
        assert_eq!(series.salaries[0], 8_000.0);
        assert_relative_eq!(series.contributions[0], 800.0);
        assert_eq!(series.benefits[ctx.months_to_retirement - 1], 0.0);
        assert_eq!(series.salaries[ctx.months_to_retirement], 0.0);
        assert_eq!(series.benefits[ctx.months_to_retirement], 5_000.0);
        assert_eq!(series.ages[ctx.months_to_retirement], 65);
    }

    #[test]
    fn test_survival_monotone_and_bounded() {
        let (_, series) = run(&bd_active());
        assert_eq!(series.survival[0], 1.0);
        assert!(series.survival.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(series.survival.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_salary_growth_and_extra_payments() {
        let state = bd_active()
            .with_salary_growth(0.03)
            .with_payments_per_year(13, 13)
            .with_benefit_target(BenefitTarget::ReplacementRate(70.0));
        let (ctx, series) = run(&state);

        assert_relative_eq!(series.salaries[11], 16_000.0, epsilon = 1e-6);
        assert_relative_eq!(series.salaries[12], 8_000.0 * 1.03, epsilon = 1e-6);
        // Final salary uses the growth of the last active year (age 64, year 34)
        assert_relative_eq!(series.final_salary, 8_000.0 * 1.03_f64.powi(34), epsilon = 1e-6);
        assert_relative_eq!(series.initial_benefit, series.final_salary * 0.7, epsilon = 1e-6);
        let december = ctx.months_to_retirement + 11;
        assert_relative_eq!(series.benefits[december], 2.0 * series.initial_benefit, epsilon = 1e-6);
    }

    #[test]
    fn test_benefit_indexed_by_inflation() {
        let mut state = bd_active();
        state.inflation_rate = 0.04;
        let (ctx, series) = run(&state);
        let mtr = ctx.months_to_retirement;

        assert_relative_eq!(series.benefits[mtr + 11], 5_000.0);
        assert_relative_eq!(series.benefits[mtr + 12], 5_200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bd_reserve_roll_forward() {
        let state = bd_active().with_initial_balance(100_000.0);
        let (ctx, series) = run(&state);

        let growth = 1.0 + ctx.discount_rate_monthly;
        assert_relative_eq!(series.reserves[0], 100_000.0 * growth + 800.0, epsilon = 1e-9);
        let mtr = ctx.months_to_retirement;
        assert_relative_eq!(series.reserves[mtr], series.reserves[mtr - 1] * growth - 5_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bd_reserve_may_go_negative() {
        let mut state = bd_active().with_benefit_target(BenefitTarget::Value(50_000.0));
        state.contribution_rate = 0.0;
        let (_, series) = run(&state);
        assert!(series.final_reserve() < 0.0);
    }

    #[test]
    fn test_retired_bd_pays_from_month_zero() {
        let mut state = bd_active();
        state.age = 66;
        let (ctx, series) = run(&state);

        assert!(ctx.is_already_retired);
        assert_eq!(series.benefits[0], 5_000.0);
        assert_eq!(series.contributions.iter().sum::<f64>(), 0.0);
        assert_eq!(series.final_salary, 8_000.0);
    }

    #[test]
    fn test_cd_accumulation_and_certain_drawdown() {
        let state = ParticipantState::new_cd(30, Gender::Female, 8_000.0, 65, 10.0, CdConversionMode::Certain { years: 10 }, 0.05);
        let (ctx, series) = run(&state);
        let mtr = ctx.months_to_retirement;

        assert!(series.balance_at_retirement > 800.0 * mtr as f64);
        assert!(series.initial_benefit > 0.0);
        assert!(series.benefits[mtr + 119] > 0.0);
        assert_eq!(series.benefits[mtr + 120], 0.0);
        // The certain annuity exhausts the balance at the end of the term
        assert!(series.reserves[mtr + 119].abs() < 1.0, "left {}", series.reserves[mtr + 119]);
    }

    #[test]
    fn test_cd_balance_never_negative() {
        let state = ParticipantState::new_cd(60, Gender::Male, 5_000.0, 65, 8.0, CdConversionMode::Programmed { years: 20 }, 0.04)
            .with_fees(0.01, 2.0);
        let (_, series) = run(&state);
        assert!(series.reserves.iter().all(|b| *b >= 0.0));
    }

    #[test]
    fn test_cd_percentage_recomputes_annually() {
        let state = ParticipantState::new_cd(64, Gender::Male, 5_000.0, 65, 8.0, CdConversionMode::Percentage { annual_pct: 6.0 }, 0.03)
            .with_initial_balance(500_000.0);
        let (ctx, series) = run(&state);
        let mtr = ctx.months_to_retirement;

        assert_relative_eq!(series.initial_benefit, series.balance_at_retirement * 0.06 / 12.0, epsilon = 1e-9);
        // Returns of 3% with 6% drawn: income falls at the first recomputation
        assert!(series.benefits[mtr + 12] < series.benefits[mtr + 11]);
    }
}
