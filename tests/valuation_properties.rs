//! End-to-end properties of the valuation pipeline

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use proptest::prelude::*;

use pension_valuation::assumptions::{MortalityCache, MortalityProvider};
use pension_valuation::multi_life::joint_survival;
use pension_valuation::participant::PaymentTiming;
use pension_valuation::present_value::{discount_factor, vpa_with_admin_fee_erosion, DISCOUNT_SENTINEL};
use pension_valuation::projection::{annual_to_monthly_rate, monthly_to_annual_rate};
use pension_valuation::scenario::{Shock, ShockParameter};
use pension_valuation::{
    BenefitTarget, CdConversionMode, EngineConfig, Gender, ParticipantState, SolveFor, TableRegistry,
    ValuationEngine,
};

fn active_bd() -> ParticipantState {
    ParticipantState::new_bd(45, Gender::Male, 10_000.0, 65, BenefitTarget::ReplacementRate(70.0), 0.05)
        .with_contribution_rate(8.0)
        .with_salary_growth(0.01)
        .with_payments_per_year(13, 13)
}

fn retired_bd() -> ParticipantState {
    ParticipantState::new_bd(70, Gender::Female, 0.0, 65, BenefitTarget::Value(4_000.0), 0.05)
        .with_initial_balance(400_000.0)
}

#[test]
fn test_retired_participant_has_no_rmba() {
    let engine = ValuationEngine::default();
    let result = engine.valuate(&retired_bd()).unwrap();

    assert!(result.is_already_retired);
    assert_eq!(result.rmba, Some(0.0));
    assert!(result.rmbc.unwrap() > 0.0);
    assert_eq!(result.normal_cost, Some(0.0));
}

#[test]
fn test_active_participant_has_no_rmbc() {
    let engine = ValuationEngine::default();
    let result = engine.valuate(&active_bd()).unwrap();

    assert!(!result.is_already_retired);
    assert_eq!(result.rmbc, Some(0.0));
    assert!(result.rmba.unwrap() > 0.0);
}

#[test]
fn test_reference_bd_scenario_is_finite() {
    let engine = ValuationEngine::default();
    let result = engine.valuate(&active_bd()).unwrap();

    for value in [
        result.rmba,
        result.rmbc,
        result.normal_cost,
        result.deficit_surplus,
        result.deficit_surplus_pct,
        result.required_contribution_rate,
        result.vpa_benefits,
        result.vpa_contributions,
        result.vpa_salaries,
        result.replacement_ratio,
    ] {
        assert!(value.is_some_and(f64::is_finite));
    }
    assert_relative_eq!(result.replacement_ratio.unwrap(), 70.0, epsilon = 1e-9);
}

#[test]
fn test_rmba_monotone_in_target_benefit() {
    let engine = ValuationEngine::default();
    let rmba = |amount: f64| {
        let state = active_bd().with_benefit_target(BenefitTarget::Value(amount));
        engine.valuate(&state).unwrap().rmba.unwrap()
    };

    let values: Vec<f64> = [2_000.0, 4_000.0, 6_000.0, 8_000.0].iter().map(|&b| rmba(b)).collect();
    assert!(values.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_deficit_monotone_in_contribution_rate() {
    let engine = ValuationEngine::default();
    let deficit = |rate: f64| {
        let state = active_bd().with_contribution_rate(rate);
        engine.valuate(&state).unwrap().deficit_surplus.unwrap()
    };

    let values: Vec<f64> = [0.0, 5.0, 10.0, 20.0].iter().map(|&r| deficit(r)).collect();
    assert!(values.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_solver_closes_contribution_gap() {
    let engine = ValuationEngine::default();
    let state = ParticipantState::new_bd(30, Gender::Male, 8_000.0, 65, BenefitTarget::ReplacementRate(70.0), 0.06)
        .with_contribution_rate(5.0);

    let report = engine.solve(&state, SolveFor::ContributionRate).unwrap();

    assert!(report.validated);
    assert!(report.residual.abs() < 50.0);
    assert!(report.value > 0.0 && report.value < 100.0);

    let check = engine
        .valuate(&SolveFor::ContributionRate.apply(&state, report.value))
        .unwrap();
    assert!(check.deficit_surplus.unwrap().abs() < 50.0);
}

#[test]
fn test_solver_finds_fundable_benefit() {
    let engine = ValuationEngine::default();
    let state = ParticipantState::new_bd(30, Gender::Male, 8_000.0, 65, BenefitTarget::Value(5_000.0), 0.06)
        .with_contribution_rate(10.0);

    let report = engine.solve(&state, SolveFor::Benefit).unwrap();

    assert!(report.validated);
    assert!(report.residual.abs() < 50.0);
    assert!(report.value > 0.0);

    let check = engine.valuate(&SolveFor::Benefit.apply(&state, report.value)).unwrap();
    assert!(check.deficit_surplus.unwrap().abs() < 50.0);
}

#[test]
fn test_reference_value_target_scenario() {
    let engine = ValuationEngine::default();
    let state = ParticipantState::new_bd(35, Gender::Male, 10_000.0, 65, BenefitTarget::Value(6_000.0), 0.06)
        .with_contribution_rate(10.0)
        .with_mortality("BR_EMS_2021", 0.0);

    let result = engine.valuate(&state).unwrap();

    assert!(!result.is_already_retired);
    assert_eq!(result.rmbc, Some(0.0));
    for value in [result.rmba, result.normal_cost, result.deficit_surplus, result.vpa_benefits, result.vpa_contributions] {
        assert!(value.is_some_and(f64::is_finite));
    }
    // Contributions more than fund the benefit, so the reserve is negative
    assert_relative_eq!(result.rmba.unwrap(), -47_695.09, max_relative = 1e-3);
    assert_relative_eq!(result.normal_cost.unwrap(), 3_942.45, max_relative = 1e-3);
    assert_relative_eq!(result.deficit_surplus.unwrap(), -result.rmba.unwrap(), max_relative = 1e-9);
}

#[test]
fn test_retirement_age_reached_moves_reserve_to_rmbc() {
    let engine = ValuationEngine::default();
    let state = ParticipantState::new_bd(65, Gender::Male, 10_000.0, 65, BenefitTarget::Value(6_000.0), 0.06)
        .with_contribution_rate(10.0);

    let result = engine.valuate(&state).unwrap();

    assert!(result.is_already_retired);
    assert_eq!(result.rmba, Some(0.0));
    assert!(result.rmbc.unwrap() > 0.0);
    assert_eq!(result.required_reserve(), result.rmbc);
}

#[test]
fn test_cd_certain_ten_years_lasts_ten_years() {
    let engine = ValuationEngine::default();
    let state =
        ParticipantState::new_cd(40, Gender::Female, 7_000.0, 65, 10.0, CdConversionMode::Certain { years: 10 }, 0.05);

    let result = engine.valuate(&state).unwrap();
    assert_eq!(result.expected_duration_years, Some(10.0));
    assert!(result.monthly_income.unwrap() > 0.0);
}

#[test]
fn test_valuation_is_deterministic() {
    let state = active_bd().with_benefit_target(BenefitTarget::Value(6_000.0));

    let first = ValuationEngine::new(EngineConfig::quick())
        .valuate_with_sensitivity(&state)
        .unwrap();
    let second = ValuationEngine::new(EngineConfig::quick())
        .valuate_with_sensitivity(&state)
        .unwrap();

    assert_eq!(serde_json::to_vec(&first).unwrap(), serde_json::to_vec(&second).unwrap());
}

#[test]
fn test_sensitivity_skips_invalid_shocks() {
    let engine = ValuationEngine::default();
    let shocks = [
        Shock { parameter: ShockParameter::DiscountRate, delta: 0.5 },
        Shock { parameter: ShockParameter::DiscountRate, delta: 0.01 },
    ];

    let rows = engine.sensitivity(&active_bd(), &shocks).unwrap();
    assert_eq!(rows.len(), 1);
    assert_relative_eq!(rows[0].delta, 0.01);
}

#[test]
fn test_degenerate_rate_returns_sentinel() {
    assert_eq!(discount_factor(-1.0, 12, PaymentTiming::Arrears), DISCOUNT_SENTINEL);
    assert_eq!(discount_factor(f64::NAN, 12, PaymentTiming::Arrears), DISCOUNT_SENTINEL);
}

#[test]
fn test_mortality_cache_is_shared() {
    let cache = Arc::new(MortalityCache::new(TableRegistry::bundled(), 2, Duration::from_secs(60)));
    let engine = ValuationEngine::with_provider(EngineConfig::default(), cache.clone());

    engine.valuate(&active_bd()).unwrap();
    engine.valuate(&active_bd()).unwrap();

    let (hits, misses, _) = cache.stats();
    assert_eq!(misses, 1);
    assert!(hits >= 1);
    assert!(cache.get_table("BR_EMS_2021", Gender::Male, 0.0).is_ok());
}

#[test]
fn test_csv_table_is_usable_by_engine() {
    let path = std::env::temp_dir().join(format!("flat_table_{}.csv", std::process::id()));
    let mut contents = String::from("age,female,male\n");
    for age in 0..=110 {
        let q = (0.0005 * 1.09_f64.powi(age)).min(1.0);
        contents.push_str(&format!("{},{},{}\n", age, q * 0.8, q));
    }
    std::fs::write(&path, contents).unwrap();

    let mut registry = TableRegistry::bundled();
    registry.register_csv("FLAT_TEST", &path).unwrap();
    std::fs::remove_file(&path).ok();

    let engine = ValuationEngine::with_provider(EngineConfig::default(), Arc::new(registry));
    let result = engine
        .valuate(&active_bd().with_mortality("FLAT_TEST", 0.0))
        .unwrap();
    assert!(result.rmba.unwrap() > 0.0);
}

proptest! {
    #[test]
    fn prop_rate_round_trip(annual in -0.05f64..0.30) {
        let back = monthly_to_annual_rate(annual_to_monthly_rate(annual));
        prop_assert!((back - annual).abs() < 1e-10);
    }

    #[test]
    fn prop_survival_monotone_and_bounded(
        age in 16u32..100,
        aggravation in -50.0f64..50.0,
        months in 1usize..720,
        female in any::<bool>(),
    ) {
        let gender = if female { Gender::Female } else { Gender::Male };
        let table = TableRegistry::bundled().build("BR_EMS_2021", gender, aggravation).unwrap();
        let survival = table.survival_curve(age, months, 110);

        prop_assert_eq!(survival.len(), months);
        prop_assert!(survival.iter().all(|&p| (0.0..=1.0).contains(&p)));
        prop_assert!(survival.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn prop_joint_survival_below_single(
        x in 20u32..90,
        y in 20u32..90,
        months in 1usize..480,
    ) {
        let registry = TableRegistry::bundled();
        let px = registry.build("AT_2000", Gender::Male, 0.0).unwrap().survival_curve(x, months, 110);
        let py = registry.build("AT_2000", Gender::Female, 0.0).unwrap().survival_curve(y, months, 110);
        let pxy = joint_survival(&px, &py);

        for t in 0..months {
            prop_assert!(pxy[t] <= px[t] + 1e-15);
            prop_assert!(pxy[t] <= py[t] + 1e-15);
        }
    }

    #[test]
    fn prop_admin_fee_never_increases_contribution_vpa(fee in 0.0f64..0.05, mtr in 12usize..360) {
        let contributions = vec![1_000.0; mtr + 120];
        let survival = vec![1.0; mtr + 120];
        let rate = annual_to_monthly_rate(0.05);
        let fee_m = 1.0 - (1.0 - fee).powf(1.0 / 12.0);

        let gross = vpa_with_admin_fee_erosion(&contributions, &survival, rate, 0.0, PaymentTiming::Arrears, mtr);
        let net = vpa_with_admin_fee_erosion(&contributions, &survival, rate, fee_m, PaymentTiming::Arrears, mtr);
        prop_assert!(net <= gross + 1e-9);
    }
}
