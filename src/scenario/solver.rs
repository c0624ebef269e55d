//! Inverse valuation: find the parameter value that zeroes the deficit
//!
//! The objective is `f(x) = deficit_surplus(valuation with parameter = x)`.
//! Continuous parameters go through the ordered strategy list of
//! [`super::root_finding`]; retirement age is an integer and is found by scan.
//! Every candidate is validated by re-running the valuation. A candidate that
//! misses the tolerance gets one finite-difference Newton correction, and
//! failing that the best bounded guess is returned with `validated = false`.

use serde::{Deserialize, Serialize};

use crate::config::SolverSettings;
use crate::error::{EngineResult, ValuationError};
use crate::participant::{BenefitTarget, ParticipantState};
use crate::validation::{MAX_RETIREMENT_AGE, MIN_RETIREMENT_AGE};

use super::root_finding::{best_guess, bisection, brent, secant, Bounds, Objective, SolverOutcome, Strategy};

/// Parameter the solver varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveFor {
    /// Target benefit magnitude (amount or replacement percent)
    Benefit,
    /// Contribution rate, percent of salary
    ContributionRate,
    /// Retirement age in whole years
    RetirementAge,
    /// Current monthly salary
    Salary,
}

impl SolveFor {
    /// Current value of the parameter
    pub fn current(&self, state: &ParticipantState) -> f64 {
        match self {
            SolveFor::Benefit => state.benefit_target.magnitude(),
            SolveFor::ContributionRate => state.contribution_rate,
            SolveFor::RetirementAge => state.retirement_age as f64,
            SolveFor::Salary => state.salary,
        }
    }

    /// Search interval respecting validation bounds
    pub fn bounds(&self, state: &ParticipantState) -> Bounds {
        match self {
            SolveFor::Benefit => match state.benefit_target {
                BenefitTarget::ReplacementRate(_) => Bounds::new(0.0, 200.0),
                BenefitTarget::Value(amount) => {
                    Bounds::new(0.0, (state.salary * 20.0).max(amount * 4.0).max(10_000.0))
                }
            },
            SolveFor::ContributionRate => Bounds::new(0.0, 100.0),
            SolveFor::RetirementAge => Bounds::new(
                (state.age + 1).max(MIN_RETIREMENT_AGE) as f64,
                MAX_RETIREMENT_AGE as f64,
            ),
            SolveFor::Salary => Bounds::new(0.0, (state.salary * 20.0).max(100_000.0)),
        }
    }

    /// Participant with the parameter set to `value`
    pub fn apply(&self, state: &ParticipantState, value: f64) -> ParticipantState {
        let mut trial = state.clone();
        match self {
            SolveFor::Benefit => trial.benefit_target = state.benefit_target.with_magnitude(value),
            SolveFor::ContributionRate => trial.contribution_rate = value,
            SolveFor::RetirementAge => trial.retirement_age = value.round().max(0.0) as u32,
            SolveFor::Salary => trial.salary = value,
        }
        trial
    }

    /// Starting bracket around the current value
    fn initial_bracket(&self, state: &ParticipantState, bounds: &Bounds) -> (f64, f64) {
        let current = bounds.clamp(self.current(state));
        let spread = match self {
            SolveFor::ContributionRate => 5.0,
            _ => (current * 0.5).max(bounds.upper * 0.01),
        };
        (bounds.clamp(current - spread), bounds.clamp(current + spread))
    }
}

/// Outcome of a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverReport {
    pub parameter: SolveFor,
    pub value: f64,

    /// Deficit/surplus at `value` from a fresh valuation
    pub residual: f64,

    /// Whether the residual is within tolerance
    ///
    /// Retirement age is integer-valued and rarely lands within tolerance, so
    /// for it this means the reported age yields a non-negative deficit/surplus.
    pub validated: bool,

    pub strategy: Strategy,
    pub iterations: u32,

    /// Whether the Newton correction produced the accepted value
    pub corrected: bool,

    /// Full valuations performed
    pub evaluations: u32,

    pub memo_hits: u64,
    pub memo_misses: u64,
}

/// Solve for `parameter` so that the deficit/surplus is zero
///
/// `deficit` runs a full valuation and returns its deficit/surplus. Errors on
/// the unmodified state are returned; trial states that fail validation are
/// treated as infeasible points.
pub fn solve<F>(
    state: &ParticipantState,
    parameter: SolveFor,
    settings: &SolverSettings,
    mut deficit: F,
) -> EngineResult<SolverReport>
where
    F: FnMut(&ParticipantState) -> EngineResult<f64>,
{
    // Input errors surface before any search
    let base = deficit(state)?;

    if parameter == SolveFor::RetirementAge {
        return scan_retirement_age(state, base, settings, deficit);
    }

    let bounds = parameter.bounds(state);
    let mut function = |x: f64| match deficit(&parameter.apply(state, x)) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("Trial {:?} = {} rejected: {}", parameter, x, err);
            None
        }
    };
    let mut objective = Objective::new(&mut function, parameter, settings.max_evaluations);

    let (low, high) = parameter.initial_bracket(state, &bounds);
    let mut candidate: Option<SolverOutcome> = None;

    let strategies: [Strategy; 4] = [Strategy::Brent, Strategy::Secant, Strategy::Bisection, Strategy::BestGuess];
    for strategy in strategies {
        if objective.exhausted() {
            log::warn!("Solver budget exhausted before {:?}", strategy);
            break;
        }
        let outcome = match strategy {
            Strategy::Brent => brent(&mut objective, low, high, &bounds, settings),
            Strategy::Secant => secant(&mut objective, low, high, &bounds, settings),
            Strategy::Bisection => bisection(&mut objective, &bounds, settings),
            _ => best_guess(&mut objective, &bounds, settings),
        };
        log::debug!("{:?} outcome: {:?}", strategy, outcome);

        if let Some(outcome) = outcome {
            let improves = candidate.map_or(true, |c| outcome.residual.abs() < c.residual.abs());
            if improves {
                candidate = Some(outcome);
            }
            if outcome.converged {
                break;
            }
        }
    }

    let candidate = candidate.ok_or_else(|| {
        ValuationError::invalid(
            format!("{:?}", parameter),
            "no feasible point inside the search bounds",
        )
    })?;

    accept(&mut objective, parameter, candidate, &bounds, settings)
}

/// Validate a candidate, apply one Newton correction if needed, else fall back
fn accept(
    objective: &mut Objective<'_>,
    parameter: SolveFor,
    candidate: SolverOutcome,
    bounds: &Bounds,
    settings: &SolverSettings,
) -> EngineResult<SolverReport> {
    let tolerance = settings.residual_tolerance;
    let report = |objective: &Objective<'_>, value: f64, residual: f64, validated: bool, corrected: bool| {
        let (memo_hits, memo_misses) = objective.memo_stats();
        SolverReport {
            parameter,
            value,
            residual,
            validated,
            strategy: candidate.strategy,
            iterations: candidate.iterations,
            corrected,
            evaluations: objective.evaluations(),
            memo_hits,
            memo_misses,
        }
    };

    let x = candidate.value;
    if let Some(residual) = objective.eval(x) {
        if residual.abs() < tolerance {
            return Ok(report(objective, x, residual, true, false));
        }

        let h = (x.abs() * 1e-4).max(1e-4);
        let stepped = bounds.clamp(x + h);
        let stepped = if stepped == x { bounds.clamp(x - h) } else { stepped };
        if let Some(f_step) = objective.eval(stepped) {
            let slope = (f_step - residual) / (stepped - x);
            if slope.is_finite() && slope.abs() > 1e-12 {
                let corrected = bounds.clamp(x - residual / slope);
                if let Some(r) = objective.eval(corrected) {
                    if r.abs() < tolerance {
                        log::info!("Newton correction accepted {:?} = {}", parameter, corrected);
                        return Ok(report(objective, corrected, r, true, true));
                    }
                }
            }
        }
    }

    let (value, residual) = objective.best().unwrap_or((candidate.value, candidate.residual));
    log::warn!(
        "Solver for {:?} did not validate; best guess {} leaves residual {:.2}",
        parameter,
        value,
        residual
    );
    Ok(report(objective, value, residual, residual.abs() < tolerance, false))
}

/// Earliest retirement age with a non-negative deficit/surplus
///
/// When no age can be searched (the participant is at or past the oldest
/// allowed retirement age) or every trial is rejected, the current retirement
/// age is reported unvalidated with the base deficit/surplus.
fn scan_retirement_age<F>(
    state: &ParticipantState,
    base: f64,
    settings: &SolverSettings,
    mut deficit: F,
) -> EngineResult<SolverReport>
where
    F: FnMut(&ParticipantState) -> EngineResult<f64>,
{
    let bounds = SolveFor::RetirementAge.bounds(state);
    let first = bounds.lower as u32;
    let last = bounds.upper as u32;

    let mut evaluations = 0;
    let mut best: Option<(u32, f64)> = None;

    for age in first..=last {
        if evaluations >= settings.max_evaluations {
            log::warn!("Retirement age scan stopped at {} by the evaluation budget", age);
            break;
        }
        evaluations += 1;

        let value = match deficit(&SolveFor::RetirementAge.apply(state, age as f64)) {
            Ok(value) if value.is_finite() => value,
            Ok(_) => continue,
            Err(err) => {
                log::debug!("Retirement age {} rejected: {}", age, err);
                continue;
            }
        };

        if value >= 0.0 {
            return Ok(SolverReport {
                parameter: SolveFor::RetirementAge,
                value: age as f64,
                residual: value,
                validated: true,
                strategy: Strategy::IntegerScan,
                iterations: age - first + 1,
                corrected: false,
                evaluations,
                memo_hits: 0,
                memo_misses: evaluations as u64,
            });
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((age, value));
        }
    }

    let (age, residual) = match best {
        Some(best) => {
            log::warn!("No retirement age up to {} closes the deficit; best is {}", last, best.0);
            best
        }
        None => {
            log::warn!(
                "No retirement age in {}..={} could be valued; keeping {}",
                first,
                last,
                state.retirement_age
            );
            (state.retirement_age, base)
        }
    };
    Ok(SolverReport {
        parameter: SolveFor::RetirementAge,
        value: age as f64,
        residual,
        validated: false,
        strategy: Strategy::IntegerScan,
        iterations: evaluations,
        corrected: false,
        evaluations,
        memo_hits: 0,
        memo_misses: evaluations as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Gender;

    fn state() -> ParticipantState {
        ParticipantState::new_bd(30, Gender::Male, 8_000.0, 65, BenefitTarget::Value(5_000.0), 0.06)
            .with_contribution_rate(10.0)
    }

    #[test]
    fn test_linear_benefit_solve() {
        // Deficit falls 100 per unit of benefit, zero at 4_321
        let report = solve(&state(), SolveFor::Benefit, &SolverSettings::default(), |s| {
            Ok(100.0 * (4_321.0 - s.benefit_target.magnitude()))
        })
        .unwrap();

        assert!(report.validated);
        assert!(report.residual.abs() < 50.0);
        assert!((report.value - 4_321.0).abs() < 0.5);
        assert!(report.evaluations <= SolverSettings::default().max_evaluations);
    }

    #[test]
    fn test_base_state_error_propagates() {
        let result = solve(&state(), SolveFor::Salary, &SolverSettings::default(), |_| {
            Err(ValuationError::invalid("salary", "bad"))
        });
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_unreachable_target_returns_best_guess() {
        // Deficit never reaches zero: 1_000 + rate
        let report = solve(&state(), SolveFor::ContributionRate, &SolverSettings::default(), |s| {
            Ok(-1_000.0 - s.contribution_rate)
        })
        .unwrap();

        assert!(!report.validated);
        assert_eq!(report.value, 0.0);
    }

    #[test]
    fn test_retirement_age_scan() {
        let report = solve(&state(), SolveFor::RetirementAge, &SolverSettings::default(), |s| {
            Ok((s.retirement_age as f64 - 63.0) * 1_000.0)
        })
        .unwrap();

        assert_eq!(report.value, 63.0);
        assert!(report.validated);
        assert_eq!(report.strategy, Strategy::IntegerScan);
    }

    #[test]
    fn test_retirement_age_scan_with_no_ages_left() {
        let mut old = state();
        old.age = 86;
        old.retirement_age = 65;

        let report = solve(&old, SolveFor::RetirementAge, &SolverSettings::default(), |_| Ok(-500.0)).unwrap();

        assert_eq!(report.value, 65.0);
        assert_eq!(report.residual, -500.0);
        assert!(!report.validated);
        assert_eq!(report.strategy, Strategy::IntegerScan);
    }

    #[test]
    fn test_apply_keeps_target_mode() {
        let s = state().with_benefit_target(BenefitTarget::ReplacementRate(60.0));
        let trial = SolveFor::Benefit.apply(&s, 45.0);
        assert_eq!(trial.benefit_target, BenefitTarget::ReplacementRate(45.0));
        assert_eq!(SolveFor::Benefit.bounds(&s).upper, 200.0);
    }
}
