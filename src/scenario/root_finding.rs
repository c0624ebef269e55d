//! Root-finding strategies over a budgeted, memoised objective
//!
//! Each strategy returns a typed [`SolverOutcome`] rather than an error so the
//! caller can move on to the next strategy and still keep the best point seen.
//!
//! | Strategy | Requires | Notes |
//! |----------|----------|-------|
//! | Brent | Bracket (auto-expanded) | Primary |
//! | Secant | Two guesses | May leave the bracket; clamped to bounds |
//! | Bisection | Sign change over the bounds | Slow but sure |
//! | Best guess | Bounds | Grid minimising abs(f) |

use serde::{Deserialize, Serialize};

use crate::config::SolverSettings;

use super::memo::{MemoTable, TrialKey};
use super::solver::SolveFor;

/// Strategy that produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Brent,
    Secant,
    Bisection,
    BestGuess,
    IntegerScan,
}

/// Result of one strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub value: f64,
    pub converged: bool,
    pub residual: f64,
    pub iterations: u32,
    pub strategy: Strategy,
}

/// Closed search interval for the parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }
}

/// Objective with an evaluation budget and a trial memo
///
/// `eval` returns `None` when the trial point is not a valid participant
/// state or when the budget is spent.
pub struct Objective<'a> {
    function: &'a mut dyn FnMut(f64) -> Option<f64>,
    parameter: SolveFor,
    memo: MemoTable<TrialKey, Option<f64>>,
    evaluations: u32,
    max_evaluations: u32,
    best: Option<(f64, f64)>,
}

impl<'a> Objective<'a> {
    pub fn new(function: &'a mut dyn FnMut(f64) -> Option<f64>, parameter: SolveFor, max_evaluations: u32) -> Self {
        Self {
            function,
            parameter,
            memo: MemoTable::new(max_evaluations as usize + 16),
            evaluations: 0,
            max_evaluations,
            best: None,
        }
    }

    /// f(x), memoised
    pub fn eval(&mut self, x: f64) -> Option<f64> {
        let key = TrialKey::new(self.parameter, x);
        let evaluations = &mut self.evaluations;
        let max_evaluations = self.max_evaluations;
        let function = &mut *self.function;

        let value = match self.memo.get_or_try_insert_with(key, || {
            if *evaluations >= max_evaluations {
                return Err(());
            }
            *evaluations += 1;
            Ok(function(x).filter(|v| v.is_finite()))
        }) {
            Ok(value) => value,
            Err(()) => {
                log::debug!("Evaluation budget of {} exhausted", max_evaluations);
                return None;
            }
        };

        if let Some(fx) = value {
            let improves = self.best.map_or(true, |(_, best)| fx.abs() < best.abs());
            if improves {
                self.best = Some((x, fx));
            }
        }
        value
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }

    pub fn exhausted(&self) -> bool {
        self.evaluations >= self.max_evaluations
    }

    /// Point with the smallest |f| seen so far
    pub fn best(&self) -> Option<(f64, f64)> {
        self.best
    }

    /// (hits, misses) of the trial memo
    pub fn memo_stats(&self) -> (u64, u64) {
        (self.memo.hits, self.memo.misses)
    }
}

/// Widen `[a, b]` within `bounds` until f changes sign
fn expand_bracket(
    objective: &mut Objective<'_>,
    a: f64,
    b: f64,
    bounds: &Bounds,
    expansions: u32,
) -> Option<(f64, f64, f64, f64)> {
    let (mut a, mut b) = (bounds.clamp(a.min(b)), bounds.clamp(a.max(b)));
    let mut fa = objective.eval(a)?;
    let mut fb = objective.eval(b)?;

    for _ in 0..expansions {
        if fa * fb <= 0.0 {
            return Some((a, fa, b, fb));
        }
        let width = (b - a).max(1e-6);
        let new_a = bounds.clamp(a - width);
        let new_b = bounds.clamp(b + width);
        if new_a == a && new_b == b {
            break;
        }
        if new_a != a {
            a = new_a;
            fa = objective.eval(a)?;
        }
        if new_b != b {
            b = new_b;
            fb = objective.eval(b)?;
        }
    }

    (fa * fb <= 0.0).then_some((a, fa, b, fb))
}

/// Brent's method with automatic bracket expansion
#[allow(clippy::many_single_char_names)]
pub fn brent(
    objective: &mut Objective<'_>,
    guess_low: f64,
    guess_high: f64,
    bounds: &Bounds,
    settings: &SolverSettings,
) -> Option<SolverOutcome> {
    let (mut a, mut fa, mut b, mut fb) =
        expand_bracket(objective, guess_low, guess_high, bounds, settings.bracket_expansions)?;

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iteration in 0..settings.max_iterations {
        if fb.abs() < settings.residual_tolerance || (b - a).abs() < settings.x_tolerance {
            return Some(SolverOutcome {
                value: b,
                converged: fb.abs() < settings.residual_tolerance,
                residual: fb,
                iterations: iteration,
                strategy: Strategy::Brent,
            });
        }

        let mut use_bisection = true;
        let mut s = 0.0;
        let m = (a + b) / 2.0;

        if (fa - fc).abs() > 1e-15 && (fb - fc).abs() > 1e-15 {
            // Inverse quadratic interpolation
            let r = fb / fc;
            let p = fa / fc;
            let q = fa / fb;
            s = b - (q * (q - r) * (b - a) + (1.0 - r) * (b - c) * p) / ((q - 1.0) * (r - 1.0) * (p - 1.0));
        } else if (fb - fa).abs() > 1e-15 {
            s = b - fb * (b - a) / (fb - fa);
        }
        if s.is_finite() && s > m.min(b) && s < m.max(b) && (s - b).abs() < e.abs() / 2.0 {
            use_bisection = false;
        }

        if use_bisection {
            s = m;
            e = b - a;
            d = e;
        } else {
            e = d;
            d = s - b;
        }

        c = b;
        fc = fb;

        let fs = objective.eval(s)?;
        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }

    Some(SolverOutcome {
        value: b,
        converged: false,
        residual: fb,
        iterations: settings.max_iterations,
        strategy: Strategy::Brent,
    })
}

/// Secant iteration from two starting points, clamped to bounds
pub fn secant(
    objective: &mut Objective<'_>,
    x0: f64,
    x1: f64,
    bounds: &Bounds,
    settings: &SolverSettings,
) -> Option<SolverOutcome> {
    let mut x0 = bounds.clamp(x0);
    let mut x1 = bounds.clamp(x1);
    let mut f0 = objective.eval(x0)?;
    let mut f1 = objective.eval(x1)?;

    for iteration in 0..settings.max_iterations {
        if f1.abs() < settings.residual_tolerance {
            return Some(SolverOutcome {
                value: x1,
                converged: true,
                residual: f1,
                iterations: iteration,
                strategy: Strategy::Secant,
            });
        }

        let denominator = f1 - f0;
        if denominator.abs() < 1e-15 {
            break;
        }

        let x2 = bounds.clamp(x1 - f1 * (x1 - x0) / denominator);
        if (x2 - x1).abs() < settings.x_tolerance {
            break;
        }

        x0 = x1;
        f0 = f1;
        x1 = x2;
        f1 = objective.eval(x1)?;
    }

    Some(SolverOutcome {
        value: x1,
        converged: f1.abs() < settings.residual_tolerance,
        residual: f1,
        iterations: settings.max_iterations,
        strategy: Strategy::Secant,
    })
}

/// Bisection over the full bounds
pub fn bisection(objective: &mut Objective<'_>, bounds: &Bounds, settings: &SolverSettings) -> Option<SolverOutcome> {
    let mut a = bounds.lower;
    let mut b = bounds.upper;
    let fa = objective.eval(a)?;
    let fb = objective.eval(b)?;

    if fa * fb > 0.0 {
        return None;
    }

    let mut fa = fa;
    let mut mid = (a + b) / 2.0;
    let mut fmid = fb;

    for iteration in 0..settings.max_iterations {
        mid = (a + b) / 2.0;
        fmid = objective.eval(mid)?;

        if fmid.abs() < settings.residual_tolerance || (b - a) / 2.0 < settings.x_tolerance {
            return Some(SolverOutcome {
                value: mid,
                converged: fmid.abs() < settings.residual_tolerance,
                residual: fmid,
                iterations: iteration + 1,
                strategy: Strategy::Bisection,
            });
        }

        if fa * fmid < 0.0 {
            b = mid;
        } else {
            a = mid;
            fa = fmid;
        }
    }

    Some(SolverOutcome {
        value: mid,
        converged: false,
        residual: fmid,
        iterations: settings.max_iterations,
        strategy: Strategy::Bisection,
    })
}

/// Grid search for the point with the smallest |f|
pub fn best_guess(objective: &mut Objective<'_>, bounds: &Bounds, settings: &SolverSettings) -> Option<SolverOutcome> {
    let points = settings.grid_points.max(2);
    let step = (bounds.upper - bounds.lower) / (points - 1) as f64;

    let mut best: Option<(f64, f64)> = None;
    for k in 0..points {
        let x = bounds.lower + step * k as f64;
        if let Some(fx) = objective.eval(x) {
            if best.map_or(true, |(_, fb)| fx.abs() < fb.abs()) {
                best = Some((x, fx));
            }
        }
    }

    best.map(|(value, residual)| SolverOutcome {
        value,
        converged: residual.abs() < settings.residual_tolerance,
        residual,
        iterations: points,
        strategy: Strategy::BestGuess,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SolverSettings {
        SolverSettings {
            residual_tolerance: 1e-6,
            x_tolerance: 1e-12,
            ..Default::default()
        }
    }

    #[test]
    fn test_brent_expands_bracket() {
        let mut f = |x: f64| Some(1_000.0 * (x - 37.5));
        let mut objective = Objective::new(&mut f, SolveFor::Benefit, 400);

        let outcome = brent(&mut objective, 1.0, 2.0, &Bounds::new(0.0, 100.0), &settings()).unwrap();
        assert!(outcome.converged);
        assert!((outcome.value - 37.5).abs() < 1e-6);
        assert_eq!(outcome.strategy, Strategy::Brent);
    }

    #[test]
    fn test_brent_without_sign_change() {
        let mut f = |x: f64| Some(x * x + 1.0);
        let mut objective = Objective::new(&mut f, SolveFor::Benefit, 400);
        assert!(brent(&mut objective, -1.0, 1.0, &Bounds::new(-10.0, 10.0), &settings()).is_none());
    }

    #[test]
    fn test_secant_on_cubic() {
        let mut f = |x: f64| Some(x * x * x - x - 2.0);
        let mut objective = Objective::new(&mut f, SolveFor::Salary, 400);

        let outcome = secant(&mut objective, 1.0, 2.0, &Bounds::new(0.0, 10.0), &settings()).unwrap();
        assert!(outcome.converged);
        assert!((outcome.value - 1.5213797068).abs() < 1e-6);
    }

    #[test]
    fn test_bisection_and_best_guess() {
        let mut f = |x: f64| Some(x - 3.0);
        let mut objective = Objective::new(&mut f, SolveFor::ContributionRate, 400);
        let bounds = Bounds::new(0.0, 10.0);

        let outcome = bisection(&mut objective, &bounds, &settings()).unwrap();
        assert!(outcome.converged);
        assert!((outcome.value - 3.0).abs() < 1e-6);

        let guess = best_guess(&mut objective, &bounds, &SolverSettings { grid_points: 11, ..settings() }).unwrap();
        assert_eq!(guess.value, 3.0);
    }

    #[test]
    fn test_budget_is_a_circuit_breaker() {
        let mut calls = 0;
        let mut f = |x: f64| {
            calls += 1;
            Some(x + 1.0)
        };
        let mut objective = Objective::new(&mut f, SolveFor::Benefit, 5);

        let outcome = best_guess(&mut objective, &Bounds::new(0.0, 10.0), &settings());
        assert!(objective.exhausted());
        assert_eq!(objective.evaluations(), 5);
        assert_eq!(outcome.unwrap().value, 0.0);
        drop(objective);
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_invalid_points_are_skipped() {
        let mut f = |x: f64| if x < 5.0 { None } else { Some(x - 7.0) };
        let mut objective = Objective::new(&mut f, SolveFor::Benefit, 400);

        let guess = best_guess(&mut objective, &Bounds::new(0.0, 10.0), &SolverSettings { grid_points: 11, ..settings() }).unwrap();
        assert_eq!(guess.value, 7.0);
        assert!(bisection(&mut objective, &Bounds::new(0.0, 10.0), &settings()).is_none());
        assert_eq!(objective.best(), Some((7.0, 0.0)));
    }
}
