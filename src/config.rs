//! Engine configuration
//!
//! Every policy constant the engine relies on lives here so that a caller can
//! override it from a JSON file without recompiling. Defaults match the
//! values used in production valuations.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Top-level configuration for a valuation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of post-retirement years an active projection must cover
    pub min_retirement_years: u32,

    /// Horizon cap (years) for participants already receiving benefits
    pub max_retirement_projection_years: u32,

    /// Oldest age modeled; survival is forced to zero past this point
    pub max_age: u32,

    /// Cap on the required contribution rate reported by sufficiency (percent)
    pub max_contribution_rate: f64,

    /// Root-finding settings
    pub solver: SolverSettings,

    /// Mortality cache sizing
    pub cache: CacheSettings,

    /// Defined contribution income settings
    pub cd: CdSettings,

    /// Shocks applied by the sensitivity sweep
    pub sensitivity: SensitivityShocks,

    /// Thresholds for advisory result warnings
    pub warnings: WarningThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_retirement_years: 25,
            max_retirement_projection_years: 50,
            max_age: 110,
            max_contribution_rate: 50.0,
            solver: SolverSettings::default(),
            cache: CacheSettings::default(),
            cd: CdSettings::default(),
            sensitivity: SensitivityShocks::default(),
            warnings: WarningThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Lighter configuration for interactive use: fewer shocks, smaller budgets
    pub fn quick() -> Self {
        Self {
            solver: SolverSettings {
                max_iterations: 50,
                max_evaluations: 150,
                ..Default::default()
            },
            sensitivity: SensitivityShocks {
                discount_rate: vec![0.01],
                mortality_aggravation: vec![10.0],
                retirement_age: vec![2],
                salary_growth: vec![0.01],
                inflation: vec![0.01],
            },
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_path(path: &Path) -> EngineResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Root-finding budgets and acceptance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Iteration cap per strategy
    pub max_iterations: u32,

    /// Total full-valuation budget across every strategy of one solve
    pub max_evaluations: u32,

    /// Absolute deficit (currency units) under which a root is accepted
    pub residual_tolerance: f64,

    /// Step tolerance on the parameter itself
    pub x_tolerance: f64,

    /// Number of doublings tried when searching for a sign change
    pub bracket_expansions: u32,

    /// Points evaluated by the bounded best-guess fallback
    pub grid_points: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_evaluations: 400,
            residual_tolerance: 50.0,
            x_tolerance: 1e-6,
            bracket_expansions: 20,
            grid_points: 40,
        }
    }
}

/// Mortality cache sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of (table, gender, aggravation) vectors kept
    pub capacity: usize,

    /// Seconds an entry stays valid
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_secs: 3600,
        }
    }
}

/// Defined contribution income settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdSettings {
    /// Longest benefit period simulated when estimating duration (years)
    pub max_duration_years: u32,

    /// Simulation stops once cumulative survival falls below this
    pub survival_floor: f64,

    /// Percentage drawdown ends once the monthly income falls below this amount
    pub income_floor: f64,
}

impl Default for CdSettings {
    fn default() -> Self {
        Self {
            max_duration_years: 50,
            survival_floor: 0.01,
            income_floor: 100.0,
        }
    }
}

/// Additive shocks applied by the sensitivity sweep
///
/// Rates are absolute decimal shifts (0.01 = one percentage point), aggravation
/// is in percentage points and retirement age in years. Each listed shock is
/// applied both up and down unless it is already signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityShocks {
    pub discount_rate: Vec<f64>,
    pub mortality_aggravation: Vec<f64>,
    pub retirement_age: Vec<i32>,
    pub salary_growth: Vec<f64>,
    pub inflation: Vec<f64>,
}

impl Default for SensitivityShocks {
    fn default() -> Self {
        Self {
            discount_rate: vec![0.005, 0.01],
            mortality_aggravation: vec![10.0],
            retirement_age: vec![1, 2],
            salary_growth: vec![0.005, 0.01],
            inflation: vec![0.01],
        }
    }
}

/// Thresholds for advisory (never blocking) economic warnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningThresholds {
    /// Warn when VPA(contributions) exceeds this multiple of VPA(benefits)
    pub contribution_to_benefit_ratio: f64,

    /// Warn when |deficit| exceeds this multiple of the monthly salary
    pub deficit_to_salary_ratio: f64,

    /// Warn when the replacement ratio exceeds this percentage
    pub max_replacement_ratio: f64,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            contribution_to_benefit_ratio: 10.0,
            deficit_to_salary_ratio: 1000.0,
            max_replacement_ratio: 200.0,
        }
    }
}
