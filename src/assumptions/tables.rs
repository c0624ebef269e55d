//! Mortality table registry
//!
//! The engine ships parametric Gompertz-Makeham graduations for the table
//! codes most often requested by plan sponsors, so a valuation can run with
//! no data files at all. Exact published rates can be registered from CSV at
//! start-up (see [`super::loader`]) and take precedence over the bundled
//! graduation with the same code.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::loader::load_table_rates;
use super::mortality::MortalityVector;
use super::MortalityProvider;
use crate::error::{EngineResult, ValuationError};
use crate::participant::Gender;

/// Last age carried by the bundled graduations
pub const BUNDLED_TABLE_MAX_AGE: usize = 115;

/// Gompertz-Makeham law: force of mortality mu(x) = a + b * c^x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GompertzMakeham {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl GompertzMakeham {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Annual death probability between ages x and x+1
    pub fn qx(&self, age: usize) -> f64 {
        let x = age as f64;
        let ln_c = self.c.ln();
        let integrated_force = self.a + self.b * self.c.powf(x) * (self.c - 1.0) / ln_c;
        (1.0 - (-integrated_force).exp()).clamp(0.0, 1.0)
    }

    /// Rates for ages 0..=max_age, with certain death at the closing age
    pub fn rates(&self, max_age: usize) -> Vec<f64> {
        let mut rates: Vec<f64> = (0..=max_age).map(|age| self.qx(age)).collect();
        if let Some(last) = rates.last_mut() {
            *last = 1.0;
        }
        rates
    }
}

/// Where a registered table gets its rates from
#[derive(Debug, Clone, PartialEq)]
enum TableSource {
    Parametric {
        female: GompertzMakeham,
        male: GompertzMakeham,
    },
    Rates {
        female: Vec<f64>,
        male: Vec<f64>,
    },
}

impl TableSource {
    fn base_rates(&self, gender: Gender) -> Vec<f64> {
        match self {
            TableSource::Parametric { female, male } => {
                let law = match gender {
                    Gender::Female => female,
                    Gender::Male => male,
                };
                law.rates(BUNDLED_TABLE_MAX_AGE)
            }
            TableSource::Rates { female, male } => match gender {
                Gender::Female => female.clone(),
                Gender::Male => male.clone(),
            },
        }
    }
}

/// Catalogue of mortality tables keyed by code
///
/// Building a vector is cheap compared to a valuation but not free; wrap the
/// registry in a [`super::MortalityCache`] when it serves many valuations.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: BTreeMap<String, TableSource>,
}

impl TableRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled parametric graduations
    pub fn bundled() -> Self {
        let mut registry = Self::new();
        registry.register_parametric(
            "BR_EMS_2021",
            GompertzMakeham::new(0.0002, 0.000010, 1.1045),
            GompertzMakeham::new(0.0004, 0.000020, 1.1015),
        );
        registry.register_parametric(
            "BR_EMS_2015",
            GompertzMakeham::new(0.00025, 0.000012, 1.1030),
            GompertzMakeham::new(0.0005, 0.000024, 1.1000),
        );
        registry.register_parametric(
            "AT_2000",
            GompertzMakeham::new(0.0002, 0.000014, 1.1020),
            GompertzMakeham::new(0.0004, 0.000028, 1.0980),
        );
        registry.register_parametric(
            "AT_83",
            GompertzMakeham::new(0.0003, 0.000017, 1.1010),
            GompertzMakeham::new(0.0006, 0.000030, 1.0990),
        );
        registry
    }

    /// Register a parametric table
    pub fn register_parametric(&mut self, code: &str, female: GompertzMakeham, male: GompertzMakeham) {
        self.tables
            .insert(code.to_string(), TableSource::Parametric { female, male });
    }

    /// Register explicit rates (index = age)
    pub fn register_rates(&mut self, code: &str, female: Vec<f64>, male: Vec<f64>) {
        self.tables
            .insert(code.to_string(), TableSource::Rates { female, male });
    }

    /// Register a table from a CSV file with columns age,female,male
    pub fn register_csv(&mut self, code: &str, path: &Path) -> EngineResult<()> {
        let (female, male) = load_table_rates(code, path)?;
        log::info!("Registered mortality table {} ({} ages) from {}", code, female.len(), path.display());
        self.register_rates(code, female, male);
        Ok(())
    }

    /// Codes of all registered tables
    pub fn codes(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Whether a code is registered
    pub fn contains(&self, code: &str) -> bool {
        self.tables.contains_key(code)
    }

    /// Build a vector for the given table, gender and aggravation
    pub fn build(&self, code: &str, gender: Gender, aggravation: f64) -> EngineResult<MortalityVector> {
        let source = self
            .tables
            .get(code)
            .ok_or_else(|| ValuationError::UnknownMortalityTable {
                code: code.to_string(),
            })?;
        Ok(MortalityVector::new(code, gender, aggravation, &source.base_rates(gender)))
    }
}

impl MortalityProvider for TableRegistry {
    fn get_table(&self, code: &str, gender: Gender, aggravation: f64) -> EngineResult<Arc<MortalityVector>> {
        self.build(code, gender, aggravation).map(Arc::new)
    }

    fn available_tables(&self) -> Vec<String> {
        self.codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tables_are_plausible() {
        let registry = TableRegistry::bundled();

        for code in registry.codes() {
            for gender in [Gender::Male, Gender::Female] {
                let table = registry.build(&code, gender, 0.0).unwrap();
                let rates = table.rates();

                assert_eq!(rates.len(), BUNDLED_TABLE_MAX_AGE + 1);
                assert!(rates.iter().all(|q| (0.0..=1.0).contains(q)));
                // Increasing with age over the adult range
                assert!(rates[30..100].windows(2).all(|w| w[1] >= w[0]), "{} not increasing", code);
                assert_eq!(rates[BUNDLED_TABLE_MAX_AGE], 1.0);
            }
        }
    }

    #[test]
    fn test_br_ems_2021_level_at_65() {
        let registry = TableRegistry::bundled();
        let male = registry.build("BR_EMS_2021", Gender::Male, 0.0).unwrap();
        let female = registry.build("BR_EMS_2021", Gender::Female, 0.0).unwrap();

        let q65_male = male.annual_rate(65).unwrap();
        assert!(q65_male > 0.005 && q65_male < 0.03, "q65 male = {}", q65_male);
        assert!(female.annual_rate(65).unwrap() < q65_male);

        let p65_to_85 = male.survival_curve(65, 241, 110)[240];
        assert!(p65_to_85 > 0.2 && p65_to_85 < 0.8, "20p65 = {}", p65_to_85);
    }

    #[test]
    fn test_unknown_table() {
        let registry = TableRegistry::bundled();
        let err = registry.build("NOPE", Gender::Male, 0.0).unwrap_err();
        assert!(matches!(err, ValuationError::UnknownMortalityTable { .. }));
    }

    #[test]
    fn test_explicit_rates_override() {
        let mut registry = TableRegistry::bundled();
        registry.register_rates("BR_EMS_2021", vec![0.5; 10], vec![0.25; 10]);

        let male = registry.get_table("BR_EMS_2021", Gender::Male, 20.0).unwrap();
        assert_eq!(male.max_age(), 9);
        assert!((male.annual_rate(3).unwrap() - 0.2).abs() < 1e-12);
    }
}
