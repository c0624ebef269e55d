//! Disability incidence rates
//!
//! Used only by the multi-decrement extension. Rates are annual incidence
//! probabilities `ix` indexed by age; the monthly conversion is the same
//! constant-force formula used for mortality.

use serde::{Deserialize, Serialize};

use super::mortality::{is_valid_rate, monthly_from_annual};

/// Annual disability incidence by integer age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisabilityTable {
    name: String,
    ix: Vec<f64>,
}

impl DisabilityTable {
    /// Exponential graduation ix = 0.0003 + 0.00004 * exp(0.085 * (x - 20)),
    /// zero past age 70 where disability retirement no longer applies
    pub fn standard() -> Self {
        let ix = (0..=110_u32)
            .map(|age| {
                if age > 70 {
                    0.0
                } else {
                    let x = age as f64;
                    (0.0003 + 0.00004 * (0.085 * (x - 20.0)).exp()).min(1.0)
                }
            })
            .collect();

        Self {
            name: "STANDARD_EXP".to_string(),
            ix,
        }
    }

    /// Explicit rates (index = age)
    pub fn from_rates(name: &str, ix: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            ix,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Annual incidence; zero beyond the table or for invalid entries
    pub fn annual_rate(&self, age: u32) -> f64 {
        self.ix
            .get(age as usize)
            .copied()
            .filter(|i| is_valid_rate(*i))
            .unwrap_or(0.0)
    }

    /// Monthly incidence
    pub fn monthly_rate(&self, age: u32) -> f64 {
        monthly_from_annual(self.annual_rate(age))
    }
}
