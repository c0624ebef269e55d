//! Age-indexed mortality vectors
//!
//! A [`MortalityVector`] holds annual death probabilities `qx` for one table,
//! gender and aggravation. Vectors are immutable once built and are shared
//! between valuations through `Arc` (see [`super::MortalityCache`]).
//!
//! Aggravation follows the market convention used by Brazilian pension funds:
//! a *positive* aggravation is a prudence margin that **reduces** mortality,
//! `qx' = qx * (1 - aggravation / 100)`, clamped to `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::participant::Gender;

/// Constant force within the year: q_monthly = 1 - (1 - q_annual)^(1/12)
pub fn monthly_from_annual(annual: f64) -> f64 {
    1.0 - (1.0 - annual).powf(1.0 / 12.0)
}

/// Apply an aggravation percentage to an annual rate
///
/// Invalid input rates are passed through untouched so that the projector can
/// recognise and neutralise them.
pub fn apply_aggravation(qx: f64, aggravation_pct: f64) -> f64 {
    if !is_valid_rate(qx) {
        return qx;
    }
    (qx * (1.0 - aggravation_pct / 100.0)).clamp(0.0, 1.0)
}

/// A probability usable as a mortality rate
pub fn is_valid_rate(q: f64) -> bool {
    q.is_finite() && (0.0..=1.0).contains(&q)
}

/// Annual mortality probabilities by integer age for one table and gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityVector {
    code: String,
    gender: Gender,
    aggravation: f64,
    /// Index = age
    qx: Vec<f64>,
}

impl MortalityVector {
    /// Build a vector from base table rates, applying the aggravation
    pub fn new(code: &str, gender: Gender, aggravation: f64, base_rates: &[f64]) -> Self {
        let qx = base_rates
            .iter()
            .map(|&q| apply_aggravation(q, aggravation))
            .collect();

        Self {
            code: code.to_string(),
            gender,
            aggravation,
            qx,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn aggravation(&self) -> f64 {
        self.aggravation
    }

    /// Raw adjusted rates, index = age
    pub fn rates(&self) -> &[f64] {
        &self.qx
    }

    /// Highest age carried by the table
    pub fn max_age(&self) -> u32 {
        self.qx.len().saturating_sub(1) as u32
    }

    /// Annual rate at an age, None beyond the table
    pub fn annual_rate(&self, age: u32) -> Option<f64> {
        self.qx.get(age as usize).copied()
    }

    /// Monthly rate at an age, None beyond the table or when the stored rate is invalid
    pub fn monthly_rate(&self, age: u32) -> Option<f64> {
        self.annual_rate(age)
            .filter(|q| is_valid_rate(*q))
            .map(monthly_from_annual)
    }

    /// Cumulative monthly survival starting at `start_age`
    ///
    /// `survival[t]` is the probability of being alive at the start of month
    /// `t`, so `survival[0] == 1`. Survival is forced to zero once the attained
    /// age passes either the table's last age or `max_age`. An invalid `qx` is
    /// treated as zero mortality for the affected months.
    pub fn survival_curve(&self, start_age: u32, months: usize, max_age: u32) -> Vec<f64> {
        let last_age = max_age.min(self.max_age());
        let mut curve = Vec::with_capacity(months);
        let mut survival = 1.0_f64;
        let mut invalid_ages: Vec<u32> = Vec::new();

        for t in 0..months {
            let age = start_age + (t / 12) as u32;
            if age > last_age {
                survival = 0.0;
            }
            curve.push(survival);

            if survival <= 0.0 {
                continue;
            }

            let q_monthly = match self.annual_rate(age) {
                Some(q) if is_valid_rate(q) => monthly_from_annual(q),
                Some(_) => {
                    if invalid_ages.last() != Some(&age) {
                        invalid_ages.push(age);
                    }
                    0.0
                }
                None => 1.0,
            };
            survival = (survival * (1.0 - q_monthly)).max(0.0);
        }

        if !invalid_ages.is_empty() {
            log::warn!(
                "Table {} has invalid qx at ages {:?}; treated as zero mortality",
                self.code,
                invalid_ages
            );
        }

        curve
    }
}
