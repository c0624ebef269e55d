//! Projected cash-flow vectors and their yearly roll-up

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Parallel monthly vectors for one participant
///
/// Every vector has `total_months` entries. `reserves` holds the BD reserve
/// roll-forward or the CD balance, recorded at the end of each month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSeries {
    pub ages: Vec<u32>,
    pub salaries: Vec<f64>,
    pub contributions: Vec<f64>,
    pub benefits: Vec<f64>,
    pub survival: Vec<f64>,
    pub reserves: Vec<f64>,

    /// Projected monthly salary in the last active month (current salary once retired)
    pub final_salary: f64,

    /// Monthly benefit (BD) or initial income (CD) in the first benefit month,
    /// before extra payments and indexation
    pub initial_benefit: f64,

    /// Balance available at the retirement date (CD); the initial balance for BD
    pub balance_at_retirement: f64,
}

impl ProjectionSeries {
    /// Empty series with room for `months` entries
    pub fn with_capacity(months: usize) -> Self {
        Self {
            ages: Vec::with_capacity(months),
            salaries: Vec::with_capacity(months),
            contributions: Vec::with_capacity(months),
            benefits: Vec::with_capacity(months),
            survival: Vec::with_capacity(months),
            reserves: Vec::with_capacity(months),
            ..Default::default()
        }
    }

    /// Append one month
    pub fn push_month(&mut self, age: u32, salary: f64, contribution: f64, benefit: f64, survival: f64, reserve: f64) {
        self.ages.push(age);
        self.salaries.push(salary);
        self.contributions.push(contribution);
        self.benefits.push(benefit);
        self.survival.push(survival);
        self.reserves.push(reserve);
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Reserve or balance at the end of the horizon
    pub fn final_reserve(&self) -> f64 {
        self.reserves.last().copied().unwrap_or(0.0)
    }

    /// Aggregate months into projection years
    pub fn yearly_rollup(&self) -> Vec<YearlyRow> {
        let n = self.len();
        (0..n)
            .step_by(12)
            .map(|start| {
                let end = (start + 12).min(n);
                YearlyRow {
                    year: (start / 12) as u32,
                    age: self.ages[start],
                    salary: self.salaries[start..end].iter().sum(),
                    contribution: self.contributions[start..end].iter().sum(),
                    benefit: self.benefits[start..end].iter().sum(),
                    survival: self.survival[start],
                    reserve: self.reserves[end - 1],
                }
            })
            .collect()
    }

    /// Whether all vectors agree in length
    pub fn is_consistent(&self) -> bool {
        let n = self.ages.len();
        [
            self.salaries.len(),
            self.contributions.len(),
            self.benefits.len(),
            self.survival.len(),
            self.reserves.len(),
        ]
        .iter()
        .all(|&len| len == n)
    }
}

/// One projection year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRow {
    pub year: u32,
    /// Age at the start of the year
    pub age: u32,
    /// Salary paid during the year, extra payments included
    pub salary: f64,
    pub contribution: f64,
    pub benefit: f64,
    /// Survival probability at the start of the year
    pub survival: f64,
    /// Reserve or balance at the end of the year
    pub reserve: f64,
}

/// Write yearly rows as CSV, one record per row
pub fn write_yearly_csv<W: Write, R: Serialize>(rows: &[R], writer: W) -> EngineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
