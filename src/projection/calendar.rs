//! Payment calendar
//!
//! Projection months are 0-indexed from the valuation date. Extra annual
//! payments (13th and 14th salary or benefit) fall in fixed months: the 13th
//! in December (month 12) and the 14th in January (month 1).

/// Position of a projection month in the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPosition {
    /// Whole years elapsed since the valuation date
    pub year: usize,

    /// Month of year (1-12)
    pub month_of_year: u32,
}

impl MonthPosition {
    pub fn of(projection_month: usize) -> Self {
        Self {
            year: projection_month / 12,
            month_of_year: (projection_month % 12) as u32 + 1,
        }
    }
}

/// Number of payments made in a projection month given the annual count
pub fn payments_in_month(projection_month: usize, payments_per_year: u32) -> f64 {
    let month = MonthPosition::of(projection_month).month_of_year;
    let extra = match payments_per_year {
        13 => u32::from(month == 12),
        14 => u32::from(month == 12 || month == 1),
        _ => 0,
    };
    1.0 + extra as f64
}

/// Average payments per month; used to scale level annuity factors
pub fn average_payments_per_month(payments_per_year: u32) -> f64 {
    payments_per_year as f64 / 12.0
}
