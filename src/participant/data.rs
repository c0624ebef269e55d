//! Participant input snapshot and its closed mode enums

use serde::{Deserialize, Serialize};

fn default_payments_per_year() -> u32 {
    12
}

fn default_projection_years() -> u32 {
    40
}

fn default_accrual_rate() -> f64 {
    2.0
}

fn default_table() -> String {
    "BR_EMS_2021".to_string()
}

/// Gender of a life, used for mortality table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    #[serde(alias = "M", alias = "male")]
    Male,
    #[serde(alias = "F", alias = "female")]
    Female,
}

/// Plan family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    /// Defined benefit
    #[serde(rename = "BD", alias = "bd")]
    Bd,
    /// Defined contribution
    #[serde(rename = "CD", alias = "cd")]
    Cd,
}

/// Benefit target: a literal monthly amount or a share of final salary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum BenefitTarget {
    /// Monthly benefit in currency units
    Value(f64),
    /// Percent of the final projected monthly salary
    ReplacementRate(f64),
}

impl BenefitTarget {
    /// Monthly benefit implied by this target given the final salary
    pub fn monthly_amount(&self, final_salary: f64) -> f64 {
        match *self {
            BenefitTarget::Value(amount) => amount,
            BenefitTarget::ReplacementRate(pct) => final_salary * pct / 100.0,
        }
    }

    /// Same mode with a different magnitude
    pub fn with_magnitude(&self, magnitude: f64) -> Self {
        match self {
            BenefitTarget::Value(_) => BenefitTarget::Value(magnitude),
            BenefitTarget::ReplacementRate(_) => BenefitTarget::ReplacementRate(magnitude),
        }
    }

    /// Raw magnitude (amount or percent)
    pub fn magnitude(&self) -> f64 {
        match *self {
            BenefitTarget::Value(v) | BenefitTarget::ReplacementRate(v) => v,
        }
    }
}

/// When in the month a payment is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTiming {
    /// End of period (postecipado)
    Arrears,
    /// Start of period (antecipado)
    Advance,
}

impl PaymentTiming {
    /// Extra discounting periods applied to each payment
    pub fn adjustment(&self) -> u32 {
        match self {
            PaymentTiming::Arrears => 1,
            PaymentTiming::Advance => 0,
        }
    }
}

/// Cost method for BD normal cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationMethod {
    /// Projected unit credit
    #[serde(rename = "PUC", alias = "puc")]
    Puc,
    /// Entry age normal
    #[serde(rename = "EAN", alias = "ean")]
    Ean,
}

/// How a CD balance is converted into income at retirement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CdConversionMode {
    /// Lifetime annuity priced on the mortality table at retirement
    Actuarial,
    /// Lifetime annuity re-priced every year against the remaining balance
    ActuarialEquivalent,
    /// Annuity certain for a fixed number of years (5, 10, 15 or 20)
    Certain { years: u32 },
    /// Fixed annual percentage of the then-current balance
    Percentage { annual_pct: f64 },
    /// Programmed withdrawal exhausting the balance over a fixed horizon
    Programmed { years: u32 },
}

impl CdConversionMode {
    /// Term-certain horizon in years, if the mode has one
    pub fn finite_years(&self) -> Option<u32> {
        match *self {
            CdConversionMode::Certain { years } | CdConversionMode::Programmed { years } => {
                Some(years)
            }
            _ => None,
        }
    }

    /// Whether the income is paid for life
    pub fn is_lifelong(&self) -> bool {
        matches!(
            self,
            CdConversionMode::Actuarial | CdConversionMode::ActuarialEquivalent
        )
    }

    /// Whether income is recomputed every year against the current balance
    pub fn recomputes_annually(&self) -> bool {
        matches!(
            self,
            CdConversionMode::ActuarialEquivalent
                | CdConversionMode::Percentage { .. }
                | CdConversionMode::Programmed { .. }
        )
    }
}

impl Default for CdConversionMode {
    fn default() -> Self {
        CdConversionMode::Actuarial
    }
}

/// Relationship of a dependent to the participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    Spouse,
    Child,
}

/// A beneficiary entitled to a survivor pension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub kind: DependentKind,
    pub age: u32,
    pub gender: Gender,
    /// Share of the participant's benefit paid on reversion (percent)
    pub reversion_pct: f64,
    /// Age at which payments stop (typically set for children)
    #[serde(default)]
    pub until_age: Option<u32>,
}

/// Immutable input snapshot for one valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    /// Current age in whole years
    pub age: u32,

    pub gender: Gender,

    pub plan_type: PlanType,

    /// Current monthly salary
    pub salary: f64,

    /// Resources already accumulated for this participant
    #[serde(default)]
    pub initial_balance: f64,

    /// Contribution as percent of salary
    #[serde(default)]
    pub contribution_rate: f64,

    pub benefit_target: BenefitTarget,

    /// Percent of final salary accrued per year of service (PUC normal cost)
    #[serde(default = "default_accrual_rate")]
    pub accrual_rate: f64,

    pub retirement_age: u32,

    #[serde(default = "default_table")]
    pub mortality_table: String,

    /// Percent; positive values reduce mortality
    #[serde(default)]
    pub mortality_aggravation: f64,

    /// Annual decimal rate
    pub discount_rate: f64,

    /// Annual decimal rate
    #[serde(default)]
    pub salary_growth_rate: f64,

    /// Annual decimal rate indexing benefits in payment
    #[serde(default)]
    pub inflation_rate: f64,

    /// Annual decimal fee charged on the running balance
    #[serde(default)]
    pub admin_fee_rate: f64,

    /// Percent deducted from each contribution
    #[serde(default)]
    pub loading_fee_rate: f64,

    #[serde(default = "default_timing")]
    pub payment_timing: PaymentTiming,

    #[serde(default = "default_payments_per_year")]
    pub salary_payments_per_year: u32,

    #[serde(default = "default_payments_per_year")]
    pub benefit_payments_per_year: u32,

    #[serde(default = "default_projection_years")]
    pub projection_years: u32,

    #[serde(default = "default_method")]
    pub calculation_method: CalculationMethod,

    #[serde(default)]
    pub cd_conversion_mode: CdConversionMode,

    /// CD accumulation-phase rate (annual decimal); defaults to the discount rate
    #[serde(default)]
    pub accumulation_rate: Option<f64>,

    /// CD distribution-phase rate (annual decimal); defaults to the discount rate
    #[serde(default)]
    pub conversion_rate: Option<f64>,

    #[serde(default)]
    pub dependents: Vec<Dependent>,

    /// Monthly benefit paid on disablement before retirement
    #[serde(default)]
    pub disability_benefit: Option<f64>,
}

fn default_timing() -> PaymentTiming {
    PaymentTiming::Arrears
}

fn default_method() -> CalculationMethod {
    CalculationMethod::Puc
}

impl ParticipantState {
    /// Active BD participant with market-standard defaults for the optional fields
    pub fn new_bd(
        age: u32,
        gender: Gender,
        salary: f64,
        retirement_age: u32,
        benefit_target: BenefitTarget,
        discount_rate: f64,
    ) -> Self {
        Self {
            age,
            gender,
            plan_type: PlanType::Bd,
            salary,
            initial_balance: 0.0,
            contribution_rate: 0.0,
            benefit_target,
            accrual_rate: default_accrual_rate(),
            retirement_age,
            mortality_table: default_table(),
            mortality_aggravation: 0.0,
            discount_rate,
            salary_growth_rate: 0.0,
            inflation_rate: 0.0,
            admin_fee_rate: 0.0,
            loading_fee_rate: 0.0,
            payment_timing: PaymentTiming::Arrears,
            salary_payments_per_year: 12,
            benefit_payments_per_year: 12,
            projection_years: default_projection_years(),
            calculation_method: CalculationMethod::Puc,
            cd_conversion_mode: CdConversionMode::Actuarial,
            accumulation_rate: None,
            conversion_rate: None,
            dependents: Vec::new(),
            disability_benefit: None,
        }
    }

    /// Active CD participant
    pub fn new_cd(
        age: u32,
        gender: Gender,
        salary: f64,
        retirement_age: u32,
        contribution_rate: f64,
        conversion_mode: CdConversionMode,
        discount_rate: f64,
    ) -> Self {
        Self {
            plan_type: PlanType::Cd,
            contribution_rate,
            cd_conversion_mode: conversion_mode,
            benefit_target: BenefitTarget::ReplacementRate(70.0),
            ..Self::new_bd(
                age,
                gender,
                salary,
                retirement_age,
                BenefitTarget::ReplacementRate(70.0),
                discount_rate,
            )
        }
    }

    pub fn with_initial_balance(mut self, balance: f64) -> Self {
        self.initial_balance = balance;
        self
    }

    pub fn with_contribution_rate(mut self, rate: f64) -> Self {
        self.contribution_rate = rate;
        self
    }

    pub fn with_benefit_target(mut self, target: BenefitTarget) -> Self {
        self.benefit_target = target;
        self
    }

    pub fn with_mortality(mut self, table: &str, aggravation: f64) -> Self {
        self.mortality_table = table.to_string();
        self.mortality_aggravation = aggravation;
        self
    }

    pub fn with_salary_growth(mut self, rate: f64) -> Self {
        self.salary_growth_rate = rate;
        self
    }

    pub fn with_fees(mut self, admin_fee_rate: f64, loading_fee_rate: f64) -> Self {
        self.admin_fee_rate = admin_fee_rate;
        self.loading_fee_rate = loading_fee_rate;
        self
    }

    pub fn with_payments_per_year(mut self, salary: u32, benefit: u32) -> Self {
        self.salary_payments_per_year = salary;
        self.benefit_payments_per_year = benefit;
        self
    }

    pub fn with_method(mut self, method: CalculationMethod) -> Self {
        self.calculation_method = method;
        self
    }

    pub fn with_timing(mut self, timing: PaymentTiming) -> Self {
        self.payment_timing = timing;
        self
    }

    pub fn with_dependent(mut self, dependent: Dependent) -> Self {
        self.dependents.push(dependent);
        self
    }

    /// Whether benefits are already in payment
    pub fn is_already_retired(&self) -> bool {
        self.age >= self.retirement_age
    }

    /// Whole years until retirement (0 once retired)
    pub fn years_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.age)
    }

    /// Attained age at a projection month (0-indexed); ages step every 12 months
    pub fn attained_age(&self, projection_month: usize) -> u32 {
        self.age + (projection_month / 12) as u32
    }

    /// Annual salary including extra payments
    pub fn annual_salary(&self) -> f64 {
        self.salary * self.salary_payments_per_year as f64
    }

    /// Effective CD accumulation rate
    pub fn effective_accumulation_rate(&self) -> f64 {
        self.accumulation_rate.unwrap_or(self.discount_rate)
    }

    /// Effective CD conversion rate
    pub fn effective_conversion_rate(&self) -> f64 {
        self.conversion_rate.unwrap_or(self.discount_rate)
    }
}
