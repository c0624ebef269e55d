//! Load participant snapshots from JSON files or a flat CSV batch

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::Reader;

use super::{
    BenefitTarget, CalculationMethod, CdConversionMode, Gender, ParticipantState, PaymentTiming,
    PlanType,
};
use crate::error::{EngineResult, ValuationError};

/// Raw CSV row for batch valuation files
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Gender")]
    gender: String,
    #[serde(rename = "PlanType")]
    plan_type: String,
    #[serde(rename = "Salary")]
    salary: f64,
    #[serde(rename = "InitialBalance", default)]
    initial_balance: f64,
    #[serde(rename = "ContributionRate", default)]
    contribution_rate: f64,
    #[serde(rename = "TargetMode")]
    target_mode: String,
    #[serde(rename = "TargetValue")]
    target_value: f64,
    #[serde(rename = "RetirementAge")]
    retirement_age: u32,
    #[serde(rename = "MortalityTable")]
    mortality_table: String,
    #[serde(rename = "Aggravation", default)]
    aggravation: f64,
    #[serde(rename = "DiscountRate")]
    discount_rate: f64,
    #[serde(rename = "SalaryGrowth", default)]
    salary_growth: f64,
    #[serde(rename = "AdminFee", default)]
    admin_fee: f64,
    #[serde(rename = "LoadingFee", default)]
    loading_fee: f64,
    #[serde(rename = "Timing")]
    timing: String,
    #[serde(rename = "SalaryPPY")]
    salary_ppy: u32,
    #[serde(rename = "BenefitPPY")]
    benefit_ppy: u32,
    #[serde(rename = "ProjectionYears")]
    projection_years: u32,
    #[serde(rename = "Method")]
    method: String,
    #[serde(rename = "CdMode", default)]
    cd_mode: String,
    #[serde(rename = "CdParam", default)]
    cd_param: f64,
}

impl CsvRow {
    fn to_participant(self, line: usize) -> EngineResult<ParticipantState> {
        let field = |name: &str| format!("row {}: {}", line, name);

        let gender = match self.gender.as_str() {
            "M" | "Male" => Gender::Male,
            "F" | "Female" => Gender::Female,
            other => return Err(ValuationError::invalid(field("Gender"), format!("unknown value {}", other))),
        };

        let plan_type = match self.plan_type.as_str() {
            "BD" => PlanType::Bd,
            "CD" => PlanType::Cd,
            other => return Err(ValuationError::invalid(field("PlanType"), format!("unknown value {}", other))),
        };

        let benefit_target = match self.target_mode.as_str() {
            "VALUE" => BenefitTarget::Value(self.target_value),
            "REPLACEMENT_RATE" => BenefitTarget::ReplacementRate(self.target_value),
            other => return Err(ValuationError::invalid(field("TargetMode"), format!("unknown value {}", other))),
        };

        let payment_timing = match self.timing.as_str() {
            "ARREARS" => PaymentTiming::Arrears,
            "ADVANCE" => PaymentTiming::Advance,
            other => return Err(ValuationError::invalid(field("Timing"), format!("unknown value {}", other))),
        };

        let calculation_method = match self.method.as_str() {
            "PUC" => CalculationMethod::Puc,
            "EAN" => CalculationMethod::Ean,
            other => return Err(ValuationError::invalid(field("Method"), format!("unknown value {}", other))),
        };

        let cd_conversion_mode = match self.cd_mode.as_str() {
            "" | "ACTUARIAL" => CdConversionMode::Actuarial,
            "ACTUARIAL_EQUIVALENT" => CdConversionMode::ActuarialEquivalent,
            "CERTAIN" => CdConversionMode::Certain { years: self.cd_param as u32 },
            "PERCENTAGE" => CdConversionMode::Percentage { annual_pct: self.cd_param },
            "PROGRAMMED" => CdConversionMode::Programmed { years: self.cd_param as u32 },
            other => return Err(ValuationError::invalid(field("CdMode"), format!("unknown value {}", other))),
        };

        let mut state = ParticipantState::new_bd(
            self.age,
            gender,
            self.salary,
            self.retirement_age,
            benefit_target,
            self.discount_rate,
        );
        state.plan_type = plan_type;
        state.initial_balance = self.initial_balance;
        state.contribution_rate = self.contribution_rate;
        state.mortality_table = self.mortality_table;
        state.mortality_aggravation = self.aggravation;
        state.salary_growth_rate = self.salary_growth;
        state.admin_fee_rate = self.admin_fee;
        state.loading_fee_rate = self.loading_fee;
        state.payment_timing = payment_timing;
        state.salary_payments_per_year = self.salary_ppy;
        state.benefit_payments_per_year = self.benefit_ppy;
        state.projection_years = self.projection_years;
        state.calculation_method = calculation_method;
        state.cd_conversion_mode = cd_conversion_mode;

        Ok(state)
    }
}

/// Load a single participant from a JSON file
pub fn load_participant(path: &Path) -> EngineResult<ParticipantState> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Load a JSON array of participants
pub fn load_participants_json(path: &Path) -> EngineResult<Vec<ParticipantState>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Load participants from a CSV batch file
pub fn load_participants_csv(path: &Path) -> EngineResult<Vec<ParticipantState>> {
    let file = File::open(path)?;
    load_participants_from_reader(file)
}

/// Load participants from any CSV reader
pub fn load_participants_from_reader<R: Read>(reader: R) -> EngineResult<Vec<ParticipantState>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut participants = Vec::new();

    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result?;
        participants.push(row.to_participant(idx + 1)?);
    }

    log::info!("Loaded {} participants from CSV", participants.len());
    Ok(participants)
}
