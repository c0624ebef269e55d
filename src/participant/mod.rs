//! Participant data structures and input loading

mod data;
pub mod loader;

pub use data::{
    BenefitTarget, CalculationMethod, CdConversionMode, Dependent, DependentKind, Gender,
    ParticipantState, PaymentTiming, PlanType,
};
pub use loader::{load_participant, load_participants_csv, load_participants_json};
