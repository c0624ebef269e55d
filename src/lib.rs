//! Pension Valuation - Actuarial engine for individual pension plans
//!
//! This library provides:
//! - Monthly cash-flow projections for defined benefit (BD) and defined contribution (CD) plans
//! - BD reserves (RMBA, RMBC) and normal cost under PUC and EAN
//! - CD balance-to-income conversion and expected benefit duration
//! - Survivor and disability add-ons
//! - Sensitivity sweeps and a root-finding solver for break-even parameters

pub mod assumptions;
pub mod config;
pub mod engine;
pub mod error;
pub mod income;
pub mod multi_life;
pub mod participant;
pub mod present_value;
pub mod projection;
pub mod reserves;
pub mod results;
pub mod scenario;
pub mod validation;

// Re-export commonly used types
pub use assumptions::{MortalityCache, MortalityProvider, MortalityVector, TableRegistry};
pub use config::EngineConfig;
pub use engine::ValuationEngine;
pub use error::{EngineResult, ValuationError};
pub use participant::{BenefitTarget, CalculationMethod, CdConversionMode, Gender, ParticipantState, PlanType};
pub use projection::{ActuarialContext, CashFlowProjector, ProjectionSeries};
pub use results::ValuationResult;
pub use scenario::{SolveFor, SolverReport};
