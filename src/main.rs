//! Pension valuation CLI
//!
//! # Usage
//!
//! ```bash
//! # Value one participant
//! pension-valuation value data/participants/bd_active.json
//!
//! # Value with the sensitivity sweep, as JSON
//! pension-valuation --format json sensitivity data/participants/bd_active.json
//!
//! # Contribution rate that funds the target benefit
//! pension-valuation solve data/participants/bd_active.json --for contribution-rate
//!
//! # Value a CSV block in parallel
//! pension-valuation batch data/participants/batch.csv
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use pension_valuation::assumptions::MortalityCache;
use pension_valuation::participant::{load_participant, load_participants_csv, load_participants_json};
use pension_valuation::projection::write_yearly_csv;
use pension_valuation::{EngineConfig, ParticipantState, SolveFor, TableRegistry, ValuationEngine, ValuationResult};

/// Pension valuation - reserves, income and break-even parameters for individual plans
#[derive(Parser)]
#[command(name = "pension-valuation")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Engine configuration (JSON); missing keys keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra mortality table as CODE=PATH (CSV with age,female,male columns)
    #[arg(long = "table", value_name = "CODE=PATH", global = true)]
    tables: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value one participant
    Value(ValueArgs),

    /// Value one participant and run the sensitivity sweep
    Sensitivity(ValueArgs),

    /// Solve for the parameter that zeroes the deficit/surplus
    Solve(SolveArgs),

    /// Value every participant in a JSON array or CSV file
    Batch(BatchArgs),
}

#[derive(Args)]
struct ValueArgs {
    /// Participant JSON file
    participant: PathBuf,

    /// Write the yearly roll-up to this CSV file
    #[arg(long)]
    yearly_csv: Option<PathBuf>,
}

#[derive(Args)]
struct SolveArgs {
    /// Participant JSON file
    participant: PathBuf,

    /// Parameter to solve for
    #[arg(long = "for", value_enum)]
    target: SolveTarget,
}

#[derive(Args)]
struct BatchArgs {
    /// Participants file (.json array or .csv)
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Table,
    /// JSON document
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolveTarget {
    Benefit,
    ContributionRate,
    RetirementAge,
    Salary,
}

impl From<SolveTarget> for SolveFor {
    fn from(target: SolveTarget) -> Self {
        match target {
            SolveTarget::Benefit => SolveFor::Benefit,
            SolveTarget::ContributionRate => SolveFor::ContributionRate,
            SolveTarget::RetirementAge => SolveFor::RetirementAge,
            SolveTarget::Salary => SolveFor::Salary,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_deref(), &cli.tables)?;

    match cli.command {
        Commands::Value(args) => {
            let state = load_participant(&args.participant)
                .with_context(|| format!("reading {}", args.participant.display()))?;
            let result = engine.valuate(&state)?;
            emit_result(&result, cli.format)?;
            export_yearly(&result, args.yearly_csv.as_deref())?;
        }
        Commands::Sensitivity(args) => {
            let state = load_participant(&args.participant)
                .with_context(|| format!("reading {}", args.participant.display()))?;
            let result = engine.valuate_with_sensitivity(&state)?;
            emit_result(&result, cli.format)?;
            if cli.format == OutputFormat::Table {
                print_sensitivity(&result);
            }
            export_yearly(&result, args.yearly_csv.as_deref())?;
        }
        Commands::Solve(args) => {
            let state = load_participant(&args.participant)
                .with_context(|| format!("reading {}", args.participant.display()))?;
            let report = engine.solve(&state, args.target.into())?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Table => {
                    println!("\n=== Solver ===");
                    println!("Parameter:   {:?}", report.parameter);
                    println!("Value:       {:.4}", report.value);
                    println!("Residual:    {:.2}", report.residual);
                    println!("Validated:   {}", report.validated);
                    println!("Strategy:    {:?} ({} iterations)", report.strategy, report.iterations);
                    println!("Evaluations: {} (memo hits {})", report.evaluations, report.memo_hits);
                }
            }
        }
        Commands::Batch(args) => run_batch(&engine, &args.input, cli.format)?,
    }

    Ok(())
}

fn build_engine(config_path: Option<&Path>, tables: &[String]) -> Result<ValuationEngine> {
    let config = match config_path {
        Some(path) => {
            EngineConfig::from_json_path(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if tables.is_empty() {
        return Ok(ValuationEngine::new(config));
    }

    let mut registry = TableRegistry::bundled();
    for arg in tables {
        let (code, path) = arg
            .split_once('=')
            .with_context(|| format!("table argument '{}' is not CODE=PATH", arg))?;
        registry
            .register_csv(code, Path::new(path))
            .with_context(|| format!("loading mortality table {}", path))?;
    }
    let provider = Arc::new(MortalityCache::with_settings(registry, &config.cache));
    Ok(ValuationEngine::with_provider(config, provider))
}

fn emit_result(result: &ValuationResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => result.print_summary(),
    }
    Ok(())
}

fn export_yearly(result: &ValuationResult, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_yearly_csv(&result.yearly, file)?;
        println!("\nYearly projection written to: {}", path.display());
    }
    Ok(())
}

fn print_sensitivity(result: &ValuationResult) {
    println!("\n=== Sensitivity ===");
    println!(
        "{:<22} {:>8} {:>16} {:>16} {:>14}",
        "Parameter", "Shock", "dReserve", "dDeficit", "dCost"
    );
    println!("{}", "-".repeat(80));
    for row in &result.sensitivity {
        println!(
            "{:<22} {:>+8.3} {:>16} {:>16} {:>14}",
            format!("{:?}", row.parameter),
            row.delta,
            fmt_opt(row.reserve_change),
            fmt_opt(row.deficit_surplus_change),
            fmt_opt(row.cost_change),
        );
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn load_batch(path: &Path) -> Result<Vec<ParticipantState>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let states = if is_csv {
        load_participants_csv(path)?
    } else {
        load_participants_json(path)?
    };
    Ok(states)
}

fn run_batch(engine: &ValuationEngine, input: &Path, format: OutputFormat) -> Result<()> {
    let start = Instant::now();
    let states = load_batch(input).with_context(|| format!("reading {}", input.display()))?;
    println!("Loaded {} participants in {:?}", states.len(), start.elapsed());

    let results = engine.valuate_batch(&states);
    println!("Valued {} participants in {:?}", results.len(), start.elapsed());

    let mut failures = 0;
    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = results
                .iter()
                .map(|r| match r {
                    Ok(result) => serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
                    Err(err) => serde_json::json!({ "error": err.to_string() }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            failures = results.iter().filter(|r| r.is_err()).count();
        }
        OutputFormat::Table => {
            println!(
                "{:>5} {:>4} {:>16} {:>16} {:>16} {:>10}",
                "Row", "Plan", "Reserve", "Deficit", "Income", "RR%"
            );
            println!("{}", "-".repeat(74));
            for (index, result) in results.iter().enumerate() {
                match result {
                    Ok(r) => println!(
                        "{:>5} {:>4} {:>16} {:>16} {:>16} {:>10}",
                        index,
                        format!("{:?}", r.plan_type),
                        fmt_opt(r.required_reserve().or(r.balance_at_retirement)),
                        fmt_opt(r.deficit_surplus),
                        fmt_opt(r.monthly_income.or(r.initial_benefit)),
                        fmt_opt(r.replacement_ratio),
                    ),
                    Err(err) => {
                        failures += 1;
                        println!("{:>5} ERROR {}", index, err);
                    }
                }
            }
        }
    }

    if failures > 0 {
        log::warn!("{} of {} participants failed validation", failures, results.len());
    }
    Ok(())
}
