//! Command-line boundary for the conflict engine.
//!
//! Every subcommand except `convert` reads one JSON document from stdin and
//! writes pretty JSON to stdout. Diagnostics go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use conflict_engine::{
    describe, detect_conflicts, parse_instant, resolve, Appointment, BusinessHours, Conflict,
    EngineConfig, Interval, ResolutionError, ResolutionStrategy, SlotFinder, TimeOfDayRange,
    WeeklyAvailabilityPattern, ZoneId,
};

/// Detect, suggest around, and resolve appointment conflicts.
#[derive(Parser, Debug)]
#[command(name = "conflict-engine")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a JSON engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect conflicts of a candidate appointment (stdin: {candidate, existing, horizon?})
    Check,
    /// Suggest alternative slots (stdin: {desired, duration_minutes, busy, ...})
    Suggest,
    /// Apply a resolution strategy (stdin: {conflict, strategy})
    Resolve,
    /// Show an instant in a timezone
    Convert {
        /// RFC 3339 instant, e.g. 2026-03-02T15:00:00Z
        #[arg(short, long)]
        instant: String,
        /// IANA timezone (defaults to the configured zone)
        #[arg(short, long)]
        zone: Option<String>,
    },
}

#[derive(Deserialize)]
struct CheckInput {
    candidate: Appointment,
    #[serde(default)]
    existing: Vec<Appointment>,
    #[serde(default)]
    horizon: Option<Interval>,
}

#[derive(Deserialize)]
struct SuggestInput {
    desired: Interval,
    /// Defaults to the desired interval's length.
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    busy: Vec<Interval>,
    #[serde(default)]
    zone: Option<ZoneId>,
    #[serde(default)]
    business_hours: Option<TimeOfDayRange>,
    #[serde(default)]
    availability: Option<WeeklyAvailabilityPattern>,
    /// Flat `start_<weekday>_<n>` / `end_<weekday>_<n>` columns.
    #[serde(default)]
    legacy_availability: Option<Map<String, Value>>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    5
}

#[derive(Deserialize)]
struct ResolveInput {
    conflict: Conflict,
    strategy: ResolutionStrategy,
}

#[derive(Serialize)]
struct ResolutionFailure {
    error: &'static str,
    message: String,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match args.command {
        Command::Check => check(&config),
        Command::Suggest => suggest(&config),
        Command::Resolve => resolve_command(),
        Command::Convert { instant, zone } => convert(&config, &instant, zone.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("conflict_engine=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    EngineConfig::from_json_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn read_stdin<T: DeserializeOwned>() -> Result<T> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    serde_json::from_str(&text).context("invalid JSON input")
}

fn print_json<T: Serialize>(value: &T) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

fn check(config: &EngineConfig) -> Result<ExitCode> {
    let input: CheckInput = read_stdin()?;
    let mut options = config.detection();
    options.horizon = input.horizon;
    let conflicts = detect_conflicts(&input.candidate, &input.existing, &options)
        .context("conflict detection failed")?;
    print_json(&conflicts)
}

fn suggest(config: &EngineConfig) -> Result<ExitCode> {
    let input: SuggestInput = read_stdin()?;

    let zone = match input.zone {
        Some(zone) => zone,
        None => config.default_zone()?,
    };
    let duration = match input.duration_minutes {
        Some(minutes) => Duration::minutes(i64::from(minutes)),
        None => input.desired.duration(),
    };
    let hours = business_hours(
        input.business_hours,
        input.availability,
        input.legacy_availability,
    )?;

    let slots: Vec<Interval> = SlotFinder::new(config.slot_finder())
        .find(
            &input.desired,
            duration,
            &input.busy,
            zone,
            hours,
            input.max_results,
        )
        .collect();
    print_json(&slots)
}

fn business_hours(
    daily: Option<TimeOfDayRange>,
    weekly: Option<WeeklyAvailabilityPattern>,
    legacy: Option<Map<String, Value>>,
) -> Result<BusinessHours> {
    match (daily, weekly, legacy) {
        (Some(daily), None, None) => Ok(BusinessHours::Daily(daily)),
        (None, Some(weekly), None) => Ok(BusinessHours::Weekly(weekly)),
        (None, None, Some(legacy)) => Ok(BusinessHours::Weekly(
            WeeklyAvailabilityPattern::from_legacy_columns(&legacy)
                .context("invalid legacy availability")?,
        )),
        (None, None, None) => anyhow::bail!(
            "one of business_hours, availability or legacy_availability is required"
        ),
        _ => anyhow::bail!(
            "business_hours, availability and legacy_availability are mutually exclusive"
        ),
    }
}

fn resolve_command() -> Result<ExitCode> {
    let input: ResolveInput = read_stdin()?;
    match resolve(&input.conflict, input.strategy) {
        Ok(appointments) => print_json(&appointments),
        Err(err) => {
            print_json(&ResolutionFailure {
                error: error_code(&err),
                message: err.to_string(),
            })?;
            Ok(ExitCode::from(2))
        }
    }
}

fn error_code(err: &ResolutionError) -> &'static str {
    match err {
        ResolutionError::StillConflicting(_) => "still_conflicting",
        ResolutionError::InvalidShorten(_) => "invalid_shorten",
        ResolutionError::InvalidSplit(_) => "invalid_split",
        ResolutionError::StrategyNotAllowedForRelation { .. } => "strategy_not_allowed",
    }
}

fn convert(config: &EngineConfig, instant: &str, zone: Option<&str>) -> Result<ExitCode> {
    let instant = parse_instant(instant)?;
    let zone = match zone {
        Some(name) => ZoneId::parse(name)?,
        None => config.default_zone()?,
    };
    print_json(&describe(instant, zone))
}
