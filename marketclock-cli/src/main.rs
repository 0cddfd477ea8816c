//! MarketClock CLI: trading phases, market status and snapshot inspection.
//!
//! Commands:
//! - `phases`: list the trading phases of a market between two dates
//! - `status`: open/closed status of one or more markets at an instant
//! - `markets`: list markets, optionally filtered by a fin id pattern
//! - `currencies`: list currencies, or one currency's holidays in a range
//! - `info`: snapshot directory, version, access level and table sizes
//!
//! Exit codes: 0 on success, 1 for data and query errors, 2 for anything
//! else (bad arguments, unreadable config).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};

use marketclock_core::data::{DataSource, DirectorySource, Snapshot};
use marketclock_core::domain::{ConcretePhase, CurrencyCode, MarketStatus};
use marketclock_core::store::ReferenceStore;
use marketclock_core::{Engine, MarketClockError, Settings};

const DATA_DIR_ENV: &str = "MARKETCLOCK_DATA_DIR";

#[derive(Parser)]
#[command(
    name = "marketclock",
    about = "MarketClock CLI: trading phases and market status from reference data"
)]
struct Cli {
    /// Settings file (TOML). Defaults to the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot directory. Overrides the environment and settings file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// More log output (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List trading phases between two dates (inclusive).
    Phases {
        /// Fin id (e.g. US.NYSE) or MIC (e.g. XNYS).
        market: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD). Defaults to the start date.
        #[arg(long)]
        end: Option<String>,
    },
    /// Market status at an instant.
    Status {
        /// One or more fin ids or MICs.
        #[arg(required = true)]
        markets: Vec<String>,

        /// Instant (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// List markets in the snapshot.
    Markets {
        /// Fin id pattern, `*` matches any run of characters (e.g. US.*).
        pattern: Option<String>,
    },
    /// List currencies, or the holidays of one currency.
    Currencies {
        /// ISO 4217 code (e.g. EUR). Omit to list every currency.
        code: Option<String>,

        /// First holiday date (YYYY-MM-DD). Defaults to today.
        #[arg(long, requires = "code")]
        start: Option<String>,

        /// Last holiday date (YYYY-MM-DD). Defaults to a year after the start.
        #[arg(long, requires = "code")]
        end: Option<String>,
    },
    /// Describe the loaded snapshot.
    Info {
        /// Previously seen version; reports whether the data changed since.
        #[arg(long)]
        since: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<MarketClockError>().is_some() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let data_dir = resolve_data_dir(cli.data_dir, &settings)?;
    debug!(dir = %data_dir.display(), "using snapshot directory");
    let source = DirectorySource::new(&data_dir);

    match cli.command {
        Commands::Phases { market, start, end } => {
            let snapshot = source.snapshot()?;
            let engine = Engine::new(&snapshot.store, settings.engine);
            run_phases(&engine, &market, &start, end.as_deref(), cli.json)
        }
        Commands::Status { markets, at } => {
            let snapshot = source.snapshot()?;
            let engine = Engine::new(&snapshot.store, settings.engine);
            run_status(&engine, &markets, at.as_deref(), cli.json)
        }
        Commands::Markets { pattern } => {
            let snapshot = source.snapshot()?;
            run_markets(&snapshot, pattern.as_deref(), cli.json)
        }
        Commands::Currencies { code, start, end } => {
            let snapshot = source.snapshot()?;
            match code {
                Some(code) => run_currency_holidays(
                    &snapshot,
                    &code,
                    start.as_deref(),
                    end.as_deref(),
                    cli.json,
                ),
                None => run_currencies(&snapshot, cli.json),
            }
        }
        Commands::Info { since } => run_info(&source, since.as_deref(), cli.json),
    }
}

// ── Settings ─────────────────────────────────────────────────────────

fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()));
    }
    let default = dirs::config_dir().map(|d| d.join("marketclock").join("config.toml"));
    match default {
        Some(path) if path.is_file() => Settings::from_file(&path)
            .with_context(|| format!("loading settings from {}", path.display())),
        _ => Ok(Settings::default()),
    }
}

/// Flag, then environment, then settings file, then the user data directory.
fn resolve_data_dir(flag: Option<PathBuf>, settings: &Settings) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &settings.data.dir {
        return Ok(dir.clone());
    }
    match dirs::data_dir() {
        Some(dir) => Ok(dir.join("marketclock")),
        None => bail!("no snapshot directory: pass --data-dir or set {DATA_DIR_ENV}"),
    }
}

// ── Commands ─────────────────────────────────────────────────────────

fn run_phases<S: ReferenceStore + ?Sized>(
    engine: &Engine<'_, S>,
    market: &str,
    start: &str,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let start = parse_date(start)?;
    let end = end.map(parse_date).transpose()?.unwrap_or(start);
    let phases = engine.phases_for(market, start, end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&phases)?);
        return Ok(());
    }
    if phases.is_empty() {
        println!("No phases for {market} between {start} and {end}.");
        return Ok(());
    }
    println!(
        "{:<26} {:<26} {:<7} {:<4} {}",
        "Start", "End", "Status", "Stl", "Phase"
    );
    println!("{}", "-".repeat(90));
    for phase in &phases {
        print_phase(phase);
    }
    Ok(())
}

fn print_phase(phase: &ConcretePhase) {
    println!(
        "{:<26} {:<26} {:<7} {:<4} {}",
        phase.start.format("%Y-%m-%d %H:%M %Z").to_string(),
        phase.end.format("%Y-%m-%d %H:%M %Z").to_string(),
        phase.status.to_string(),
        if phase.has_settlement() { "yes" } else { "" },
        phase.display_name()
    );
}

fn run_status<S: ReferenceStore + ?Sized>(
    engine: &Engine<'_, S>,
    markets: &[String],
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let instant: DateTime<FixedOffset> = match at {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid instant '{text}', expected RFC 3339"))?,
        None => Utc::now().fixed_offset(),
    };

    let results: Vec<(&String, marketclock_core::Result<MarketStatus>)> = markets
        .par_iter()
        .map(|m| (m, engine.status(m, &instant)))
        .collect();

    let mut statuses = Vec::new();
    let mut first_error = None;
    for (market, result) in results {
        match result {
            Ok(status) => statuses.push(status),
            Err(err) => {
                warn!(%market, error = %err, "status failed");
                eprintln!("{market}: {err}");
                first_error.get_or_insert(err);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        for status in &statuses {
            print_status(status);
        }
    }
    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn print_status(status: &MarketStatus) {
    println!("=== {} ===", status.fin_id);
    println!("Status:     {}", status.status);
    if let Some(reason) = &status.reason {
        println!("Reason:     {reason}");
    }
    println!("Until:      {}", status.until.format("%Y-%m-%d %H:%M %Z"));
    match &status.next_bell {
        Some(bell) => println!("Next bell:  {}", bell.format("%Y-%m-%d %H:%M %Z")),
        None => println!("Next bell:  (none within horizon)"),
    }
    println!();
}

fn run_markets(snapshot: &Snapshot, pattern: Option<&str>, json: bool) -> Result<()> {
    let markets = snapshot.store.list_markets(pattern)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&markets)?);
        return Ok(());
    }
    if markets.is_empty() {
        println!("No markets match.");
        return Ok(());
    }
    println!(
        "{:<28} {:<6} {:<22} {}",
        "FinID", "MIC", "Timezone", "Exchange"
    );
    println!("{}", "-".repeat(80));
    for market in &markets {
        let mut exchange = market.exchange_name.clone();
        if let Some(next) = &market.replaced_by {
            exchange.push_str(&format!(" (replaced by {next})"));
        }
        println!(
            "{:<28} {:<6} {:<22} {}",
            market.fin_id.as_str(),
            market.mic.as_ref().map_or("", |m| m.as_str()),
            market.timezone.name(),
            exchange
        );
    }
    Ok(())
}

fn run_currencies(snapshot: &Snapshot, json: bool) -> Result<()> {
    let currencies = snapshot.store.list_currencies()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&currencies)?);
        return Ok(());
    }
    if currencies.is_empty() {
        println!("No currencies in snapshot.");
        return Ok(());
    }
    println!(
        "{:<5} {:<24} {:<20} {}",
        "Code", "Name", "Timezone", "Central bank"
    );
    println!("{}", "-".repeat(80));
    for currency in &currencies {
        println!(
            "{:<5} {:<24} {:<20} {}",
            currency.code.as_str(),
            currency.name,
            currency.financial_capital_timezone.map_or("", |tz| tz.name()),
            currency.central_bank.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn run_currency_holidays(
    snapshot: &Snapshot,
    code: &str,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let code = CurrencyCode::parse(code)?;
    let start = match start {
        Some(text) => parse_date(text)?,
        None => Utc::now().date_naive(),
    };
    let end = match end {
        Some(text) => parse_date(text)?,
        None => start + Duration::days(365),
    };
    let holidays = snapshot.store.currency_holidays(&code, start, end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&holidays)?);
        return Ok(());
    }
    if holidays.is_empty() {
        println!("No holidays for {code} between {start} and {end}.");
        return Ok(());
    }
    println!("{:<11} {:<4} {:<4} {}", "Date", "Stl", "Obs", "Holiday");
    println!("{}", "-".repeat(60));
    for holiday in &holidays {
        println!(
            "{:<11} {:<4} {:<4} {}",
            holiday.date.to_string(),
            if holiday.has_settlement() { "yes" } else { "" },
            if holiday.observed { "yes" } else { "" },
            holiday.holiday_name
        );
    }
    Ok(())
}

fn run_info(source: &DirectorySource, since: Option<&str>, json: bool) -> Result<()> {
    let snapshot = source.snapshot()?;
    let memory = snapshot.store.memory();
    let changed = since
        .map(|stored| source.check_for_changes(Some(stored)))
        .transpose()?
        .map(|(changed, _)| changed);

    if json {
        let info = serde_json::json!({
            "dir": source.dir().display().to_string(),
            "version": snapshot.version,
            "loaded_at": snapshot.loaded_at.to_rfc3339(),
            "access_level": snapshot.access_level().to_string(),
            "markets": memory.market_count(),
            "schedules": memory.rule_count(),
            "holidays": memory.holiday_count(),
            "seasons": memory.season_count(),
            "currencies": memory.currency_count(),
            "currency_holidays": memory.currency_holiday_count(),
            "changed": changed,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Snapshot:     {}", source.dir().display());
    println!(
        "Version:      {}",
        snapshot.version.as_deref().unwrap_or("(unknown)")
    );
    println!("Access level: {}", snapshot.access_level());
    println!("Markets:      {}", memory.market_count());
    println!("Schedules:    {}", memory.rule_count());
    println!("Holidays:     {}", memory.holiday_count());
    println!("Seasons:      {}", memory.season_count());
    println!("Currencies:   {}", memory.currency_count());
    if let Some(changed) = changed {
        println!(
            "Changed:      {}",
            if changed { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{text}', expected YYYY-MM-DD"))
}
