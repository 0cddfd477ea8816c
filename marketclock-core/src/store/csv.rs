//! CSV snapshot directory loaded into a [`MemoryStore`].
//!
//! Layout (CSV files either at the top level or under `csv/`):
//! - `markets.csv`, `holidays.csv` (required)
//! - `schedules.csv`, `phases.csv`, `season-definitions.csv`,
//!   `mic-mapping.csv`, `currencies.csv`, `currency-holidays.csv` (optional)
//! - `covered_markets.json` (optional, list of `{"fin_id": ...}`)
//!
//! Headers are normalized before deserialization, empty cells become
//! `None`, and every row is mapped to its domain type field by field.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::access::AccessLevel;
use super::memory::MemoryStore;
use super::ReferenceStore;
use crate::domain::{
    Currency, CurrencyCode, CurrencyHoliday, FinId, HolidayOverride, Market, Mic, PhaseCatalog,
    PhaseStatus, PhaseTypeInfo, ScheduleRule, SeasonDefinition, WeekdaySet,
};
use crate::error::{MarketClockError, Result};

pub const MARKETS_FILE: &str = "markets.csv";
pub const HOLIDAYS_FILE: &str = "holidays.csv";
pub const SCHEDULES_FILE: &str = "schedules.csv";
pub const PHASES_FILE: &str = "phases.csv";
pub const SEASONS_FILE: &str = "season-definitions.csv";
pub const MIC_MAPPING_FILE: &str = "mic-mapping.csv";
pub const CURRENCIES_FILE: &str = "currencies.csv";
pub const CURRENCY_HOLIDAYS_FILE: &str = "currency-holidays.csv";
pub const COVERED_MARKETS_FILE: &str = "covered_markets.json";

/// Reference store backed by a snapshot directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
    inner: MemoryStore,
}

impl CsvStore {
    /// Load every table of the snapshot at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let csv_dir = csv_dir(&dir);
        let mut store = MemoryStore::new();

        let markets: Vec<MarketRow> = read_rows(&csv_dir.join(MARKETS_FILE))?;
        for (line, row) in markets.into_iter().enumerate() {
            let market = at_line(&csv_dir.join(MARKETS_FILE), line, row.into_market())?;
            store.insert_market(market);
        }

        let holidays_path = csv_dir.join(HOLIDAYS_FILE);
        let holidays: Vec<HolidayRow> = read_rows(&holidays_path)?;
        for (line, row) in holidays.into_iter().enumerate() {
            let holiday = at_line(&holidays_path, line, row.into_holiday())?;
            at_line(&holidays_path, line, store.insert_holiday(holiday))?;
        }

        let schedules_path = csv_dir.join(SCHEDULES_FILE);
        let has_schedules = schedules_path.is_file();
        if has_schedules {
            let rows: Vec<ScheduleRow> = read_rows(&schedules_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                let rule = at_line(&schedules_path, line, row.into_rule())?;
                at_line(&schedules_path, line, store.insert_rule(rule))?;
            }
        }

        let phases_path = csv_dir.join(PHASES_FILE);
        if phases_path.is_file() {
            let rows: Vec<PhaseRow> = read_rows(&phases_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                store.insert_phase_type(at_line(&phases_path, line, row.into_info())?);
            }
        }

        let seasons_path = csv_dir.join(SEASONS_FILE);
        if seasons_path.is_file() {
            let rows: Vec<SeasonRow> = read_rows(&seasons_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                let season = at_line(&seasons_path, line, row.into_definition())?;
                at_line(&seasons_path, line, store.insert_season(season))?;
            }
        }

        let mics_path = csv_dir.join(MIC_MAPPING_FILE);
        if mics_path.is_file() {
            let rows: Vec<MicRow> = read_rows(&mics_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                let (mic, fin_id) = at_line(&mics_path, line, row.into_pair())?;
                store.map_mic(mic, fin_id);
            }
        }

        let currencies_path = csv_dir.join(CURRENCIES_FILE);
        let has_currencies = currencies_path.is_file();
        if has_currencies {
            let rows: Vec<CurrencyRow> = read_rows(&currencies_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                store.insert_currency(at_line(&currencies_path, line, row.into_currency())?);
            }
        }

        let currency_holidays_path = csv_dir.join(CURRENCY_HOLIDAYS_FILE);
        if currency_holidays_path.is_file() {
            let rows: Vec<CurrencyHolidayRow> = read_rows(&currency_holidays_path)?;
            for (line, row) in rows.into_iter().enumerate() {
                let holiday = at_line(&currency_holidays_path, line, row.into_holiday())?;
                at_line(
                    &currency_holidays_path,
                    line,
                    store.insert_currency_holiday(holiday),
                )?;
            }
        }

        let covered_path = dir.join(COVERED_MARKETS_FILE);
        if covered_path.is_file() {
            store.set_covered(read_covered(&covered_path)?);
        }

        let access = AccessLevel::from_tables(has_schedules, has_currencies);
        store.set_access(access);

        info!(
            dir = %dir.display(),
            %access,
            markets = store.market_count(),
            schedules = store.rule_count(),
            holidays = store.holiday_count(),
            currencies = store.currency_count(),
            "loaded snapshot"
        );
        Ok(Self { dir, inner: store })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }
}

impl ReferenceStore for CsvStore {
    fn access_level(&self) -> AccessLevel {
        self.inner.access_level()
    }

    fn market(&self, fin_id: &FinId) -> Result<Market> {
        self.inner.market(fin_id)
    }

    fn market_by_mic(&self, mic: &Mic) -> Result<FinId> {
        self.inner.market_by_mic(mic)
    }

    fn list_markets(&self, pattern: Option<&str>) -> Result<Vec<Market>> {
        self.inner.list_markets(pattern)
    }

    fn schedule_rules(&self, fin_id: &FinId) -> Result<Vec<ScheduleRule>> {
        self.inner.schedule_rules(fin_id)
    }

    fn holiday_overrides(
        &self,
        fin_id: &FinId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, HolidayOverride>> {
        self.inner.holiday_overrides(fin_id, start, end)
    }

    fn season_date(&self, label: &str, year: i32) -> Result<NaiveDate> {
        self.inner.season_date(label, year)
    }

    fn phase_catalog(&self) -> Result<PhaseCatalog> {
        self.inner.phase_catalog()
    }

    fn available_date_range(&self, fin_id: &FinId) -> Result<(NaiveDate, NaiveDate)> {
        self.inner.available_date_range(fin_id)
    }

    fn is_covered(&self, fin_id: &FinId) -> bool {
        self.inner.is_covered(fin_id)
    }

    fn currency(&self, code: &CurrencyCode) -> Result<Currency> {
        self.inner.currency(code)
    }

    fn list_currencies(&self) -> Result<Vec<Currency>> {
        self.inner.list_currencies()
    }

    fn currency_holidays(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CurrencyHoliday>> {
        self.inner.currency_holidays(code, start, end)
    }

    fn is_currency_covered(&self, code: &CurrencyCode) -> bool {
        self.inner.is_currency_covered(code)
    }
}

/// Directory holding the CSV files: `dir/csv` when present, else `dir`.
pub fn csv_dir(dir: &Path) -> PathBuf {
    let nested = dir.join("csv");
    if nested.is_dir() {
        nested
    } else {
        dir.to_path_buf()
    }
}

// ── Reading ──────────────────────────────────────────────────────────

/// Normalize a header: lowercase, `finid` → `fin_id`, anything outside
/// `[a-z0-9_]` → `_`.
pub fn clean_header(raw: &str) -> String {
    let lowered = raw
        .trim_start_matches('\u{feff}')
        .trim()
        .replace('"', "")
        .to_lowercase()
        .replace("finid", "fin_id");
    lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|source| MarketClockError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .flexible(true)
        .from_reader(file);
    let headers: ::csv::StringRecord = reader.headers()?.iter().map(clean_header).collect();
    reader.set_headers(headers);

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, ::csv::Error>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read csv");
    Ok(rows)
}

fn read_covered(path: &Path) -> Result<Vec<FinId>> {
    #[derive(Deserialize)]
    struct Covered {
        fin_id: String,
    }

    let content = std::fs::read_to_string(path).map_err(|source| MarketClockError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<Covered> = serde_json::from_str(&content)?;
    entries.iter().map(|c| FinId::parse(&c.fin_id)).collect()
}

/// Attach file and line (1-based, header is line 1) to a row error.
fn at_line<T>(path: &Path, index: usize, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        MarketClockError::invalid(format!("{}:{}: {e}", path.display(), index + 2))
    })
}

// ── Field parsing ────────────────────────────────────────────────────

fn required(field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| MarketClockError::invalid(format!("missing value for '{field}'")))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| MarketClockError::invalid(format!("{field} '{value}': {e}")))
}

fn parse_opt_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    value.map(|v| parse_date(field, &v)).transpose()
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| MarketClockError::invalid(format!("{field} '{value}': {e}")))
}

fn parse_tz(value: &str) -> Result<Tz> {
    value
        .parse::<Tz>()
        .map_err(|e| MarketClockError::invalid(format!("unknown timezone '{value}': {e}")))
}

fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("yes"))
}

// ── Row types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MarketRow {
    fin_id: Option<String>,
    exchange_name: Option<String>,
    market_name: Option<String>,
    security_group: Option<String>,
    timezone: Option<String>,
    weekend_definition: Option<String>,
    mic: Option<String>,
    acronym: Option<String>,
    asset_type: Option<String>,
    memo: Option<String>,
    permanently_closed: Option<String>,
    replaced_by: Option<String>,
}

impl MarketRow {
    fn into_market(self) -> Result<Market> {
        Ok(Market {
            fin_id: FinId::parse(&required("fin_id", self.fin_id)?)?,
            exchange_name: self.exchange_name.unwrap_or_default(),
            market_name: self.market_name,
            security_group: self.security_group,
            timezone: parse_tz(&required("timezone", self.timezone)?)?,
            weekend_definition: self.weekend_definition,
            mic: self.mic.as_deref().map(Mic::parse).transpose()?,
            acronym: self.acronym,
            asset_type: self.asset_type,
            memo: self.memo,
            permanently_closed: parse_opt_date("permanently_closed", self.permanently_closed)?,
            replaced_by: self.replaced_by.as_deref().map(FinId::parse).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HolidayRow {
    fin_id: Option<String>,
    date: Option<String>,
    holiday_name: Option<String>,
    schedule: Option<String>,
    settlement: Option<String>,
    observed: Option<String>,
    memo: Option<String>,
    status: Option<String>,
}

impl HolidayRow {
    fn into_holiday(self) -> Result<HolidayOverride> {
        let status = match self.status.as_deref() {
            Some(s) => s.parse::<PhaseStatus>()?,
            None => PhaseStatus::Closed,
        };
        Ok(HolidayOverride {
            fin_id: FinId::parse(&required("fin_id", self.fin_id)?)?,
            date: parse_date("date", &required("date", self.date)?)?,
            holiday_name: self.holiday_name.unwrap_or_default(),
            schedule_group: required("schedule", self.schedule)?,
            settlement: is_yes(self.settlement.as_deref()),
            observed: self.observed.as_deref() == Some("OBS"),
            status,
            memo: self.memo,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    fin_id: Option<String>,
    schedule_group: Option<String>,
    schedule_group_memo: Option<String>,
    timezone: Option<String>,
    phase_type: Option<String>,
    phase_name: Option<String>,
    phase_memo: Option<String>,
    days: Option<String>,
    start: Option<String>,
    end: Option<String>,
    offset_days: Option<u32>,
    in_force_start_date: Option<String>,
    in_force_end_date: Option<String>,
    season_start: Option<String>,
    season_end: Option<String>,
}

impl ScheduleRow {
    fn into_rule(self) -> Result<ScheduleRule> {
        Ok(ScheduleRule {
            fin_id: FinId::parse(&required("fin_id", self.fin_id)?)?,
            schedule_group: required("schedule_group", self.schedule_group)?,
            schedule_group_memo: self.schedule_group_memo,
            timezone: parse_tz(&required("timezone", self.timezone)?)?,
            phase_type: required("phase_type", self.phase_type)?,
            phase_name: self.phase_name,
            phase_memo: self.phase_memo,
            days: WeekdaySet::parse(&required("days", self.days)?)?,
            start: parse_time("start", &required("start", self.start)?)?,
            end: parse_time("end", &required("end", self.end)?)?,
            offset_days: self.offset_days.unwrap_or(0),
            in_force_start_date: parse_opt_date("in_force_start_date", self.in_force_start_date)?,
            in_force_end_date: parse_opt_date("in_force_end_date", self.in_force_end_date)?,
            season_start: self.season_start,
            season_end: self.season_end,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PhaseRow {
    name: Option<String>,
    status: Option<String>,
    settlement: Option<String>,
    closing_price: Option<String>,
}

impl PhaseRow {
    fn into_info(self) -> Result<PhaseTypeInfo> {
        Ok(PhaseTypeInfo {
            name: required("name", self.name)?,
            status: required("status", self.status)?.parse()?,
            settlement: is_yes(self.settlement.as_deref()),
            closing_price: is_yes(self.closing_price.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SeasonRow {
    season: Option<String>,
    year: Option<i32>,
    date: Option<String>,
}

impl SeasonRow {
    fn into_definition(self) -> Result<SeasonDefinition> {
        Ok(SeasonDefinition {
            season: required("season", self.season)?,
            year: self
                .year
                .ok_or_else(|| MarketClockError::invalid("missing value for 'year'"))?,
            date: parse_date("date", &required("date", self.date)?)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MicRow {
    mic: Option<String>,
    fin_id: Option<String>,
}

impl MicRow {
    fn into_pair(self) -> Result<(Mic, FinId)> {
        Ok((
            Mic::parse(&required("mic", self.mic)?)?,
            FinId::parse(&required("fin_id", self.fin_id)?)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyRow {
    currency_code: Option<String>,
    currency_name: Option<String>,
    country_code: Option<String>,
    central_bank: Option<String>,
    financial_capital: Option<String>,
    financial_capital_timezone: Option<String>,
    weekend_definition: Option<String>,
}

impl CurrencyRow {
    fn into_currency(self) -> Result<Currency> {
        Ok(Currency {
            code: CurrencyCode::parse(&required("currency_code", self.currency_code)?)?,
            name: self.currency_name.unwrap_or_default(),
            country_code: self.country_code,
            central_bank: self.central_bank,
            financial_capital: self.financial_capital,
            financial_capital_timezone: self
                .financial_capital_timezone
                .as_deref()
                .map(parse_tz)
                .transpose()?,
            weekend_definition: self.weekend_definition,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyHolidayRow {
    currency_code: Option<String>,
    date: Option<String>,
    holiday_name: Option<String>,
    settlement: Option<String>,
    observed: Option<String>,
    memo: Option<String>,
}

impl CurrencyHolidayRow {
    fn into_holiday(self) -> Result<CurrencyHoliday> {
        Ok(CurrencyHoliday {
            currency_code: CurrencyCode::parse(&required("currency_code", self.currency_code)?)?,
            date: parse_date("date", &required("date", self.date)?)?,
            holiday_name: self.holiday_name.unwrap_or_default(),
            settlement: is_yes(self.settlement.as_deref()),
            observed: self.observed.as_deref() == Some("OBS"),
            memo: self.memo,
        })
    }
}
