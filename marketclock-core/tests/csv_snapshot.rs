//! Integration tests for snapshot loading and the directory data source.
//!
//! Tests:
//! 1. Fixture snapshot: table counts, access level, coverage list
//! 2. Access levels derived from the files present
//! 2b. Currency tables and their holidays
//! 3. Row errors name the file and line
//! 4. Version identifier stability and change detection

use std::fs;
use std::path::Path;

use marketclock_core::data::{DataSource, DirectorySource};
use chrono::NaiveDate;

use marketclock_core::domain::{CurrencyCode, FinId, Mic};
use marketclock_core::store::{AccessLevel, CsvStore, ReferenceStore};
use marketclock_core::{Engine, MarketClockError};

const MARKETS: &str = "\
FinID,Exchange Name,Timezone,MIC
XX.TEST,Test Exchange,Europe/Berlin,XTST
";

const HOLIDAYS: &str = "\
FinID,Date,Holiday Name,Schedule,Settlement,Observed,Status
XX.TEST,2024-01-01,New Year,Closed,No,,Closed
XX.TEST,2024-12-25,Christmas,Closed,No,,Closed
";

const SCHEDULES: &str = "\
FinID,Schedule Group,Timezone,Phase Type,Days,Start,End,Offset Days
XX.TEST,Regular,Europe/Berlin,Primary Trading Session,Mon-Fri,09:00,17:30,0
";

const PHASES: &str = "\
Name,Status,Settlement,Closing Price
Primary Trading Session,Open,Yes,Yes
";

const CURRENCIES: &str = "\
Currency Code,Currency Name,Country Code,Central Bank,Financial Capital,Financial Capital Timezone,Weekend Definition
EUR,Euro,,European Central Bank,Frankfurt,Europe/Berlin,Sat-Sun
USD,US Dollar,US,Federal Reserve,New York,America/New_York,Sat-Sun
";

const CURRENCY_HOLIDAYS: &str = "\
Currency Code,Date,Holiday Name,Settlement,Observed,Memo
EUR,2023-12-25,Christmas Day,No,,
EUR,2023-12-26,St. Stephen's Day,No,,
USD,2023-07-04,Independence Day,No,OBS,
EUR,2024-01-01,New Year's Day,No,,
";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn full_snapshot(dir: &Path) {
    write(dir, "markets.csv", MARKETS);
    write(dir, "holidays.csv", HOLIDAYS);
    write(dir, "schedules.csv", SCHEDULES);
    write(dir, "phases.csv", PHASES);
}

fn fin(id: &str) -> FinId {
    FinId::parse(id).unwrap()
}

fn code(raw: &str) -> CurrencyCode {
    CurrencyCode::parse(raw).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ── 1. Fixture snapshot ──────────────────────────────────────────────

#[test]
fn fixture_snapshot_loads_every_table() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/snapshot");
    let store = CsvStore::open(&dir).unwrap();
    let memory = store.memory();
    assert_eq!(memory.market_count(), 4);
    assert_eq!(memory.rule_count(), 12);
    assert_eq!(memory.holiday_count(), 13);
    assert_eq!(memory.season_count(), 4);
    assert_eq!(store.phase_catalog().unwrap().len(), 5);
    // No currencies table ships with the fixture.
    assert_eq!(store.access_level(), AccessLevel::NoCurrencies);

    assert!(store.is_covered(&fin("US.NASDAQ")));
    assert!(!store.is_covered(&fin("ZZ.NOWHERE")));

    let nyse = store.market(&fin("us.nyse")).unwrap();
    assert_eq!(nyse.country_code(), "US");
    assert_eq!(nyse.timezone, chrono_tz::America::New_York);
    let old = store.market(&fin("US.OLDX")).unwrap();
    assert!(old.is_replaced());
    assert!(old.permanently_closed.is_some());

    let holidays = store
        .holiday_overrides(
            &fin("US.NYSE"),
            chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap();
    let new_year = holidays.values().next().unwrap();
    assert!(new_year.observed);
    assert!(!new_year.has_settlement());
}

#[test]
fn flat_layout_without_coverage_list() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    let store = CsvStore::open(tmp.path()).unwrap();
    assert!(store.is_covered(&fin("XX.TEST")));
    assert!(matches!(
        store.market(&fin("XX.OTHER")),
        Err(MarketClockError::NotCovered(_))
    ));
    assert_eq!(
        store.market_by_mic(&Mic::parse("XTST").unwrap()).unwrap(),
        fin("XX.TEST")
    );

    let engine = Engine::with_defaults(&store);
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    let phases = engine.phases_for("XX.TEST", day, day).unwrap();
    assert_eq!(phases.len(), 1);
    assert_eq!(phases[0].timezone(), chrono_tz::Europe::Berlin);
}

// ── 2. Access levels ─────────────────────────────────────────────────

#[test]
fn holidays_only_snapshot_denies_phase_generation() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "markets.csv", MARKETS);
    write(tmp.path(), "holidays.csv", HOLIDAYS);
    let store = CsvStore::open(tmp.path()).unwrap();
    assert_eq!(store.access_level(), AccessLevel::OnlyHolidays);

    let engine = Engine::with_defaults(&store);
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    let err = engine.phases_for("XX.TEST", day, day).unwrap_err();
    assert!(matches!(err, MarketClockError::NoAccess(_)), "got {err}");
    assert!(err.is_access_error());

    // Holiday data stays readable.
    assert_eq!(
        store
            .holiday_overrides(
                &fin("XX.TEST"),
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            )
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn currencies_table_grants_full_access() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(tmp.path(), "currencies.csv", "Currency Code,Currency Name\nEUR,Euro\n");
    let store = CsvStore::open(tmp.path()).unwrap();
    assert_eq!(store.access_level(), AccessLevel::Full);
}

// ── 2b. Currencies ───────────────────────────────────────────────────

#[test]
fn currency_tables_load_and_filter_by_range() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(tmp.path(), "currencies.csv", CURRENCIES);
    write(tmp.path(), "currency-holidays.csv", CURRENCY_HOLIDAYS);
    let store = CsvStore::open(tmp.path()).unwrap();
    assert_eq!(store.memory().currency_count(), 2);
    assert_eq!(store.memory().currency_holiday_count(), 4);

    let codes: Vec<String> = store
        .list_currencies()
        .unwrap()
        .into_iter()
        .map(|c| c.code.to_string())
        .collect();
    assert_eq!(codes, vec!["EUR", "USD"]);

    let eur = store.currency(&code("eur")).unwrap();
    assert_eq!(eur.central_bank.as_deref(), Some("European Central Bank"));
    assert_eq!(eur.financial_capital_timezone, Some(chrono_tz::Europe::Berlin));
    assert_eq!(eur.country_code, None);

    let names: Vec<String> = store
        .currency_holidays(&code("EUR"), d(2023, 12, 26), d(2024, 1, 1))
        .unwrap()
        .into_iter()
        .map(|h| h.holiday_name)
        .collect();
    assert_eq!(names, vec!["St. Stephen's Day", "New Year's Day"]);

    let usd = store
        .currency_holidays(&code("USD"), d(2023, 1, 1), d(2023, 12, 31))
        .unwrap();
    assert_eq!(usd.len(), 1);
    assert!(usd[0].observed);

    assert!(store.is_currency_covered(&code("USD")));
    assert!(!store.is_currency_covered(&code("JPY")));
    assert!(matches!(
        store.currency(&code("JPY")),
        Err(MarketClockError::NotCovered(_))
    ));
}

#[test]
fn snapshot_without_currencies_denies_currency_reads() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(tmp.path(), "currency-holidays.csv", CURRENCY_HOLIDAYS);
    let store = CsvStore::open(tmp.path()).unwrap();
    assert_eq!(store.access_level(), AccessLevel::NoCurrencies);
    assert!(matches!(
        store.list_currencies(),
        Err(MarketClockError::NoAccess(what)) if what == "currency data"
    ));
    assert!(matches!(
        store.currency_holidays(&code("EUR"), d(2023, 1, 1), d(2023, 12, 31)),
        Err(MarketClockError::NoAccess(_))
    ));
    // Market data stays readable.
    assert!(store.schedule_rules(&fin("XX.TEST")).is_ok());
}

#[test]
fn duplicate_currency_holiday_names_file_and_line() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(tmp.path(), "currencies.csv", CURRENCIES);
    let duplicated = format!("{CURRENCY_HOLIDAYS}EUR,2023-12-25,Christmas Again,No,,\n");
    write(tmp.path(), "currency-holidays.csv", &duplicated);
    let err = CsvStore::open(tmp.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("currency-holidays.csv:6"), "got {msg}");
    assert!(msg.contains("duplicate currency holiday"), "got {msg}");
}

#[test]
fn coverage_list_marks_unshipped_markets() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(
        tmp.path(),
        "covered_markets.json",
        r#"[{"fin_id": "XX.TEST"}, {"fin_id": "XX.PAID"}]"#,
    );
    let store = CsvStore::open(tmp.path()).unwrap();
    assert!(matches!(
        store.market(&fin("XX.PAID")),
        Err(MarketClockError::NoAccess(_))
    ));
    assert!(matches!(
        store.market(&fin("XX.FREE")),
        Err(MarketClockError::NotCovered(_))
    ));
}

// ── 3. Row errors ────────────────────────────────────────────────────

#[test]
fn duplicate_holiday_names_file_and_line() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    let duplicated = format!("{HOLIDAYS}XX.TEST,2024-12-25,Christmas Again,Closed,No,,Closed\n");
    write(tmp.path(), "holidays.csv", &duplicated);
    let err = CsvStore::open(tmp.path()).unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, MarketClockError::InvalidArgument(_)));
    assert!(msg.contains("holidays.csv:4"), "got {msg}");
    assert!(msg.contains("duplicate holiday"), "got {msg}");
}

#[test]
fn negative_duration_rule_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(
        tmp.path(),
        "schedules.csv",
        "FinID,Schedule Group,Timezone,Phase Type,Days,Start,End,Offset Days\n\
         XX.TEST,Regular,Europe/Berlin,Primary Trading Session,Mon-Fri,17:30,09:00,0\n",
    );
    let err = CsvStore::open(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("schedules.csv:2"), "got {err}");
}

#[test]
fn unknown_timezone_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(
        tmp.path(),
        "markets.csv",
        "FinID,Exchange Name,Timezone\nXX.TEST,Test Exchange,Mars/Olympus\n",
    );
    let err = CsvStore::open(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("Mars/Olympus"), "got {err}");
}

#[test]
fn missing_required_table_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "markets.csv", MARKETS);
    assert!(matches!(
        CsvStore::open(tmp.path()),
        Err(MarketClockError::Io { .. })
    ));
}

#[test]
fn offset_beyond_lookback_rejected_at_query_time() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    write(
        tmp.path(),
        "schedules.csv",
        "FinID,Schedule Group,Timezone,Phase Type,Days,Start,End,Offset Days\n\
         XX.TEST,Regular,Europe/Berlin,Primary Trading Session,Fri,18:00,06:00,3\n",
    );
    let store = CsvStore::open(tmp.path()).unwrap();
    let engine = Engine::with_defaults(&store);
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    assert!(matches!(
        engine.phases_for("XX.TEST", day, day),
        Err(MarketClockError::InvalidArgument(_))
    ));
}

// ── 4. Versions ──────────────────────────────────────────────────────

#[test]
fn version_is_stable_until_content_changes() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    let source = DirectorySource::new(tmp.path());

    let first = source.version().unwrap().unwrap();
    assert_eq!(first.len(), 64);
    assert_eq!(source.version().unwrap().unwrap(), first);
    assert_eq!(
        source.check_for_changes(Some(&first)).unwrap(),
        (false, Some(first.clone()))
    );

    write(tmp.path(), "phases.csv", &format!("{PHASES}Pre-Open,Closed,No,No\n"));
    let (changed, second) = source.check_for_changes(Some(&first)).unwrap();
    assert!(changed);
    assert_ne!(second.unwrap(), first);
}

#[test]
fn snapshot_carries_version_and_store() {
    let tmp = tempfile::tempdir().unwrap();
    full_snapshot(tmp.path());
    let source = DirectorySource::new(tmp.path());
    let snapshot = source.snapshot().unwrap();
    assert_eq!(snapshot.version, source.version().unwrap());
    assert_eq!(snapshot.access_level(), AccessLevel::NoCurrencies);
    assert_eq!(snapshot.store.dir(), tmp.path());
}
