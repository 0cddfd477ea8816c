//! Integration tests for point-in-time market status.
//!
//! Tests:
//! 1. Open session: until the next overlapping phase, bell at the close
//! 2. Half-open boundary: the closing instant belongs to the next phase
//! 3. Weekend and holiday gaps: reason, until and next bell
//! 4. Instants given in other timezones
//! 5. Independent queries in parallel

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::America::{Chicago, New_York};
use chrono_tz::Tz;
use rayon::prelude::*;
use std::path::PathBuf;

use marketclock_core::domain::PhaseStatus;
use marketclock_core::store::CsvStore;
use marketclock_core::{Engine, MarketClockError};

fn snapshot() -> CsvStore {
    CsvStore::open(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/snapshot"))
        .expect("fixture snapshot loads")
}

fn ny(m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    New_York.with_ymd_and_hms(2023, m, d, h, min, 0).unwrap()
}

// ── 1. Open session ──────────────────────────────────────────────────

#[test]
fn open_midday() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 15, 12, 0)).unwrap();
    assert!(status.is_open());
    assert_eq!(status.status, PhaseStatus::Open);
    assert_eq!(status.reason.as_deref(), Some("Primary Trading Session"));
    assert_eq!(status.until, ny(11, 15, 15, 50));
    assert_eq!(status.next_bell, Some(ny(11, 15, 16, 0)));
    assert_eq!(status.fin_id.as_str(), "US.NYSE");
}

#[test]
fn open_phase_wins_over_overlapping_closed_phase() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 15, 15, 55)).unwrap();
    assert!(status.is_open());
    assert_eq!(status.phase.unwrap().phase_type, "Primary Trading Session");
    assert_eq!(status.until, ny(11, 15, 16, 0));
}

#[test]
fn earliest_closed_phase_when_nothing_open() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 15, 7, 0)).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert_eq!(status.reason.as_deref(), Some("Pre-Trading Session"));
    assert_eq!(status.until, ny(11, 15, 9, 30));
    assert_eq!(status.next_bell, Some(ny(11, 15, 9, 30)));

    let early = engine.status("US.NYSE", &ny(11, 15, 5, 0)).unwrap();
    assert_eq!(early.until, ny(11, 15, 6, 30));
}

// ── 2. Half-open boundary ────────────────────────────────────────────

#[test]
fn closing_instant_reports_next_phase() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 15, 16, 0)).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert_eq!(status.reason.as_deref(), Some("Post-Trading Session"));
    assert_eq!(status.until, ny(11, 15, 20, 0));
    assert_eq!(status.next_bell, Some(ny(11, 16, 9, 30)));
}

#[test]
fn opening_instant_is_open() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 15, 9, 30)).unwrap();
    assert!(status.is_open());
}

// ── 3. Gaps ──────────────────────────────────────────────────────────

#[test]
fn weekend_gap() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 11, 18, 0)).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert_eq!(status.reason, None);
    assert!(status.phase.is_none());
    assert_eq!(status.until, ny(11, 13, 4, 0));
    assert_eq!(status.next_bell, Some(ny(11, 13, 9, 30)));
}

#[test]
fn closed_holiday_names_the_holiday() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 23, 10, 0)).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert_eq!(status.reason.as_deref(), Some("Thanksgiving Day"));
    assert_eq!(status.until, ny(11, 24, 4, 0));
    assert_eq!(status.next_bell, Some(ny(11, 24, 9, 30)));
}

#[test]
fn partial_holiday_reports_group() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let status = engine.status("US.NYSE", &ny(11, 24, 10, 0)).unwrap();
    assert!(status.is_open());
    assert_eq!(
        status.reason.as_deref(),
        Some("Thanksgiving Day - Primary Trading Session (Partial)")
    );
    assert_eq!(status.until, ny(11, 24, 13, 0));
    assert_eq!(status.next_bell, Some(ny(11, 24, 13, 0)));
}

#[test]
fn overnight_session_open_across_midnight() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let instant = Chicago.with_ymd_and_hms(2023, 11, 15, 2, 0, 0).unwrap();
    let status = engine.status("XCME", &instant).unwrap();
    assert!(status.is_open());
    assert_eq!(status.reason.as_deref(), Some("Globex"));
    let close = Chicago.with_ymd_and_hms(2023, 11, 15, 16, 0, 0).unwrap();
    assert_eq!(status.next_bell, Some(close));
}

#[test]
fn status_outside_coverage_fails() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let instant = New_York.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
    assert!(matches!(
        engine.status("US.NYSE", &instant),
        Err(MarketClockError::DateNotAvailable { .. })
    ));
}

#[test]
fn horizon_is_clamped_to_last_available_date() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let instant = New_York.with_ymd_and_hms(2024, 12, 31, 21, 0, 0).unwrap();
    let status = engine.status("US.NYSE", &instant).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert!(status.next_bell.is_none());
    assert_eq!(
        status.until,
        New_York.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    );
}

// ── 4. Other timezones ───────────────────────────────────────────────

#[test]
fn utc_instant_is_read_in_market_time() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    // 2023-11-16 02:00 UTC is 2023-11-15 21:00 in New York.
    let instant = Utc.with_ymd_and_hms(2023, 11, 16, 2, 0, 0).unwrap();
    let status = engine.status("US.NYSE", &instant).unwrap();
    assert_eq!(status.status, PhaseStatus::Closed);
    assert_eq!(status.until, ny(11, 16, 4, 0));
    assert_eq!(status.until.timezone(), New_York);
}

// ── 5. Parallel queries ──────────────────────────────────────────────

#[test]
fn parallel_queries_match_sequential() {
    let store = snapshot();
    let engine = Engine::with_defaults(&store);
    let instants: Vec<DateTime<Tz>> = (1..=28)
        .flat_map(|day| [ny(11, day, 3, 0), ny(11, day, 12, 0), ny(11, day, 18, 30)])
        .collect();

    let sequential: Vec<_> = instants
        .iter()
        .map(|t| engine.status("US.NYSE", t).unwrap())
        .collect();
    let parallel: Vec<_> = instants
        .par_iter()
        .map(|t| engine.status("US.NYSE", t).unwrap())
        .collect();
    assert_eq!(sequential, parallel);

    let markets = ["US.NYSE", "XCME", "XX.SEAS", "US.OLDX"];
    let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 4, 30).unwrap();
    let counts: Vec<usize> = markets
        .par_iter()
        .map(|m| engine.phases_for(m, start, end).unwrap().len())
        .collect();
    assert!(counts.iter().all(|c| *c > 0));
    // US.OLDX resolves to US.NYSE.
    assert_eq!(counts[0], counts[3]);
}
