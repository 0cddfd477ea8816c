//! Read-only access to reference data.
//!
//! The engine talks to reference data only through [`ReferenceStore`].
//! Two backends are provided:
//! - [`MemoryStore`]: records inserted in code (tests, embedding)
//! - [`CsvStore`]: a snapshot directory of CSV files loaded into memory

pub mod access;
pub mod csv;
pub mod memory;

pub use access::{AccessLevel, Dataset};
pub use self::csv::CsvStore;
pub use memory::MemoryStore;

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::domain::{
    Currency, CurrencyCode, CurrencyHoliday, FinId, HolidayOverride, Market, Mic, PhaseCatalog,
    ScheduleRule,
};
use crate::error::Result;

/// Typed lookups the engine needs. Implementations raise `NotCovered` /
/// `NoAccess` instead of returning empty results when data exists but is
/// not readable.
pub trait ReferenceStore: Send + Sync {
    fn access_level(&self) -> AccessLevel;

    fn market(&self, fin_id: &FinId) -> Result<Market>;

    fn market_by_mic(&self, mic: &Mic) -> Result<FinId>;

    /// Markets whose fin id matches `pattern` (`*` wildcard), or all markets.
    fn list_markets(&self, pattern: Option<&str>) -> Result<Vec<Market>>;

    fn schedule_rules(&self, fin_id: &FinId) -> Result<Vec<ScheduleRule>>;

    fn holiday_overrides(
        &self,
        fin_id: &FinId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, HolidayOverride>>;

    fn season_date(&self, label: &str, year: i32) -> Result<NaiveDate>;

    fn phase_catalog(&self) -> Result<PhaseCatalog>;

    /// First and last date the market has reference data for.
    fn available_date_range(&self, fin_id: &FinId) -> Result<(NaiveDate, NaiveDate)>;

    fn is_covered(&self, fin_id: &FinId) -> bool;

    fn currency(&self, code: &CurrencyCode) -> Result<Currency>;

    fn list_currencies(&self) -> Result<Vec<Currency>>;

    /// Holidays of one currency between `start` and `end` inclusive.
    fn currency_holidays(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CurrencyHoliday>>;

    fn is_currency_covered(&self, code: &CurrencyCode) -> bool;
}

// ── Helpers shared by backends ───────────────────────────────────────

/// Case-insensitive match with `*` matching any run of characters.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_uppercase();
    let text = text.to_uppercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut rest = text.as_str();
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == last {
            return rest.ends_with(part);
        } else if let Some(pos) = rest.find(part) {
            rest = &rest[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

/// Coverage window spanned by a set of holiday dates, widened to whole months.
pub fn month_window(first: NaiveDate, last: NaiveDate) -> (NaiveDate, NaiveDate) {
    (first_of_month(first), last_of_month(last))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}
