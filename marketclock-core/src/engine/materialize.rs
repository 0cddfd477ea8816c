//! Turning selected rules into concrete, timezone-anchored phases.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

use super::pipeline::{rules_for_date, SeasonCache};
use crate::domain::{ConcretePhase, HolidayOverride, PhaseCatalog, ScheduleRule};
use crate::error::Result;
use crate::store::ReferenceStore;

/// Attach a wall-clock reading to `tz` without converting it.
///
/// Ambiguous readings (clocks going back) take the earlier instant. Readings
/// that fall into a spring-forward gap keep the offset in force before the
/// gap, which lands them the gap's length later on the wall clock.
pub fn attach(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1))).fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}

/// Build the phase for `rule` starting on `start_date`.
pub fn materialize(
    rule: &ScheduleRule,
    start_date: NaiveDate,
    catalog: &PhaseCatalog,
) -> Result<ConcretePhase> {
    let info = catalog.get(&rule.phase_type)?;
    let end_date = start_date + Duration::days(i64::from(rule.offset_days));
    Ok(ConcretePhase {
        phase_type: rule.phase_type.clone(),
        phase_name: rule.phase_name.clone(),
        phase_memo: rule.phase_memo.clone(),
        status: info.status,
        settlement: info.settlement,
        start: attach(rule.timezone, start_date.and_time(rule.start)),
        end: attach(rule.timezone, end_date.and_time(rule.end)),
    })
}

/// Lazy, one-pass sequence of phases over a date range.
///
/// Dates are planned one at a time, starting `lookback` days before the
/// requested start; a phase is yielded only if it ends on or after the
/// requested start date. After an error the iterator is exhausted.
pub struct PhaseIter<'s, S: ReferenceStore + ?Sized> {
    rules: Vec<ScheduleRule>,
    holidays: BTreeMap<NaiveDate, HolidayOverride>,
    catalog: PhaseCatalog,
    seasons: SeasonCache<'s, S>,
    requested_start: NaiveDate,
    end: NaiveDate,
    cursor: Option<NaiveDate>,
    pending: VecDeque<ConcretePhase>,
}

impl<'s, S: ReferenceStore + ?Sized> PhaseIter<'s, S> {
    pub(crate) fn new(
        store: &'s S,
        rules: Vec<ScheduleRule>,
        holidays: BTreeMap<NaiveDate, HolidayOverride>,
        catalog: PhaseCatalog,
        scan_start: NaiveDate,
        requested_start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            rules,
            holidays,
            catalog,
            seasons: SeasonCache::new(store),
            requested_start,
            end,
            cursor: Some(scan_start),
            pending: VecDeque::new(),
        }
    }

    /// Holiday overrides fetched for this query, keyed by date.
    pub fn holidays(&self) -> &BTreeMap<NaiveDate, HolidayOverride> {
        &self.holidays
    }

    fn plan(&mut self, date: NaiveDate) -> Result<()> {
        let day = rules_for_date(&self.rules, &self.holidays, date, &mut self.seasons)?;
        if day.fell_back {
            debug!(%date, group = %day.group, "no rules for weekday, used fallback weekday");
        }
        trace!(%date, group = %day.group, rules = day.rules.len(), "planned date");

        for rule in day.rules {
            let end_date = date + Duration::days(i64::from(rule.offset_days));
            if end_date < self.requested_start {
                continue;
            }
            self.pending.push_back(materialize(rule, date, &self.catalog)?);
        }
        Ok(())
    }
}

impl<S: ReferenceStore + ?Sized> Iterator for PhaseIter<'_, S> {
    type Item = Result<ConcretePhase>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(phase) = self.pending.pop_front() {
                return Some(Ok(phase));
            }
            let date = self.cursor.filter(|d| *d <= self.end)?;
            self.cursor = date.succ_opt();
            if let Err(e) = self.plan(date) {
                self.cursor = None;
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}

impl<S: ReferenceStore + ?Sized> std::iter::FusedIterator for PhaseIter<'_, S> {}
