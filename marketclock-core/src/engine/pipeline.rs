//! Per-date rule selection.
//!
//! For one calendar date the filters run in a fixed order:
//! 1. schedule group (holiday override or `Regular`)
//! 2. in-force window
//! 3. season window
//! 4. weekday, with a backward weekday fallback for open overrides
//! 5. ordering by start, duration, primary-first
//!
//! Each step is eager over one date's rules; laziness lives at the date-range
//! level in [`PhaseIter`](super::materialize::PhaseIter).

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::{BTreeMap, HashMap};

use crate::domain::season::season_key;
use crate::domain::{HolidayOverride, ScheduleRule, REGULAR_GROUP};
use crate::error::Result;
use crate::store::ReferenceStore;

/// Season boundaries resolved during one query. Never shared across queries.
pub struct SeasonCache<'s, S: ReferenceStore + ?Sized> {
    store: &'s S,
    resolved: HashMap<(String, i32), NaiveDate>,
}

impl<'s, S: ReferenceStore + ?Sized> SeasonCache<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            resolved: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, label: &str, year: i32) -> Result<NaiveDate> {
        let key = season_key(label, year);
        if let Some(date) = self.resolved.get(&key) {
            return Ok(*date);
        }
        let date = self.store.season_date(label, year)?;
        self.resolved.insert(key, date);
        Ok(date)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// The group to use on `date` and whether the weekday fallback may apply.
///
/// Fallback is only allowed when a holiday explicitly maps the date to the
/// regular group.
pub fn pick_schedule_group(
    date: NaiveDate,
    holidays: &BTreeMap<NaiveDate, HolidayOverride>,
) -> (String, bool) {
    match holidays.get(&date) {
        Some(holiday) => (holiday.schedule_group.to_lowercase(), holiday.is_regular()),
        None => (REGULAR_GROUP.to_lowercase(), false),
    }
}

pub fn filter_schedule_group<'r>(
    rules: impl IntoIterator<Item = &'r ScheduleRule>,
    group: &str,
) -> Vec<&'r ScheduleRule> {
    rules.into_iter().filter(|r| r.in_group(group)).collect()
}

pub fn filter_in_force<'r>(
    rules: impl IntoIterator<Item = &'r ScheduleRule>,
    date: NaiveDate,
) -> Vec<&'r ScheduleRule> {
    rules
        .into_iter()
        .filter(|r| r.is_in_force(date, date))
        .collect()
}

/// Keep rules whose season window contains `date`. Seasons are resolved for
/// the date's calendar year; a window whose end precedes its start wraps
/// the year boundary.
pub fn filter_season<'r, S: ReferenceStore + ?Sized>(
    rules: impl IntoIterator<Item = &'r ScheduleRule>,
    date: NaiveDate,
    seasons: &mut SeasonCache<'_, S>,
) -> Result<Vec<&'r ScheduleRule>> {
    let mut kept = Vec::new();
    for rule in rules {
        let (Some(start_label), Some(end_label)) = (&rule.season_start, &rule.season_end) else {
            kept.push(rule);
            continue;
        };
        if !rule.has_season() {
            kept.push(rule);
            continue;
        }
        let start = seasons.resolve(start_label, date.year())?;
        let end = seasons.resolve(end_label, date.year())?;
        let in_season = if end < start {
            date <= end || date >= start
        } else {
            start <= date && date <= end
        };
        if in_season {
            kept.push(rule);
        }
    }
    Ok(kept)
}

pub fn filter_weekday<'r>(
    rules: impl IntoIterator<Item = &'r ScheduleRule>,
    weekday: Weekday,
) -> Vec<&'r ScheduleRule> {
    rules
        .into_iter()
        .filter(|r| r.days.matches(weekday))
        .collect()
}

/// Walk backward from the day before `weekday` until some weekday has rules.
/// Stops empty once the walk is back at `weekday`.
pub fn fallback_rules<'r>(candidates: &[&'r ScheduleRule], weekday: Weekday) -> Vec<&'r ScheduleRule> {
    let mut day = weekday.pred();
    while day != weekday {
        let found = filter_weekday(candidates.iter().copied(), day);
        if !found.is_empty() {
            return found;
        }
        day = day.pred();
    }
    Vec::new()
}

/// Stable sort by start time, then duration, then primary session first.
pub fn order_rules(rules: &mut [&ScheduleRule]) {
    rules.sort_by_key(|r| (r.start, r.duration_secs(), !r.is_primary()));
}

/// Rules selected for one date, with how they were chosen.
#[derive(Debug, Clone)]
pub struct DayRules<'r> {
    pub date: NaiveDate,
    pub group: String,
    pub fell_back: bool,
    pub rules: Vec<&'r ScheduleRule>,
}

/// Run the whole chain for `date`.
pub fn rules_for_date<'r, S: ReferenceStore + ?Sized>(
    rules: &'r [ScheduleRule],
    holidays: &BTreeMap<NaiveDate, HolidayOverride>,
    date: NaiveDate,
    seasons: &mut SeasonCache<'_, S>,
) -> Result<DayRules<'r>> {
    let (group, fallback_eligible) = pick_schedule_group(date, holidays);

    let in_group = filter_schedule_group(rules, &group);
    let in_force = filter_in_force(in_group, date);
    let before_weekdays = filter_season(in_force, date, seasons)?;

    let mut selected = filter_weekday(before_weekdays.iter().copied(), date.weekday());
    let mut fell_back = false;
    if selected.is_empty() && fallback_eligible {
        selected = fallback_rules(&before_weekdays, date.weekday());
        fell_back = !selected.is_empty();
    }

    order_rules(&mut selected);
    Ok(DayRules {
        date,
        group,
        fell_back,
        rules: selected,
    })
}
