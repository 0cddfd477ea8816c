//! Point-in-time status derived from generated phases.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use super::materialize::attach;
use crate::domain::{ConcretePhase, FinId, HolidayOverride, MarketStatus, PhaseStatus};

/// Inputs for projecting a status from a window of phases.
pub struct StatusWindow<'a> {
    pub fin_id: &'a FinId,
    pub timezone: Tz,
    pub phases: &'a [ConcretePhase],
    /// Override on the instant's date, if any.
    pub holiday: Option<&'a HolidayOverride>,
    /// Last date phases were generated for.
    pub horizon_end: NaiveDate,
}

/// Work out the status at `instant`.
///
/// The current phase is the first open phase containing the instant, else
/// the earliest-starting containing phase. Containment is half-open, so an
/// instant equal to a phase end already belongs to whatever comes next.
pub fn project(window: &StatusWindow<'_>, instant: &DateTime<Tz>) -> MarketStatus {
    let containing: Vec<&ConcretePhase> = window
        .phases
        .iter()
        .filter(|p| p.contains(instant))
        .collect();
    let current = containing
        .iter()
        .find(|p| p.is_open())
        .or_else(|| containing.iter().min_by_key(|p| p.start))
        .copied();
    let later: Vec<&ConcretePhase> = window
        .phases
        .iter()
        .filter(|p| *instant < p.start)
        .collect();

    let next_start = |bound: Option<&DateTime<Tz>>| {
        later
            .iter()
            .filter(|p| bound.map_or(true, |b| p.start < *b))
            .map(|p| p.start)
            .min()
    };
    let until = match current {
        Some(phase) => next_start(Some(&phase.end)).unwrap_or(phase.end),
        None => next_start(None).unwrap_or_else(|| end_of_day(window.timezone, window.horizon_end)),
    };

    let next_bell = match current {
        Some(phase) if phase.is_open() => Some(phase.end),
        _ => later.iter().filter(|p| p.is_open()).map(|p| p.start).min(),
    };

    MarketStatus {
        fin_id: window.fin_id.clone(),
        status: current.map_or(PhaseStatus::Closed, |p| p.status),
        reason: reason(window.holiday, current),
        until,
        next_bell,
        phase: current.cloned(),
    }
}

/// Holiday name, then the current phase, then the override group when it
/// is not the regular one.
fn reason(holiday: Option<&HolidayOverride>, current: Option<&ConcretePhase>) -> Option<String> {
    let mut reason = String::new();
    if let Some(h) = holiday {
        reason.push_str(&h.holiday_name);
    }
    if let Some(phase) = current {
        reason.push_str(" - ");
        reason.push_str(phase.display_name());
        if let Some(h) = holiday.filter(|h| !h.is_regular()) {
            reason.push_str(&format!(" ({})", h.schedule_group));
        }
    }
    let trimmed = reason.trim_matches(|c| c == ' ' || c == '-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn end_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let next = date.succ_opt().unwrap_or(date);
    attach(tz, next.and_time(chrono::NaiveTime::MIN))
}
