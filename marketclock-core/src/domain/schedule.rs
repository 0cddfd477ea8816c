//! Recurring session definitions.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ids::FinId;
use super::phase::PRIMARY_TRADING_SESSION;
use super::weekday::WeekdaySet;
use crate::error::MarketClockError;

/// Schedule group used when no holiday override applies.
pub const REGULAR_GROUP: &str = "Regular";

const SECONDS_PER_DAY: i64 = 86_400;

/// One recurring session for a market.
///
/// `start`/`end` are local to `timezone`. A session ending on a later
/// calendar day than it starts carries `offset_days > 0`; all filters use
/// the start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub fin_id: FinId,
    pub schedule_group: String,
    pub schedule_group_memo: Option<String>,
    pub timezone: Tz,
    pub phase_type: String,
    pub phase_name: Option<String>,
    pub phase_memo: Option<String>,
    pub days: WeekdaySet,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub offset_days: u32,
    pub in_force_start_date: Option<NaiveDate>,
    pub in_force_end_date: Option<NaiveDate>,
    pub season_start: Option<String>,
    pub season_end: Option<String>,
}

impl ScheduleRule {
    /// Session length in seconds, including whole days from the offset.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds() + i64::from(self.offset_days) * SECONDS_PER_DAY
    }

    pub fn validate(&self) -> Result<(), MarketClockError> {
        if self.duration_secs() < 0 {
            return Err(MarketClockError::invalid(format!(
                "{} '{}' ends before it starts ({} to {})",
                self.fin_id,
                self.phase_type,
                self.start,
                self.end_with_offset()
            )));
        }
        if let (Some(from), Some(to)) = (self.in_force_start_date, self.in_force_end_date) {
            if to < from {
                return Err(MarketClockError::invalid(format!(
                    "{} '{}' in-force window ends {to} before it starts {from}",
                    self.fin_id, self.phase_type
                )));
            }
        }
        Ok(())
    }

    /// Case-insensitive group match, folding non-ASCII letters too.
    pub fn in_group(&self, group: &str) -> bool {
        self.schedule_group.to_lowercase() == group.to_lowercase()
    }

    pub fn is_primary(&self) -> bool {
        self.phase_type == PRIMARY_TRADING_SESSION
    }

    /// Both season labels present and non-blank.
    pub fn has_season(&self) -> bool {
        let present = |label: &Option<String>| {
            label.as_deref().is_some_and(|s| !s.trim().is_empty())
        };
        present(&self.season_start) && present(&self.season_end)
    }

    /// Whether the inclusive `[start_date, end_date]` window overlaps the
    /// rule's in-force window.
    pub fn is_in_force(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        match (self.in_force_start_date, self.in_force_end_date) {
            (None, None) => true,
            (None, Some(to)) => start_date <= to,
            (Some(from), None) => end_date >= from,
            (Some(from), Some(to)) => start_date <= to && end_date >= from,
        }
    }

    /// End time with the day offset, e.g. `16:00 +1`.
    pub fn end_with_offset(&self) -> String {
        let end = self.end.format("%H:%M");
        if self.offset_days == 0 {
            end.to_string()
        } else {
            format!("{end} +{}", self.offset_days)
        }
    }
}
