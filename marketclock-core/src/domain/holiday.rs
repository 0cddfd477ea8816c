use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::FinId;
use super::phase::PhaseStatus;
use super::schedule::REGULAR_GROUP;

/// A single date's override for a market: which schedule group replaces
/// `Regular` on that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayOverride {
    pub fin_id: FinId,
    pub date: NaiveDate,
    pub holiday_name: String,
    pub schedule_group: String,
    pub settlement: bool,
    pub observed: bool,
    pub status: PhaseStatus,
    pub memo: Option<String>,
}

impl HolidayOverride {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn has_settlement(&self) -> bool {
        self.settlement
    }

    /// True when the override keeps the regular schedule, which is also the
    /// only case where the weekday fallback may kick in.
    pub fn is_regular(&self) -> bool {
        self.schedule_group.to_lowercase() == REGULAR_GROUP.to_lowercase()
    }
}
