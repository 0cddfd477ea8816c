use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use super::ids::FinId;
use super::phase::{ConcretePhase, PhaseStatus};

/// Point-in-time answer: is the market open, why, and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStatus {
    pub fin_id: FinId,
    pub status: PhaseStatus,
    pub reason: Option<String>,
    /// End of the current phase or gap.
    pub until: DateTime<Tz>,
    /// Closing bell of the current open phase; otherwise the next opening bell.
    pub next_bell: Option<DateTime<Tz>>,
    pub phase: Option<ConcretePhase>,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
