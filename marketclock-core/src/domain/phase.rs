//! Phase-type catalog and materialized phases.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MarketClockError;

/// Phase type that wins ordering ties against other phases with the same
/// start and duration.
pub const PRIMARY_TRADING_SESSION: &str = "Primary Trading Session";

/// Whether trading happens during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseStatus {
    Open,
    Closed,
}

impl PhaseStatus {
    pub fn is_open(self) -> bool {
        self == PhaseStatus::Open
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Open => write!(f, "Open"),
            PhaseStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl FromStr for PhaseStatus {
    type Err = MarketClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PhaseStatus::Open),
            "closed" => Ok(PhaseStatus::Closed),
            other => Err(MarketClockError::invalid(format!(
                "unknown phase status '{other}'"
            ))),
        }
    }
}

/// Global semantics of a phase type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTypeInfo {
    pub name: String,
    pub status: PhaseStatus,
    pub settlement: bool,
    pub closing_price: bool,
}

/// Every known phase type, keyed by exact name. Built once at load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCatalog {
    types: BTreeMap<String, PhaseTypeInfo>,
}

impl PhaseCatalog {
    pub fn new(types: impl IntoIterator<Item = PhaseTypeInfo>) -> Self {
        let mut catalog = Self::default();
        for info in types {
            catalog.insert(info);
        }
        catalog
    }

    pub fn insert(&mut self, info: PhaseTypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    pub fn get(&self, phase_type: &str) -> Result<&PhaseTypeInfo, MarketClockError> {
        self.types
            .get(phase_type)
            .ok_or_else(|| MarketClockError::UnknownPhaseType(phase_type.to_string()))
    }

    pub fn contains(&self, phase_type: &str) -> bool {
        self.types.contains_key(phase_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseTypeInfo> {
        self.types.values()
    }
}

/// One materialized interval on the timeline, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcretePhase {
    pub phase_type: String,
    pub phase_name: Option<String>,
    pub phase_memo: Option<String>,
    pub status: PhaseStatus,
    pub settlement: bool,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl ConcretePhase {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn has_settlement(&self) -> bool {
        self.settlement
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// `phase_name`, or the phase type when the rule carries no name.
    pub fn display_name(&self) -> &str {
        self.phase_name.as_deref().unwrap_or(&self.phase_type)
    }

    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        self.start <= *instant && *instant < self.end
    }
}
