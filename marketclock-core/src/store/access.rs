//! Entitlement levels of a snapshot.
//!
//! The level is derived from which tables a snapshot ships with: a snapshot
//! without schedules only grants holiday data, one without currencies grants
//! everything market-related.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarketClockError, Result};

/// Kinds of reference data a read can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Markets,
    Holidays,
    Schedules,
    Seasons,
    PhaseTypes,
    Currencies,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dataset::Markets => "market data",
            Dataset::Holidays => "holiday data",
            Dataset::Schedules => "schedule data",
            Dataset::Seasons => "season definitions",
            Dataset::PhaseTypes => "phase types",
            Dataset::Currencies => "currency data",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Full,
    NoCurrencies,
    OnlyHolidays,
}

impl AccessLevel {
    /// Level implied by the tables present in a snapshot.
    pub fn from_tables(has_schedules: bool, has_currencies: bool) -> Self {
        if !has_schedules {
            AccessLevel::OnlyHolidays
        } else if !has_currencies {
            AccessLevel::NoCurrencies
        } else {
            AccessLevel::Full
        }
    }

    pub fn permits(self, dataset: Dataset) -> bool {
        match self {
            AccessLevel::Full => true,
            AccessLevel::NoCurrencies => dataset != Dataset::Currencies,
            AccessLevel::OnlyHolidays => {
                matches!(dataset, Dataset::Markets | Dataset::Holidays)
            }
        }
    }

    pub fn check(self, dataset: Dataset) -> Result<()> {
        if self.permits(dataset) {
            Ok(())
        } else {
            Err(MarketClockError::NoAccess(dataset.to_string()))
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessLevel::Full => "full",
            AccessLevel::NoCurrencies => "no_currencies",
            AccessLevel::OnlyHolidays => "only_holidays",
        };
        write!(f, "{name}")
    }
}
