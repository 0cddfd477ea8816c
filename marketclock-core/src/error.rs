//! Error taxonomy shared by every layer of the crate.
//!
//! Caller mistakes (`InvalidArgument`) are raised before any store access.
//! Data gaps (`MissingDefinition`, `UnknownPhaseType`, `DateNotAvailable`)
//! and entitlement signals (`NotCovered`, `NoAccess`) are surfaced unchanged;
//! nothing here is retried by the engine.

use chrono::NaiveDate;
use std::path::PathBuf;

/// Errors produced by the stores, the rule pipeline and the engine.
#[derive(Debug, thiserror::Error)]
pub enum MarketClockError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no season definition for '{season}' in {year}")]
    MissingDefinition { season: String, year: i32 },

    #[error("{0} is not covered by this dataset")]
    NotCovered(String),

    #[error("{0} is supported but not available at the current access level")]
    NoAccess(String),

    #[error("MIC '{0}' is not mapped to any market")]
    UnknownMic(String),

    #[error("{requested} is outside the available dates for {fin_id} ({first} to {last})")]
    DateNotAvailable {
        fin_id: String,
        requested: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },

    #[error("unknown phase type '{0}'")]
    UnknownPhaseType(String),

    #[error("missing data: {0}")]
    MissingData(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarketClockError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for the entitlement pair the engine must never conflate with
    /// "no data".
    pub fn is_access_error(&self) -> bool {
        matches!(self, Self::NotCovered(_) | Self::NoAccess(_))
    }
}

pub type Result<T> = std::result::Result<T, MarketClockError>;
