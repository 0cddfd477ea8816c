use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketClockError;

/// Hierarchical financial identifier, e.g. `US.NYSE` or `US.CME.EQUITY.USINDEX1`.
///
/// Stored uppercased so lookups are case-insensitive. The first segment is the
/// country/region code, the second the venue acronym, anything after that is
/// a free-form qualifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FinId(String);

impl FinId {
    pub fn parse(raw: &str) -> Result<Self, MarketClockError> {
        let normalized = raw.trim().to_uppercase();
        let segments: Vec<&str> = normalized.split('.').collect();
        if segments.len() < 2 {
            return Err(MarketClockError::invalid(format!(
                "fin id '{raw}' needs at least two dot-separated parts"
            )));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(MarketClockError::invalid(format!(
                "fin id '{raw}' has an empty part"
            )));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(MarketClockError::invalid(format!(
                "fin id '{raw}' contains whitespace"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    pub fn acronym(&self) -> &str {
        self.0.split('.').nth(1).unwrap_or_default()
    }

    /// Qualifiers after the acronym, still dot-joined.
    pub fn extra(&self) -> Option<&str> {
        self.0.splitn(3, '.').nth(2)
    }
}

impl fmt::Display for FinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FinId {
    type Err = MarketClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FinId {
    type Error = MarketClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FinId> for String {
    fn from(id: FinId) -> Self {
        id.0
    }
}

/// ISO 10383 market identifier code, e.g. `XNYS`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mic(String);

impl Mic {
    pub fn parse(raw: &str) -> Result<Self, MarketClockError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.len() != 4 || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MarketClockError::invalid(format!(
                "MIC '{raw}' must be four alphanumeric characters"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Mic {
    type Error = MarketClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Mic> for String {
    fn from(mic: Mic) -> Self {
        mic.0
    }
}

/// ISO 4217 currency code, e.g. `EUR`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self, MarketClockError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.len() != 3 || !normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MarketClockError::invalid(format!(
                "currency code '{raw}' must be three letters"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = MarketClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MarketClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// What a caller typed to name a market: a fin id (has a dot) or a MIC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarketId {
    Fin(FinId),
    Mic(Mic),
}

impl MarketId {
    pub fn parse(raw: &str) -> Result<Self, MarketClockError> {
        if raw.contains('.') {
            FinId::parse(raw).map(Self::Fin)
        } else {
            Mic::parse(raw).map(Self::Mic)
        }
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fin(id) => write!(f, "{id}"),
            Self::Mic(mic) => write!(f, "{mic}"),
        }
    }
}

impl FromStr for MarketId {
    type Err = MarketClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
