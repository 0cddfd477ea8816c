use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A symbolic season boundary resolved for one year, e.g.
/// "Second Sunday of March" in 2024 is 2024-03-10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDefinition {
    pub season: String,
    pub year: i32,
    pub date: NaiveDate,
}

impl SeasonDefinition {
    /// Lookup key: labels compare case-insensitively.
    pub fn key(&self) -> (String, i32) {
        season_key(&self.season, self.year)
    }
}

pub fn season_key(label: &str, year: i32) -> (String, i32) {
    (label.trim().to_lowercase(), year)
}
