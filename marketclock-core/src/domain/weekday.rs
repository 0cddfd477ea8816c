//! Weekday sets such as `Mon-Fri`, `Mon,Wed,Fri` or the wrapping `Sat-Mon`.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketClockError;

/// A parsed weekday specification.
///
/// Ranges are expanded by walking forward from the first day to the last,
/// wrapping from Sunday to Monday, so `Sat-Mon` covers Sat, Sun and Mon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekdaySet {
    text: String,
    mask: u8,
}

impl WeekdaySet {
    pub fn parse(spec: &str) -> Result<Self, MarketClockError> {
        let text = spec.trim();
        if text.is_empty() {
            return Err(MarketClockError::invalid("empty weekday specification"));
        }
        let mut mask = 0u8;
        for segment in text.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(MarketClockError::invalid(format!(
                    "empty segment in weekday specification '{text}'"
                )));
            }
            mask |= parse_segment(segment, text)?;
        }
        Ok(Self {
            text: text.to_string(),
            mask,
        })
    }

    pub fn matches(&self, weekday: Weekday) -> bool {
        self.mask & bit(weekday) != 0
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.matches(date.weekday())
    }

    /// Matched weekdays, Monday first.
    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_DAYS.into_iter().filter(|d| self.matches(*d))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

fn parse_segment(segment: &str, whole: &str) -> Result<u8, MarketClockError> {
    let parts: Vec<&str> = segment.split('-').map(str::trim).collect();
    match parts.as_slice() {
        [single] => Ok(bit(parse_day(single, whole)?)),
        [from, to] => {
            let from = parse_day(from, whole)?;
            let to = parse_day(to, whole)?;
            let mut mask = 0u8;
            let mut day = from;
            loop {
                mask |= bit(day);
                if day == to {
                    break;
                }
                day = day.succ();
            }
            Ok(mask)
        }
        _ => Err(MarketClockError::invalid(format!(
            "malformed weekday range '{segment}' in '{whole}'"
        ))),
    }
}

fn parse_day(token: &str, whole: &str) -> Result<Weekday, MarketClockError> {
    match token.to_ascii_lowercase().as_str() {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        _ => Err(MarketClockError::invalid(format!(
            "unknown weekday '{token}' in '{whole}'"
        ))),
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl FromStr for WeekdaySet {
    type Err = MarketClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WeekdaySet {
    type Error = MarketClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WeekdaySet> for String {
    fn from(set: WeekdaySet) -> Self {
        set.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_range() {
        let set = WeekdaySet::parse("Sat-Mon").unwrap();
        assert!(set.matches(Weekday::Sat));
        assert!(set.matches(Weekday::Sun));
        assert!(set.matches(Weekday::Mon));
        assert!(!set.matches(Weekday::Tue));
        assert!(!set.matches(Weekday::Fri));
    }

    #[test]
    fn plain_range_and_list() {
        let week = WeekdaySet::parse("Mon-Fri").unwrap();
        assert_eq!(week.days().count(), 5);
        assert!(!week.matches(Weekday::Sat));

        let list = WeekdaySet::parse("mon, WED ,Fri").unwrap();
        let days: Vec<Weekday> = list.days().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn mixed_segments_are_ored() {
        let set = WeekdaySet::parse("Sun-Tue,Thu").unwrap();
        let days: Vec<Weekday> = set.days().collect();
        assert_eq!(
            days,
            vec![Weekday::Mon, Weekday::Tue, Weekday::Thu, Weekday::Sun]
        );
    }

    #[test]
    fn same_day_range_is_one_day() {
        let set = WeekdaySet::parse("Wed-Wed").unwrap();
        assert_eq!(set.days().collect::<Vec<_>>(), vec![Weekday::Wed]);
    }

    #[test]
    fn matches_date_uses_calendar_weekday() {
        let set = WeekdaySet::parse("Sun-Thu").unwrap();
        // 2023-11-17 is a Friday.
        assert!(!set.matches_date(NaiveDate::from_ymd_opt(2023, 11, 17).unwrap()));
        assert!(set.matches_date(NaiveDate::from_ymd_opt(2023, 11, 19).unwrap()));
    }

    #[test]
    fn bad_specs_rejected() {
        for spec in ["", "Monday", "Mon-", "Mon--Fri", "Mon-Tue-Wed", "Mon,,Fri", "Xyz"] {
            assert!(
                matches!(
                    WeekdaySet::parse(spec),
                    Err(MarketClockError::InvalidArgument(_))
                ),
                "{spec:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_keeps_text() {
        assert_eq!(WeekdaySet::parse(" Mon-Fri ").unwrap().to_string(), "Mon-Fri");
    }
}
