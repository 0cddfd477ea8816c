use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ids::CurrencyCode;

/// Descriptive record for a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: String,
    pub country_code: Option<String>,
    pub central_bank: Option<String>,
    /// City the central bank sits in.
    pub financial_capital: Option<String>,
    pub financial_capital_timezone: Option<Tz>,
    pub weekend_definition: Option<String>,
}

/// A date on which a currency does not settle normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyHoliday {
    pub currency_code: CurrencyCode,
    pub date: NaiveDate,
    pub holiday_name: String,
    pub settlement: bool,
    pub observed: bool,
    pub memo: Option<String>,
}

impl CurrencyHoliday {
    pub fn has_settlement(&self) -> bool {
        self.settlement
    }
}
