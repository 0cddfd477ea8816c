use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ids::{FinId, Mic};

/// Descriptive record for a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub fin_id: FinId,
    pub exchange_name: String,
    pub market_name: Option<String>,
    pub security_group: Option<String>,
    pub timezone: Tz,
    pub weekend_definition: Option<String>,
    pub mic: Option<Mic>,
    pub acronym: Option<String>,
    pub asset_type: Option<String>,
    pub memo: Option<String>,
    pub permanently_closed: Option<NaiveDate>,
    pub replaced_by: Option<FinId>,
}

impl Market {
    pub fn country_code(&self) -> &str {
        self.fin_id.country()
    }

    pub fn is_replaced(&self) -> bool {
        self.replaced_by.is_some()
    }
}
