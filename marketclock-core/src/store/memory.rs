//! In-memory reference store.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::access::{AccessLevel, Dataset};
use super::{glob_match, month_window, ReferenceStore};
use crate::domain::season::season_key;
use crate::domain::{
    Currency, CurrencyCode, CurrencyHoliday, FinId, HolidayOverride, Market, Mic, PhaseCatalog,
    PhaseTypeInfo, ScheduleRule, SeasonDefinition,
};
use crate::error::{MarketClockError, Result};

/// Reference data held in maps, filled through the `insert_*` methods.
///
/// Coverage defaults to "every inserted market"; call [`set_covered`] to
/// declare markets the dataset knows about but does not ship.
///
/// [`set_covered`]: MemoryStore::set_covered
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    access: AccessLevel,
    markets: BTreeMap<FinId, Market>,
    mics: BTreeMap<Mic, FinId>,
    covered: Option<BTreeSet<FinId>>,
    rules: BTreeMap<FinId, Vec<ScheduleRule>>,
    holidays: BTreeMap<FinId, BTreeMap<NaiveDate, HolidayOverride>>,
    seasons: HashMap<(String, i32), NaiveDate>,
    catalog: PhaseCatalog,
    currencies: BTreeMap<CurrencyCode, Currency>,
    currency_holidays: BTreeMap<CurrencyCode, BTreeMap<NaiveDate, CurrencyHoliday>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    pub fn set_access(&mut self, access: AccessLevel) {
        self.access = access;
    }

    /// Insert a market; its MIC, if any, is mapped too.
    pub fn insert_market(&mut self, market: Market) {
        if let Some(mic) = &market.mic {
            self.mics
                .entry(mic.clone())
                .or_insert_with(|| market.fin_id.clone());
        }
        self.markets.insert(market.fin_id.clone(), market);
    }

    pub fn map_mic(&mut self, mic: Mic, fin_id: FinId) {
        self.mics.insert(mic, fin_id);
    }

    pub fn set_covered(&mut self, covered: impl IntoIterator<Item = FinId>) {
        self.covered = Some(covered.into_iter().collect());
    }

    pub fn insert_rule(&mut self, rule: ScheduleRule) -> Result<()> {
        rule.validate()?;
        self.rules.entry(rule.fin_id.clone()).or_default().push(rule);
        Ok(())
    }

    /// Rejects a second override for the same market and date.
    pub fn insert_holiday(&mut self, holiday: HolidayOverride) -> Result<()> {
        let by_date = self.holidays.entry(holiday.fin_id.clone()).or_default();
        if by_date.contains_key(&holiday.date) {
            return Err(MarketClockError::invalid(format!(
                "duplicate holiday for {} on {}",
                holiday.fin_id, holiday.date
            )));
        }
        by_date.insert(holiday.date, holiday);
        Ok(())
    }

    pub fn insert_season(&mut self, season: SeasonDefinition) -> Result<()> {
        let key = season.key();
        if self.seasons.contains_key(&key) {
            return Err(MarketClockError::invalid(format!(
                "duplicate season definition '{}' for {}",
                season.season, season.year
            )));
        }
        self.seasons.insert(key, season.date);
        Ok(())
    }

    pub fn insert_phase_type(&mut self, info: PhaseTypeInfo) {
        self.catalog.insert(info);
    }

    pub fn insert_currency(&mut self, currency: Currency) {
        self.currencies.insert(currency.code.clone(), currency);
    }

    /// Rejects a second holiday for the same currency and date.
    pub fn insert_currency_holiday(&mut self, holiday: CurrencyHoliday) -> Result<()> {
        let by_date = self
            .currency_holidays
            .entry(holiday.currency_code.clone())
            .or_default();
        if by_date.contains_key(&holiday.date) {
            return Err(MarketClockError::invalid(format!(
                "duplicate currency holiday for {} on {}",
                holiday.currency_code, holiday.date
            )));
        }
        by_date.insert(holiday.date, holiday);
        Ok(())
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn holiday_count(&self) -> usize {
        self.holidays.values().map(BTreeMap::len).sum()
    }

    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    pub fn currency_count(&self) -> usize {
        self.currencies.len()
    }

    pub fn currency_holiday_count(&self) -> usize {
        self.currency_holidays.values().map(BTreeMap::len).sum()
    }

    fn known_market(&self, fin_id: &FinId) -> Result<&Market> {
        match self.markets.get(fin_id) {
            Some(market) => Ok(market),
            None if self.is_covered(fin_id) => {
                Err(MarketClockError::NoAccess(format!("market {fin_id}")))
            }
            None => Err(MarketClockError::NotCovered(format!("market {fin_id}"))),
        }
    }

    fn known_currency(&self, code: &CurrencyCode) -> Result<&Currency> {
        self.access.check(Dataset::Currencies)?;
        self.currencies
            .get(code)
            .ok_or_else(|| MarketClockError::NotCovered(format!("currency {code}")))
    }
}

impl ReferenceStore for MemoryStore {
    fn access_level(&self) -> AccessLevel {
        self.access
    }

    fn market(&self, fin_id: &FinId) -> Result<Market> {
        self.known_market(fin_id).cloned()
    }

    fn market_by_mic(&self, mic: &Mic) -> Result<FinId> {
        self.mics
            .get(mic)
            .cloned()
            .ok_or_else(|| MarketClockError::UnknownMic(mic.to_string()))
    }

    fn list_markets(&self, pattern: Option<&str>) -> Result<Vec<Market>> {
        self.access.check(Dataset::Markets)?;
        Ok(self
            .markets
            .values()
            .filter(|m| pattern.map_or(true, |p| glob_match(p, m.fin_id.as_str())))
            .cloned()
            .collect())
    }

    fn schedule_rules(&self, fin_id: &FinId) -> Result<Vec<ScheduleRule>> {
        self.known_market(fin_id)?;
        self.access.check(Dataset::Schedules)?;
        Ok(self.rules.get(fin_id).cloned().unwrap_or_default())
    }

    fn holiday_overrides(
        &self,
        fin_id: &FinId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, HolidayOverride>> {
        self.known_market(fin_id)?;
        self.access.check(Dataset::Holidays)?;
        if end < start {
            return Ok(BTreeMap::new());
        }
        Ok(self
            .holidays
            .get(fin_id)
            .map(|by_date| {
                by_date
                    .range(start..=end)
                    .map(|(date, h)| (*date, h.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn season_date(&self, label: &str, year: i32) -> Result<NaiveDate> {
        self.access.check(Dataset::Seasons)?;
        self.seasons
            .get(&season_key(label, year))
            .copied()
            .ok_or_else(|| MarketClockError::MissingDefinition {
                season: label.to_string(),
                year,
            })
    }

    fn phase_catalog(&self) -> Result<PhaseCatalog> {
        self.access.check(Dataset::PhaseTypes)?;
        if self.catalog.is_empty() {
            return Err(MarketClockError::MissingData("phase type catalog is empty".into()));
        }
        Ok(self.catalog.clone())
    }

    fn available_date_range(&self, fin_id: &FinId) -> Result<(NaiveDate, NaiveDate)> {
        self.known_market(fin_id)?;
        let by_date = self.holidays.get(fin_id);
        let first = by_date.and_then(|h| h.keys().next().copied());
        let last = by_date.and_then(|h| h.keys().next_back().copied());
        match (first, last) {
            (Some(first), Some(last)) => Ok(month_window(first, last)),
            _ => Err(MarketClockError::MissingData(format!(
                "no holiday data for {fin_id}, coverage window unknown"
            ))),
        }
    }

    fn is_covered(&self, fin_id: &FinId) -> bool {
        match &self.covered {
            Some(covered) => covered.contains(fin_id),
            None => self.markets.contains_key(fin_id),
        }
    }

    fn currency(&self, code: &CurrencyCode) -> Result<Currency> {
        self.known_currency(code).cloned()
    }

    fn list_currencies(&self) -> Result<Vec<Currency>> {
        self.access.check(Dataset::Currencies)?;
        Ok(self.currencies.values().cloned().collect())
    }

    fn currency_holidays(
        &self,
        code: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CurrencyHoliday>> {
        if end < start {
            return Err(MarketClockError::invalid(format!(
                "end {end} is before start {start}"
            )));
        }
        self.known_currency(code)?;
        Ok(self
            .currency_holidays
            .get(code)
            .map(|by_date| by_date.range(start..=end).map(|(_, h)| h.clone()).collect())
            .unwrap_or_default())
    }

    fn is_currency_covered(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains_key(code)
    }
}
