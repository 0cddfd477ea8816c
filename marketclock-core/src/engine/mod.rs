//! Query entry points.
//!
//! [`Engine`] borrows a [`ReferenceStore`] and an explicit [`EngineConfig`];
//! it keeps no state between calls. Every call validates its arguments
//! before touching the store, fetches what it needs once, and returns fresh
//! values.

pub mod materialize;
pub mod pipeline;
pub mod status;

pub use materialize::PhaseIter;
pub use pipeline::{DayRules, SeasonCache};

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{ConcretePhase, Market, MarketId, MarketStatus};
use crate::error::{MarketClockError, Result};
use crate::store::ReferenceStore;
use status::{project, StatusWindow};

pub struct Engine<'s, S: ReferenceStore + ?Sized> {
    store: &'s S,
    config: EngineConfig,
}

impl<'s, S: ReferenceStore + ?Sized> Engine<'s, S> {
    pub fn new(store: &'s S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: &'s S) -> Self {
        Self::new(store, EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Resolve a fin id or MIC to its market record, following
    /// `replaced_by` links when configured to.
    pub fn market(&self, market: &str) -> Result<Market> {
        let id = MarketId::parse(market)?;
        self.resolve(&id)
    }

    pub fn available_date_range(&self, market: &str) -> Result<(NaiveDate, NaiveDate)> {
        let market = self.market(market)?;
        self.store.available_date_range(&market.fin_id)
    }

    /// Lazily generate the phases touching `[start, end]`.
    ///
    /// Both dates must lie inside the market's available range. Phases that
    /// started before `start` but end on or after it are included.
    pub fn generate_phases(
        &self,
        market: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PhaseIter<'s, S>> {
        if end < start {
            return Err(MarketClockError::invalid(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let id = MarketId::parse(market)?;
        let market = self.resolve(&id)?;
        let (first, last) = self.store.available_date_range(&market.fin_id)?;
        for requested in [start, end] {
            ensure_available(&market, requested, first, last)?;
        }
        self.phase_iter(&market, start, end, first)
    }

    /// Collect [`generate_phases`](Self::generate_phases) into a vector.
    pub fn phases_for(
        &self,
        market: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ConcretePhase>> {
        self.generate_phases(market, start, end)?.collect()
    }

    /// Status of the market at `instant`, taken in the market's timezone.
    pub fn status<T: TimeZone>(&self, market: &str, instant: &DateTime<T>) -> Result<MarketStatus> {
        let id = MarketId::parse(market)?;
        let market = self.resolve(&id)?;
        let instant = instant.with_timezone(&market.timezone);
        let date = instant.date_naive();

        let (first, last) = self.store.available_date_range(&market.fin_id)?;
        ensure_available(&market, date, first, last)?;
        let horizon = date + Duration::days(i64::from(self.config.status_horizon_days));
        let horizon_end = horizon.min(last);

        let phases = self.phase_iter(&market, date, horizon_end, first)?;
        let holiday = phases.holidays().get(&date).cloned();
        let phases: Vec<ConcretePhase> = phases.collect::<Result<_>>()?;

        let window = StatusWindow {
            fin_id: &market.fin_id,
            timezone: market.timezone,
            phases: &phases,
            holiday: holiday.as_ref(),
            horizon_end,
        };
        Ok(project(&window, &instant))
    }

    fn resolve(&self, id: &MarketId) -> Result<Market> {
        let fin_id = match id {
            MarketId::Fin(fin_id) => fin_id.clone(),
            MarketId::Mic(mic) => self.store.market_by_mic(mic)?,
        };
        let mut market = self.store.market(&fin_id)?;
        if !self.config.follow_replacements {
            return Ok(market);
        }

        let mut seen = BTreeSet::new();
        seen.insert(market.fin_id.clone());
        while let Some(next) = market.replaced_by.clone() {
            if !seen.insert(next.clone()) {
                return Err(MarketClockError::invalid(format!(
                    "replacement chain of {fin_id} loops back to {next}"
                )));
            }
            debug!(from = %market.fin_id, to = %next, "market replaced, following");
            market = self.store.market(&next)?;
        }
        Ok(market)
    }

    fn phase_iter(
        &self,
        market: &Market,
        start: NaiveDate,
        end: NaiveDate,
        first_available: NaiveDate,
    ) -> Result<PhaseIter<'s, S>> {
        let lookback = self.config.lookback_days;
        let scan_start = (start - Duration::days(i64::from(lookback))).max(first_available);

        let rules = self.store.schedule_rules(&market.fin_id)?;
        if let Some(rule) = rules.iter().find(|r| r.offset_days > lookback) {
            return Err(MarketClockError::invalid(format!(
                "{} '{}' ends {} days after it starts, more than the {lookback}-day lookback",
                rule.fin_id, rule.phase_type, rule.offset_days
            )));
        }
        let holidays = self.store.holiday_overrides(&market.fin_id, scan_start, end)?;
        let catalog = self.store.phase_catalog()?;
        debug!(
            fin_id = %market.fin_id,
            %scan_start,
            %start,
            %end,
            rules = rules.len(),
            holidays = holidays.len(),
            "generating phases"
        );
        Ok(PhaseIter::new(
            self.store, rules, holidays, catalog, scan_start, start, end,
        ))
    }
}

fn ensure_available(
    market: &Market,
    requested: NaiveDate,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<()> {
    if requested < first || requested > last {
        return Err(MarketClockError::DateNotAvailable {
            fin_id: market.fin_id.to_string(),
            requested,
            first,
            last,
        });
    }
    Ok(())
}
