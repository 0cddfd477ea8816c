//! MarketClock Core: reference data model, rule pipeline, phase materialization.
//!
//! This crate answers one question: for a market and a civil date range,
//! which trading phases are in effect, and is the market open at an instant.
//! - Domain types (schedule rules, holiday overrides, seasons, phase types, markets)
//! - Store seam (`ReferenceStore`) with in-memory and CSV-directory backends
//! - Per-date rule filter pipeline (group, in-force, season, weekday, fallback)
//! - Lazy phase materializer attaching local times to IANA timezones
//! - Point-in-time market status projection

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

pub use config::{ConfigError, EngineConfig, Settings};
pub use engine::Engine;
pub use error::{MarketClockError, Result};
