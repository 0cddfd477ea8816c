pub mod currency;
pub mod holiday;
pub mod ids;
pub mod market;
pub mod phase;
pub mod schedule;
pub mod season;
pub mod status;
pub mod weekday;

pub use currency::{Currency, CurrencyHoliday};
pub use holiday::HolidayOverride;
pub use ids::{CurrencyCode, FinId, MarketId, Mic};
pub use market::Market;
pub use phase::{ConcretePhase, PhaseCatalog, PhaseStatus, PhaseTypeInfo, PRIMARY_TRADING_SESSION};
pub use schedule::{ScheduleRule, REGULAR_GROUP};
pub use season::SeasonDefinition;
pub use status::MarketStatus;
pub use weekday::WeekdaySet;
