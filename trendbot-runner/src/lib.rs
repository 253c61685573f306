//! TrendBot Runner — session orchestration over the core engine.
//!
//! - Indicator snapshot feeds (in-memory, CSV, seeded synthetic)
//! - TOML session configuration
//! - The bar-by-bar session runner and its report

pub mod config;
pub mod feed;
pub mod session;

pub use config::{BotConfig, ConfigError, InstrumentConfig};
pub use feed::{CsvFeed, FeedError, IndicatorFeed, SyntheticConfig, SyntheticFeed, VecFeed};
pub use session::{EquityPoint, SessionReport, SessionRunner};
