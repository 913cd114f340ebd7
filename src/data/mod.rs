//! Data model and external capability boundaries.
//!
//! Provides:
//! - Return series, trade records, and per-strategy performance aggregation
//! - The symmetric correlation matrix (missing entries stay missing)
//! - Regime and momentum-crash signal types
//! - `PriceFeed` / `TradeLedger` / `RegimeProvider` capability traits

pub mod feeds;
pub mod types;

pub use feeds::{PriceFeed, RegimeProvider, TradeLedger};
pub use types::{
    CorrelationMatrix, MomentumCrashSignal, RegimeLabel, RegimeSignal, ReturnSeries,
    StrategyCategory, StrategyPerformanceRecord, TradeDirection, TradeRecord,
};
