//! External capability boundaries.
//!
//! The engine never does blocking I/O itself; market data, trade history, and
//! regime classifications arrive through these traits, injected at
//! construction time. A failing provider maps to `DataUnavailable`, which the
//! engine absorbs by degrading to conservative defaults.

use rust_decimal::Decimal;

use crate::errors::RiskResult;
use crate::throttle::EquityCurveState;

use super::types::{RegimeSignal, ReturnSeries, TradeRecord};

/// Source of historical return series.
pub trait PriceFeed {
    /// Return series for an asset over the trailing `lookback` observations.
    fn get_return_series(&self, asset_id: &str, lookback: usize) -> RiskResult<ReturnSeries>;
}

/// Record of realized trades and equity updates.
pub trait TradeLedger {
    /// Closed trades for a (strategy, asset_class) pair.
    fn get_closed_trades(
        &self,
        strategy: &str,
        asset_class: &str,
    ) -> RiskResult<Vec<TradeRecord>>;

    /// Apply a realized P&L delta and return the updated equity state.
    ///
    /// Must be called under a single-writer discipline; drawdown tier
    /// transitions are not safe against torn reads of peak/current equity.
    fn record_equity_update(&mut self, delta: Decimal) -> RiskResult<EquityCurveState>;
}

/// External market-regime classification.
pub trait RegimeProvider {
    fn current_regime(&self) -> RiskResult<RegimeSignal>;
}
