//! Core data types for the risk engine.
//!
//! These are the values that flow between the gates: return histories,
//! aggregated strategy performance, the correlation matrix, and the regime
//! signals consumed by momentum-crash protection.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stats;

/// Ordered sequence of (date, return) observations for one asset or strategy.
///
/// Immutable once constructed; observations are sorted by date at build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnSeries {
    observations: Vec<(NaiveDate, f64)>,
}

impl ReturnSeries {
    pub fn new(mut observations: Vec<(NaiveDate, f64)>) -> Self {
        observations.sort_by_key(|(date, _)| *date);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|(_, r)| *r).collect()
    }

    pub fn observations(&self) -> &[(NaiveDate, f64)] {
        &self.observations
    }

    /// Returns for the dates present in both series, aligned pairwise.
    pub fn aligned_with(&self, other: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
        let by_date: HashMap<NaiveDate, f64> =
            other.observations.iter().copied().collect();

        let mut a = Vec::new();
        let mut b = Vec::new();
        for (date, r) in &self.observations {
            if let Some(other_r) = by_date.get(date) {
                a.push(*r);
                b.push(*other_r);
            }
        }
        (a, b)
    }

    /// Sum of returns over the trailing `days` observations.
    pub fn trailing_return(&self, days: usize) -> Option<f64> {
        if self.observations.len() < days || days == 0 {
            return None;
        }
        Some(
            self.observations[self.observations.len() - days..]
                .iter()
                .map(|(_, r)| r)
                .sum(),
        )
    }
}

/// A single closed trade as reported by the trade ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub strategy: String,
    pub asset_class: String,
    pub opened: NaiveDate,
    pub closed: NaiveDate,
    /// Realized P&L as a percentage of the capital committed to the trade.
    pub pnl_pct: f64,
    /// Realized P&L in account currency.
    pub pnl: Decimal,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}

/// Aggregated statistics for one (strategy, asset_class) pair.
///
/// Recomputed from closed trades on every sizing cycle; never mutated in
/// place. `avg_loss_pct` is stored as a positive magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPerformanceRecord {
    pub strategy: String,
    pub asset_class: String,
    pub sample_size: usize,
    pub win_rate: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    /// Per-trade Sharpe ratio (not annualized).
    pub sharpe: f64,
    /// Per-trade Sortino ratio, when downside observations exist.
    pub sortino: Option<f64>,
}

impl StrategyPerformanceRecord {
    /// Aggregate closed trades into a fresh performance record.
    pub fn from_trades(strategy: &str, asset_class: &str, trades: &[TradeRecord]) -> Self {
        let sample_size = trades.len();
        let winners: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl_pct)
            .collect();
        let losers: Vec<f64> = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl_pct)
            .collect();

        let win_rate = if sample_size > 0 {
            winners.len() as f64 / sample_size as f64
        } else {
            0.0
        };
        let avg_win_pct = if winners.is_empty() {
            0.0
        } else {
            winners.iter().sum::<f64>() / winners.len() as f64
        };
        let avg_loss_pct = if losers.is_empty() {
            0.0
        } else {
            (losers.iter().sum::<f64>() / losers.len() as f64).abs()
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let sharpe = stats::sharpe_ratio_raw(&returns, 0.0);
        let sortino = stats::sortino_ratio_raw(&returns);

        Self {
            strategy: strategy.to_string(),
            asset_class: asset_class.to_string(),
            sample_size,
            win_rate,
            avg_win_pct,
            avg_loss_pct,
            sharpe,
            sortino,
        }
    }
}

/// Symmetric correlation matrix over asset identifiers.
///
/// Entries exist only where they could be computed from at least the minimum
/// aligned window; the diagonal is implicitly 1. Missing entries stay missing
/// so that callers can apply their own conservative treatment.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMatrix {
    entries: HashMap<(String, String), f64>,
}

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Insert a pairwise correlation. Values are clamped to [-1, 1].
    pub fn insert(&mut self, a: &str, b: &str, rho: f64) {
        if a == b {
            return;
        }
        self.entries.insert(Self::key(a, b), rho.clamp(-1.0, 1.0));
    }

    /// Pairwise correlation, `None` when the entry could not be computed.
    /// The diagonal is always 1.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        self.entries.get(&Self::key(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a matrix from return series, skipping pairs with fewer than
    /// `min_overlap` aligned observations or with zero variance.
    pub fn from_series(series: &[(String, ReturnSeries)], min_overlap: usize) -> Self {
        let mut matrix = Self::new();
        for (i, (id_a, series_a)) in series.iter().enumerate() {
            for (id_b, series_b) in series.iter().skip(i + 1) {
                let (a, b) = series_a.aligned_with(series_b);
                if let Some(rho) = stats::correlation(&a, &b, min_overlap) {
                    matrix.insert(id_a, id_b, rho);
                }
            }
        }
        matrix
    }
}

/// Direction of a proposed trade, for per-direction capital caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

/// Style bucket a strategy belongs to, for regime gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyCategory {
    Momentum,
    Contrarian,
    Neutral,
}

/// Market regime label from the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeLabel {
    Bull,
    Bear,
    Sideways,
    HighVol,
}

/// Regime classification with the classifier's confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeSignal {
    pub label: RegimeLabel,
    pub confidence: f64,
}

impl RegimeSignal {
    pub fn neutral() -> Self {
        Self {
            label: RegimeLabel::Sideways,
            confidence: 0.0,
        }
    }
}

/// Inputs to momentum-crash protection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MomentumCrashSignal {
    /// VIX-equivalent volatility index level.
    pub vix: f64,
    /// Trailing 5-day portfolio return.
    pub trailing_5d_return: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn trade(pnl_pct: f64) -> TradeRecord {
        TradeRecord {
            strategy: "trend".to_string(),
            asset_class: "equity".to_string(),
            opened: date(1),
            closed: date(2),
            pnl_pct,
            pnl: dec!(100),
        }
    }

    #[test]
    fn test_series_sorted_on_build() {
        let series = ReturnSeries::new(vec![(date(3), 0.03), (date(1), 0.01), (date(2), 0.02)]);
        assert_eq!(series.values(), vec![0.01, 0.02, 0.03]);
    }

    #[test]
    fn test_aligned_overlap() {
        let a = ReturnSeries::new(vec![(date(1), 0.01), (date(2), 0.02), (date(3), 0.03)]);
        let b = ReturnSeries::new(vec![(date(2), -0.02), (date(3), -0.03), (date(4), -0.04)]);
        let (xa, xb) = a.aligned_with(&b);
        assert_eq!(xa, vec![0.02, 0.03]);
        assert_eq!(xb, vec![-0.02, -0.03]);
    }

    #[test]
    fn test_trailing_return() {
        let series = ReturnSeries::new(vec![
            (date(1), 0.01),
            (date(2), -0.02),
            (date(3), 0.03),
        ]);
        let trailing = series.trailing_return(2).unwrap();
        assert!((trailing - 0.01).abs() < 1e-12);
        assert!(series.trailing_return(5).is_none());
    }

    #[test]
    fn test_performance_record_aggregation() {
        let trades = vec![trade(5.0), trade(5.0), trade(-3.0), trade(-3.0)];
        let record = StrategyPerformanceRecord::from_trades("trend", "equity", &trades);
        assert_eq!(record.sample_size, 4);
        assert!((record.win_rate - 0.5).abs() < 1e-12);
        assert!((record.avg_win_pct - 5.0).abs() < 1e-12);
        assert!((record.avg_loss_pct - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_loss_magnitude_is_positive() {
        let trades = vec![trade(-4.0), trade(-2.0)];
        let record = StrategyPerformanceRecord::from_trades("trend", "equity", &trades);
        assert!((record.avg_loss_pct - 3.0).abs() < 1e-12);
        assert_eq!(record.win_rate, 0.0);
    }

    #[test]
    fn test_matrix_symmetry_and_diagonal() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert("SPY", "QQQ", 0.85);
        assert_eq!(matrix.get("QQQ", "SPY"), Some(0.85));
        assert_eq!(matrix.get("SPY", "SPY"), Some(1.0));
        assert_eq!(matrix.get("SPY", "GLD"), None);
    }

    #[test]
    fn test_matrix_clamps_values() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert("A", "B", 1.7);
        assert_eq!(matrix.get("A", "B"), Some(1.0));
    }

    #[test]
    fn test_matrix_from_series_skips_short_overlap() {
        let a = (
            "A".to_string(),
            ReturnSeries::new(vec![(date(1), 0.01), (date(2), 0.02)]),
        );
        let b = (
            "B".to_string(),
            ReturnSeries::new(vec![(date(1), 0.01), (date(2), 0.02)]),
        );
        let matrix = CorrelationMatrix::from_series(&[a, b], 20);
        assert!(matrix.get("A", "B").is_none());
    }
}
