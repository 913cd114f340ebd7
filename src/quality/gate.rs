//! Signal quality gate.
//!
//! Decides whether a strategy's track record is strong enough to size
//! positions at all:
//! - Sample size: not enough evidence below the minimum trade count
//! - Edge: Kelly fraction must be positive
//! - Multiple-testing: deflated Sharpe ratio must clear 0.5, with a
//!   marginal band up to 0.95 that caps the maximum size downstream
//!
//! Pure and stateless given its inputs; runs once per (strategy, asset_class)
//! pair at the start of each sizing cycle.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::StrategyPerformanceRecord;
use crate::stats;

/// Quality classification from the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFlag {
    /// Not eligible to size positions.
    Rejected,
    /// Eligible but capped at a reduced maximum size (0.5 <= dsr < 0.95).
    Marginal,
    /// Eligible at the full maximum size (dsr >= 0.95).
    Strong,
}

/// Outcome of a quality evaluation.
#[derive(Debug, Clone)]
pub struct GateResult {
    pub eligible: bool,
    pub flag: QualityFlag,
    pub reasons: Vec<String>,
    /// Deflated Sharpe ratio used for the skill test.
    pub dsr: f64,
    /// Raw Kelly fraction from the record's win/loss profile.
    pub kelly: f64,
}

impl GateResult {
    fn rejected(reasons: Vec<String>, dsr: f64, kelly: f64) -> Self {
        Self {
            eligible: false,
            flag: QualityFlag::Rejected,
            reasons,
            dsr,
            kelly,
        }
    }
}

/// Quality gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalQualityGateConfig {
    /// Minimum closed trades before a strategy may size positions.
    pub min_sample_size: usize,
    /// DSR below which the strategy is rejected outright.
    pub dsr_reject_threshold: f64,
    /// DSR at or above which the strategy is flagged strong.
    pub dsr_strong_threshold: f64,
}

impl Default for SignalQualityGateConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 10,
            dsr_reject_threshold: 0.5,
            dsr_strong_threshold: 0.95,
        }
    }
}

/// Evaluates whether a strategy is allowed to size positions.
pub struct SignalQualityGate {
    config: SignalQualityGateConfig,
}

impl SignalQualityGate {
    pub fn new(config: SignalQualityGateConfig) -> Self {
        Self { config }
    }

    /// Evaluate one performance record against the gate policy.
    ///
    /// `num_strategies_in_universe` is the number of candidate strategies
    /// competing in this universe; it sets the multiple-testing bar.
    pub fn evaluate(
        &self,
        record: &StrategyPerformanceRecord,
        num_strategies_in_universe: usize,
    ) -> GateResult {
        let kelly =
            stats::kelly_fraction(record.win_rate, record.avg_win_pct, record.avg_loss_pct);

        if record.sample_size < self.config.min_sample_size {
            let reason = format!(
                "not enough evidence: {} trades, minimum {}",
                record.sample_size, self.config.min_sample_size
            );
            debug!(strategy = %record.strategy, %reason, "quality gate rejection");
            return GateResult::rejected(vec![reason], 0.0, kelly);
        }

        if kelly <= 0.0 {
            let reason = format!(
                "negative edge: kelly {:.4} from win rate {:.2} and payoff {:.2}/{:.2}",
                kelly, record.win_rate, record.avg_win_pct, record.avg_loss_pct
            );
            debug!(strategy = %record.strategy, %reason, "quality gate rejection");
            return GateResult::rejected(vec![reason], 0.0, kelly);
        }

        let deflated = stats::deflated_sharpe_ratio(
            record.sharpe,
            num_strategies_in_universe.max(1),
            record.sample_size,
            0.0,
            3.0,
        );

        if deflated.dsr < self.config.dsr_reject_threshold {
            let reason = format!(
                "likely multiple-testing luck: dsr {:.3} below {:.2} \
                 ({} strategies tested, expected max sharpe {:.3})",
                deflated.dsr,
                self.config.dsr_reject_threshold,
                num_strategies_in_universe,
                deflated.expected_max_sharpe
            );
            debug!(strategy = %record.strategy, %reason, "quality gate rejection");
            return GateResult::rejected(vec![reason], deflated.dsr, kelly);
        }

        let flag = if deflated.dsr >= self.config.dsr_strong_threshold {
            QualityFlag::Strong
        } else {
            QualityFlag::Marginal
        };

        GateResult {
            eligible: true,
            flag,
            reasons: Vec::new(),
            dsr: deflated.dsr,
            kelly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        sample_size: usize,
        win_rate: f64,
        avg_win: f64,
        avg_loss: f64,
        sharpe: f64,
    ) -> StrategyPerformanceRecord {
        StrategyPerformanceRecord {
            strategy: "trend".to_string(),
            asset_class: "equity".to_string(),
            sample_size,
            win_rate,
            avg_win_pct: avg_win,
            avg_loss_pct: avg_loss,
            sharpe,
            sortino: None,
        }
    }

    fn gate() -> SignalQualityGate {
        SignalQualityGate::new(SignalQualityGateConfig::default())
    }

    #[test]
    fn test_small_sample_rejected() {
        let result = gate().evaluate(&record(5, 0.60, 5.0, 3.0, 0.8), 5);
        assert!(!result.eligible);
        assert_eq!(result.flag, QualityFlag::Rejected);
        assert!(result.reasons[0].contains("not enough evidence"));
    }

    #[test]
    fn test_negative_edge_rejected() {
        // 30% win rate at 1:2 payoff is a clearly negative edge.
        let result = gate().evaluate(&record(50, 0.30, 1.0, 2.0, 0.1), 5);
        assert!(!result.eligible);
        assert!(result.reasons[0].contains("negative edge"));
    }

    #[test]
    fn test_low_dsr_rejected() {
        // Positive edge but weak per-trade sharpe against a 50-strategy universe.
        let result = gate().evaluate(&record(50, 0.55, 5.0, 3.0, 0.05), 50);
        assert!(!result.eligible);
        assert!(result.reasons[0].contains("multiple-testing"));
        assert!(result.dsr < 0.5);
    }

    #[test]
    fn test_strong_strategy_passes() {
        let result = gate().evaluate(&record(50, 0.55, 5.0, 3.0, 0.8), 5);
        assert!(result.eligible);
        assert_eq!(result.flag, QualityFlag::Strong);
        assert!(result.dsr >= 0.95);
        assert!(result.kelly > 0.0);
    }

    #[test]
    fn test_marginal_band() {
        // Moderate per-trade sharpe against a moderate universe lands between
        // the reject and strong thresholds.
        let result = gate().evaluate(&record(50, 0.55, 5.0, 3.0, 0.30), 10);
        assert!(result.eligible);
        assert_eq!(result.flag, QualityFlag::Marginal);
        assert!(result.dsr >= 0.5 && result.dsr < 0.95);
    }
}
