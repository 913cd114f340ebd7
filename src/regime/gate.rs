//! Regime gate.
//!
//! Momentum-crash protection driven by an external regime classification and
//! two crash indicators:
//! - VIX above threshold halves momentum strategies
//! - A trailing 5-day portfolio return below the crash threshold pauses new
//!   momentum entries entirely until the window recovers
//!
//! Contrarian strategies are not penalized by high volatility; mean-reversion
//! opportunity tends to increase in high-vol regimes. Neutral strategies are
//! never adjusted here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{MomentumCrashSignal, RegimeLabel, RegimeSignal, StrategyCategory};

/// Regime gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeGateConfig {
    /// VIX level above which momentum strategies are de-rated.
    pub vix_threshold: f64,
    /// Scalar applied to momentum strategies above the VIX threshold.
    pub vix_momentum_scale: f64,
    /// Trailing 5-day portfolio return below which momentum entries pause.
    pub crash_return_threshold: f64,
}

impl Default for RegimeGateConfig {
    fn default() -> Self {
        Self {
            vix_threshold: 30.0,
            vix_momentum_scale: 0.5,
            crash_return_threshold: -0.05,
        }
    }
}

/// Applies regime-conditional scalars per strategy category.
pub struct RegimeGate {
    config: RegimeGateConfig,
}

impl RegimeGate {
    pub fn new(config: RegimeGateConfig) -> Self {
        Self { config }
    }

    /// Multiplicative scalar in [0, 1] for a strategy of the given category
    /// under the current regime and crash indicators.
    pub fn scalar_for(
        &self,
        category: StrategyCategory,
        regime: &RegimeSignal,
        crash: &MomentumCrashSignal,
    ) -> f64 {
        match category {
            StrategyCategory::Momentum => {
                if crash.trailing_5d_return < self.config.crash_return_threshold {
                    debug!(
                        trailing_5d = crash.trailing_5d_return,
                        "momentum entries paused by crash window"
                    );
                    return 0.0;
                }
                // A high-vol regime label stands in for the VIX reading when
                // the index itself is stale or missing.
                if crash.vix > self.config.vix_threshold
                    || regime.label == RegimeLabel::HighVol
                {
                    debug!(vix = crash.vix, regime = ?regime.label, "momentum de-rated by volatility gate");
                    return self.config.vix_momentum_scale;
                }
                1.0
            }
            // High volatility is opportunity, not risk, for mean reversion.
            StrategyCategory::Contrarian => 1.0,
            StrategyCategory::Neutral => 1.0,
        }
    }
}
