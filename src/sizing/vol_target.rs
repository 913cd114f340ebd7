//! Volatility targeting.
//!
//! Inverse-volatility weighting: a position is sized so that its expected
//! contribution matches the target volatility. Higher realized volatility
//! always means a smaller position.

use serde::{Deserialize, Serialize};

/// Volatility targeter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityTargeterConfig {
    /// Target annualized volatility per position.
    pub target_volatility: f64,
    /// Minimum position size as fraction of equity.
    pub min_size: f64,
    /// Maximum position size as fraction of equity.
    pub max_size: f64,
    /// Guard against division by near-zero volatility.
    pub epsilon: f64,
}

impl Default for VolatilityTargeterConfig {
    fn default() -> Self {
        Self {
            target_volatility: 0.10,
            min_size: 0.01,
            max_size: 0.15,
            epsilon: 1e-6,
        }
    }
}

/// Maps realized asset volatility to a target-volatility position size.
pub struct VolatilityTargeter {
    config: VolatilityTargeterConfig,
}

impl VolatilityTargeter {
    pub fn new(config: VolatilityTargeterConfig) -> Self {
        Self { config }
    }

    /// Position size for an asset with the given annualized volatility.
    ///
    /// `target / max(vol, epsilon)`, clamped to `[min_size, max_size]`.
    /// Non-increasing in volatility. A non-finite or non-positive volatility
    /// means the measurement is missing; that degrades to the minimum size.
    pub fn size(&self, asset_volatility: f64) -> f64 {
        if !asset_volatility.is_finite() || asset_volatility <= 0.0 {
            return self.config.min_size;
        }
        let raw = self.config.target_volatility / asset_volatility.max(self.config.epsilon);
        raw.clamp(self.config.min_size, self.config.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targeter() -> VolatilityTargeter {
        VolatilityTargeter::new(VolatilityTargeterConfig::default())
    }

    #[test]
    fn test_inverse_weighting() {
        // 20% vol against a 10% target -> half size, within bounds.
        let size = targeter().size(0.20);
        assert!((size - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_non_increasing() {
        let t = targeter();
        let vols = [0.01, 0.05, 0.10, 0.20, 0.40, 0.80, 1.60];
        for window in vols.windows(2) {
            assert!(t.size(window[0]) >= t.size(window[1]));
        }
    }

    #[test]
    fn test_clamped_to_bounds() {
        let t = targeter();
        // Very low vol clamps at the maximum, very high vol at the minimum.
        assert_eq!(t.size(0.001), 0.15);
        assert_eq!(t.size(50.0), 0.01);
    }

    #[test]
    fn test_missing_volatility_is_conservative() {
        let t = targeter();
        assert_eq!(t.size(f64::NAN), 0.01);
        assert_eq!(t.size(0.0), 0.01);
        assert_eq!(t.size(-0.2), 0.01);
    }
}
