//! Engine configuration.
//!
//! All risk knobs live here with their documented defaults. Configuration is
//! validated once at load time; an invalid configuration is a fatal startup
//! error and is never tolerated at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{RiskError, RiskResult};

/// Full configuration surface for the position-sizing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target annualized volatility per position.
    pub target_volatility: f64,
    /// Target annualized volatility for the whole portfolio.
    pub target_portfolio_volatility: f64,
    /// Minimum position size as fraction of equity.
    pub min_position_size: f64,
    /// Maximum position size as fraction of equity.
    pub max_position_size: f64,
    /// Maximum summed fraction allocated to a single strategy.
    pub max_capital_per_strategy: f64,
    /// Maximum summed fraction allocated to one trade direction.
    pub max_capital_per_direction: f64,

    /// Correlation above which joint exposure is rescaled.
    pub correlation_reduce_threshold: f64,
    /// Correlation above which a new candidate is refused outright.
    pub correlation_block_threshold: f64,
    /// Maximum number of candidates admitted by greedy pruning.
    pub max_admitted_positions: usize,
    /// Minimum aligned observations for a correlation estimate.
    pub min_correlation_overlap: usize,

    /// Drawdown tiers as fractions of the high-water mark.
    pub drawdown_tier1_pct: f64,
    pub drawdown_tier2_pct: f64,
    pub drawdown_tier3_pct: f64,
    /// Minimum hours a halt persists even if drawdown recovers.
    pub halt_cooldown_hours: i64,

    /// Trailing window for the rolling Sharpe gate (days).
    pub sharpe_window_days: usize,
    /// Consecutive negative-Sharpe days before the crisis scalar applies.
    pub sharpe_crisis_days: usize,
    /// Multiplicative scalar applied during a rolling-Sharpe crisis.
    pub sharpe_crisis_scalar: f64,

    /// Confidence level for CVaR (e.g. 0.95 = worst 5% tail).
    pub cvar_confidence: f64,
    /// Maximum tolerated CVaR magnitude before de-rating.
    pub cvar_max_pct: f64,

    /// VIX level above which momentum strategies are de-rated.
    pub vix_threshold: f64,
    /// Scalar applied to momentum strategies above the VIX threshold.
    pub vix_momentum_scale: f64,
    /// Trailing 5-day portfolio return below which momentum entries pause.
    pub crash_return_threshold: f64,

    /// Hard cap on the half-Kelly size.
    pub kelly_cap: f64,
    /// Weight of the volatility-target size in the blend (Kelly gets the rest).
    pub vol_blend_weight: f64,

    /// Minimum closed trades before a strategy may size positions.
    pub min_sample_size: usize,
    /// Marginal-quality strategies are capped at max_position_size / this.
    pub marginal_cap_divisor: f64,

    /// Return observations per year used for annualization.
    pub periods_per_year: f64,
    /// Guard against division by near-zero volatility.
    pub epsilon_volatility: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_volatility: 0.10,
            target_portfolio_volatility: 0.10,
            min_position_size: 0.01,
            max_position_size: 0.15,
            max_capital_per_strategy: 0.25,
            max_capital_per_direction: 0.50,
            correlation_reduce_threshold: 0.60,
            correlation_block_threshold: 0.75,
            max_admitted_positions: 10,
            min_correlation_overlap: 20,
            drawdown_tier1_pct: 0.10,
            drawdown_tier2_pct: 0.15,
            drawdown_tier3_pct: 0.20,
            halt_cooldown_hours: 48,
            sharpe_window_days: 30,
            sharpe_crisis_days: 14,
            sharpe_crisis_scalar: 0.25,
            cvar_confidence: 0.95,
            cvar_max_pct: 0.08,
            vix_threshold: 30.0,
            vix_momentum_scale: 0.5,
            crash_return_threshold: -0.05,
            kelly_cap: 0.25,
            vol_blend_weight: 0.60,
            min_sample_size: 10,
            marginal_cap_divisor: 3.0,
            periods_per_year: 252.0,
            epsilon_volatility: 1e-6,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> RiskResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RiskError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| RiskError::Configuration(format!("parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate internal consistency. Called at startup; an error here is fatal.
    pub fn validate(&self) -> RiskResult<()> {
        fn fraction(name: &str, v: f64) -> RiskResult<()> {
            if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                return Err(RiskError::Configuration(format!(
                    "{} must be in [0, 1], got {}",
                    name, v
                )));
            }
            Ok(())
        }

        fraction("min_position_size", self.min_position_size)?;
        fraction("max_position_size", self.max_position_size)?;
        fraction("max_capital_per_strategy", self.max_capital_per_strategy)?;
        fraction("max_capital_per_direction", self.max_capital_per_direction)?;
        fraction("vol_blend_weight", self.vol_blend_weight)?;
        fraction("kelly_cap", self.kelly_cap)?;
        fraction("vix_momentum_scale", self.vix_momentum_scale)?;
        fraction("sharpe_crisis_scalar", self.sharpe_crisis_scalar)?;

        if self.min_position_size > self.max_position_size {
            return Err(RiskError::Configuration(format!(
                "min_position_size {} > max_position_size {}",
                self.min_position_size, self.max_position_size
            )));
        }

        if !(self.drawdown_tier1_pct < self.drawdown_tier2_pct
            && self.drawdown_tier2_pct < self.drawdown_tier3_pct)
        {
            return Err(RiskError::Configuration(format!(
                "drawdown tiers must be strictly increasing: {} / {} / {}",
                self.drawdown_tier1_pct, self.drawdown_tier2_pct, self.drawdown_tier3_pct
            )));
        }

        if !(0.5..1.0).contains(&self.cvar_confidence) {
            return Err(RiskError::Configuration(format!(
                "cvar_confidence must be in [0.5, 1.0), got {}",
                self.cvar_confidence
            )));
        }

        if self.target_volatility <= 0.0 || self.target_portfolio_volatility <= 0.0 {
            return Err(RiskError::Configuration(
                "target volatilities must be positive".to_string(),
            ));
        }

        if self.correlation_block_threshold < self.correlation_reduce_threshold {
            return Err(RiskError::Configuration(format!(
                "correlation_block_threshold {} < correlation_reduce_threshold {}",
                self.correlation_block_threshold, self.correlation_reduce_threshold
            )));
        }

        if self.marginal_cap_divisor < 1.0 {
            return Err(RiskError::Configuration(
                "marginal_cap_divisor must be >= 1".to_string(),
            ));
        }

        if self.periods_per_year <= 0.0 {
            return Err(RiskError::Configuration(
                "periods_per_year must be positive".to_string(),
            ));
        }

        if self.halt_cooldown_hours < 0 {
            return Err(RiskError::Configuration(
                "halt_cooldown_hours must be non-negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Maximum size for a marginal-quality strategy.
    pub fn marginal_cap(&self) -> f64 {
        self.max_position_size / self.marginal_cap_divisor
    }
}
