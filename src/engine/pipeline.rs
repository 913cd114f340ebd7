//! Position-sizing orchestrator.
//!
//! Composes the independent risk gates into one pipeline per candidate:
//! 1. Signal quality gate (eligibility)
//! 2. Volatility-target size and half-Kelly size, blended 60/40
//! 3. Joint correlation adjustment across the full candidate set
//! 4. Drawdown throttle and regime gate scalars
//! 5. CVaR de-rating and the marginal-quality cap
//! 6. Clamp to [min_position_size, max_position_size]
//!
//! Every intermediate value is preserved in the decision; a stage that cannot
//! compute degrades to its most conservative value instead of failing the
//! cycle.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::data::{
    CorrelationMatrix, MomentumCrashSignal, RegimeSignal, ReturnSeries, StrategyCategory,
    StrategyPerformanceRecord, TradeDirection,
};
use crate::errors::RiskResult;
use crate::quality::{QualityFlag, SignalQualityGate, SignalQualityGateConfig};
use crate::regime::{RegimeGate, RegimeGateConfig};
use crate::sizing::{
    CorrelationAdjuster, CorrelationAdjusterConfig, VolatilityTargeter, VolatilityTargeterConfig,
};
use crate::stats;
use crate::throttle::DrawdownThrottle;

/// One candidate trade awaiting a sizing decision.
#[derive(Debug, Clone)]
pub struct SizingCandidate {
    pub strategy: String,
    pub asset: String,
    pub category: StrategyCategory,
    pub direction: TradeDirection,
    pub performance: StrategyPerformanceRecord,
    /// Annualized realized volatility; `None` when the price feed had no data.
    pub asset_volatility: Option<f64>,
    /// Return history for tail-risk checks; `None` when unavailable.
    pub asset_returns: Option<ReturnSeries>,
    /// Number of candidate strategies competing in this universe.
    pub num_strategies_in_universe: usize,
}

impl SizingCandidate {
    /// Build a candidate from a raw return history, deriving the volatility
    /// input and keeping the history for tail-risk checks. A history too
    /// short to measure volatility leaves the field empty, which the engine
    /// degrades to the minimum size.
    #[allow(clippy::too_many_arguments)]
    pub fn from_history(
        strategy: &str,
        asset: &str,
        category: StrategyCategory,
        direction: TradeDirection,
        performance: StrategyPerformanceRecord,
        returns: ReturnSeries,
        periods_per_year: f64,
        num_strategies_in_universe: usize,
    ) -> Self {
        let asset_volatility = stats::annualized_volatility(&returns, periods_per_year).ok();
        Self {
            strategy: strategy.to_string(),
            asset: asset.to_string(),
            category,
            direction,
            performance,
            asset_volatility,
            asset_returns: Some(returns),
            num_strategies_in_universe,
        }
    }
}

/// Intermediate values preserved for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionComponents {
    pub quality_gate_pass: bool,
    pub quality_flag: QualityFlag,
    pub dsr: f64,
    pub vol_target_size: f64,
    pub kelly_size: f64,
    pub blended_size: f64,
    pub corr_adjusted_size: f64,
    pub drawdown_scalar: f64,
    pub regime_scalar: f64,
    pub cvar_scalar: f64,
}

/// The engine's output for one (strategy, asset) candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecision {
    pub strategy: String,
    pub asset: String,
    /// Final bounded size fraction: in [min, max] or exactly 0 when gated.
    pub final_size_fraction: f64,
    pub components: DecisionComponents,
    /// Human-readable explanation of how the size was reached.
    pub rationale: String,
}

impl RiskDecision {
    pub fn is_actionable(&self) -> bool {
        self.final_size_fraction > 0.0
    }
}

/// Per-candidate result of the pure gate stage, before joint adjustment.
struct StagedCandidate {
    index: usize,
    eligible: bool,
    flag: QualityFlag,
    dsr: f64,
    reject_reason: Option<String>,
    vol_target_size: f64,
    kelly_size: f64,
    blended_size: f64,
    cvar_scalar: f64,
    vol_missing: bool,
}

/// The position-sizing engine.
pub struct PositionSizingEngine {
    config: EngineConfig,
    quality: SignalQualityGate,
    vol_targeter: VolatilityTargeter,
    corr_adjuster: CorrelationAdjuster,
    regime_gate: RegimeGate,
}

impl PositionSizingEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> RiskResult<Self> {
        config.validate()?;

        let quality = SignalQualityGate::new(SignalQualityGateConfig {
            min_sample_size: config.min_sample_size,
            ..Default::default()
        });
        let vol_targeter = VolatilityTargeter::new(VolatilityTargeterConfig {
            target_volatility: config.target_volatility,
            min_size: config.min_position_size,
            max_size: config.max_position_size,
            epsilon: config.epsilon_volatility,
        });
        let corr_adjuster = CorrelationAdjuster::new(CorrelationAdjusterConfig {
            target_portfolio_volatility: config.target_portfolio_volatility,
            reduce_threshold: config.correlation_reduce_threshold,
            block_threshold: config.correlation_block_threshold,
            max_admitted: config.max_admitted_positions,
        });
        let regime_gate = RegimeGate::new(RegimeGateConfig {
            vix_threshold: config.vix_threshold,
            vix_momentum_scale: config.vix_momentum_scale,
            crash_return_threshold: config.crash_return_threshold,
        });

        Ok(Self {
            config,
            quality,
            vol_targeter,
            corr_adjuster,
            regime_gate,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the pairwise correlation matrix from raw return series, using
    /// the configured minimum overlap. Pairs that cannot be estimated stay
    /// missing and are treated as fully correlated downstream.
    pub fn build_correlation_matrix(
        &self,
        series: &[(String, ReturnSeries)],
    ) -> CorrelationMatrix {
        CorrelationMatrix::from_series(series, self.config.min_correlation_overlap)
    }

    /// Size a full candidate set as one consistent cycle.
    ///
    /// The correlation adjustment is joint across all candidates; the
    /// drawdown and regime scalars apply globally. Always returns one
    /// decision per candidate, sized at zero when gated.
    pub fn size_cycle(
        &self,
        candidates: &[SizingCandidate],
        matrix: &CorrelationMatrix,
        throttle: &DrawdownThrottle,
        regime: &RegimeSignal,
        crash: &MomentumCrashSignal,
    ) -> Vec<RiskDecision> {
        // Stage 1: independent, pure per-candidate gates.
        let mut staged: Vec<StagedCandidate> = candidates
            .par_iter()
            .enumerate()
            .map(|(index, candidate)| self.stage_candidate(index, candidate))
            .collect();
        staged.sort_by_key(|s| s.index);

        // Stage 2: joint correlation adjustment over eligible blended sizes.
        let mut proposed: HashMap<String, f64> = HashMap::new();
        for (staged_candidate, candidate) in staged.iter().zip(candidates) {
            if staged_candidate.eligible {
                *proposed.entry(candidate.asset.clone()).or_insert(0.0) +=
                    staged_candidate.blended_size;
            }
        }
        let adjusted = self.corr_adjuster.adjust(&proposed, matrix);

        // Stage 3: global scalars and final assembly.
        let drawdown_scalar = throttle.scalar();
        let throttle_state = throttle.state();

        let mut decisions: Vec<RiskDecision> = staged
            .iter()
            .zip(candidates)
            .map(|(stage, candidate)| {
                let corr_factor = match proposed.get(&candidate.asset) {
                    Some(total) if *total > 0.0 => adjusted[&candidate.asset] / total,
                    _ => 1.0,
                };
                let regime_scalar =
                    self.regime_gate
                        .scalar_for(candidate.category, regime, crash);
                self.assemble_decision(
                    candidate,
                    stage,
                    corr_factor,
                    drawdown_scalar,
                    throttle_state.reason(),
                    regime_scalar,
                )
            })
            .collect();

        self.apply_group_caps(&mut decisions, candidates);

        info!(
            candidates = candidates.len(),
            actionable = decisions.iter().filter(|d| d.is_actionable()).count(),
            drawdown_scalar,
            "sizing cycle complete"
        );
        decisions
    }

    /// Convenience wrapper sizing a single candidate as a one-element cycle.
    pub fn size_position(
        &self,
        candidate: &SizingCandidate,
        matrix: &CorrelationMatrix,
        throttle: &DrawdownThrottle,
        regime: &RegimeSignal,
        crash: &MomentumCrashSignal,
    ) -> RiskDecision {
        let mut decisions =
            self.size_cycle(std::slice::from_ref(candidate), matrix, throttle, regime, crash);
        decisions.remove(0)
    }

    /// Pure per-candidate stage: quality gate, raw sizes, blend, CVaR scalar.
    fn stage_candidate(&self, index: usize, candidate: &SizingCandidate) -> StagedCandidate {
        let gate = self.quality.evaluate(
            &candidate.performance,
            candidate.num_strategies_in_universe,
        );

        if !gate.eligible {
            return StagedCandidate {
                index,
                eligible: false,
                flag: gate.flag,
                dsr: gate.dsr,
                reject_reason: gate.reasons.into_iter().next(),
                vol_target_size: 0.0,
                kelly_size: 0.0,
                blended_size: 0.0,
                cvar_scalar: 1.0,
                vol_missing: false,
            };
        }

        // Missing volatility degrades to the most conservative size rather
        // than failing the cycle.
        let vol_missing = candidate.asset_volatility.is_none();
        let vol_target_size = self
            .vol_targeter
            .size(candidate.asset_volatility.unwrap_or(f64::NAN));

        // Half-Kelly, never full Kelly: estimation error makes full Kelly
        // provably too aggressive.
        let kelly_size = (gate.kelly / 2.0).clamp(0.0, self.config.kelly_cap);

        let w = self.config.vol_blend_weight;
        let blended_size = w * vol_target_size + (1.0 - w) * kelly_size;

        let cvar_scalar = self.cvar_scalar(candidate);

        StagedCandidate {
            index,
            eligible: true,
            flag: gate.flag,
            dsr: gate.dsr,
            reject_reason: None,
            vol_target_size,
            kelly_size,
            blended_size,
            cvar_scalar,
            vol_missing,
        }
    }

    /// Tail-risk de-rating: when the empirical CVaR magnitude exceeds the
    /// configured maximum, shrink proportionally.
    fn cvar_scalar(&self, candidate: &SizingCandidate) -> f64 {
        let Some(returns) = &candidate.asset_returns else {
            return 1.0;
        };
        let Some(tail_mean) = stats::cvar(&returns.values(), self.config.cvar_confidence) else {
            return 1.0;
        };
        let magnitude = (-tail_mean).max(0.0);
        if magnitude > self.config.cvar_max_pct {
            self.config.cvar_max_pct / magnitude
        } else {
            1.0
        }
    }

    fn assemble_decision(
        &self,
        candidate: &SizingCandidate,
        stage: &StagedCandidate,
        corr_factor: f64,
        drawdown_scalar: f64,
        throttle_reason: &str,
        regime_scalar: f64,
    ) -> RiskDecision {
        if !stage.eligible {
            let reason = stage
                .reject_reason
                .clone()
                .unwrap_or_else(|| "quality gate rejection".to_string());
            return RiskDecision {
                strategy: candidate.strategy.clone(),
                asset: candidate.asset.clone(),
                final_size_fraction: 0.0,
                components: DecisionComponents {
                    quality_gate_pass: false,
                    quality_flag: stage.flag,
                    dsr: stage.dsr,
                    vol_target_size: 0.0,
                    kelly_size: 0.0,
                    blended_size: 0.0,
                    corr_adjusted_size: 0.0,
                    drawdown_scalar,
                    regime_scalar,
                    cvar_scalar: stage.cvar_scalar,
                },
                rationale: format!("sized at zero: {}", reason),
            };
        }

        let corr_adjusted_size = stage.blended_size * corr_factor;
        let product =
            corr_adjusted_size * drawdown_scalar * regime_scalar * stage.cvar_scalar;

        let max_size = if stage.flag == QualityFlag::Marginal {
            self.config.marginal_cap().max(self.config.min_position_size)
        } else {
            self.config.max_position_size
        };

        let final_size_fraction = if product <= 0.0 {
            0.0
        } else {
            product.clamp(self.config.min_position_size, max_size)
        };

        let mut notes: Vec<String> = Vec::new();
        if stage.vol_missing {
            notes.push("volatility data missing, minimum size used".to_string());
        }
        if stage.flag == QualityFlag::Marginal {
            notes.push(format!(
                "marginal quality (dsr {:.2}), cap reduced to {:.3}",
                stage.dsr, max_size
            ));
        }
        if corr_factor < 1.0 {
            notes.push(format!(
                "correlation shrink x{:.2} to hold portfolio volatility at target",
                corr_factor
            ));
        }
        if drawdown_scalar < 1.0 {
            notes.push(format!(
                "drawdown throttle x{:.2} ({})",
                drawdown_scalar, throttle_reason
            ));
        }
        if regime_scalar < 1.0 {
            notes.push(format!("regime gate x{:.2}", regime_scalar));
        }
        if stage.cvar_scalar < 1.0 {
            notes.push(format!("tail-risk de-rating x{:.2}", stage.cvar_scalar));
        }

        let rationale = format!(
            "quality {:?} (dsr {:.2}); vol-target {:.3}, half-kelly {:.3}, blend {:.3}; final {:.3}{}{}",
            stage.flag,
            stage.dsr,
            stage.vol_target_size,
            stage.kelly_size,
            stage.blended_size,
            final_size_fraction,
            if notes.is_empty() { "" } else { "; " },
            notes.join("; ")
        );

        RiskDecision {
            strategy: candidate.strategy.clone(),
            asset: candidate.asset.clone(),
            final_size_fraction,
            components: DecisionComponents {
                quality_gate_pass: true,
                quality_flag: stage.flag,
                dsr: stage.dsr,
                vol_target_size: stage.vol_target_size,
                kelly_size: stage.kelly_size,
                blended_size: stage.blended_size,
                corr_adjusted_size,
                drawdown_scalar,
                regime_scalar,
                cvar_scalar: stage.cvar_scalar,
            },
            rationale,
        }
    }

    /// Post-clamp caps on summed exposure per strategy and per direction.
    fn apply_group_caps(&self, decisions: &mut [RiskDecision], candidates: &[SizingCandidate]) {
        self.cap_group(
            decisions,
            candidates,
            self.config.max_capital_per_strategy,
            "strategy capital cap",
            |c| c.strategy.clone(),
        );
        self.cap_group(
            decisions,
            candidates,
            self.config.max_capital_per_direction,
            "direction capital cap",
            |c| format!("{:?}", c.direction),
        );
    }

    fn cap_group<F>(
        &self,
        decisions: &mut [RiskDecision],
        candidates: &[SizingCandidate],
        cap: f64,
        label: &str,
        key: F,
    ) where
        F: Fn(&SizingCandidate) -> String,
    {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for (decision, candidate) in decisions.iter().zip(candidates) {
            *totals.entry(key(candidate)).or_insert(0.0) += decision.final_size_fraction;
        }

        for (decision, candidate) in decisions.iter_mut().zip(candidates) {
            let total = totals[&key(candidate)];
            if total > cap && total > 0.0 {
                let scale = cap / total;
                let scaled = decision.final_size_fraction * scale;
                if scaled > 0.0 {
                    decision.final_size_fraction = scaled.max(self.config.min_position_size);
                    decision
                        .rationale
                        .push_str(&format!("; {} x{:.2}", label, scale));
                }
            }
        }
    }
}
