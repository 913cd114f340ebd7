//! Correlation-based exposure reduction.
//!
//! Two call sites, two mechanisms:
//! - `adjust` rescales an existing set of position sizes so the implied
//!   portfolio volatility stays at or below target (uniform shrink, relative
//!   sizing preserved)
//! - `prune` greedily admits new candidates by priority score, refusing any
//!   candidate too correlated to one already admitted
//!
//! Missing correlation entries are treated as fully correlated (1.0) in both
//! paths. Understating joint risk is the worse failure mode for a
//! risk-reduction system.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::CorrelationMatrix;

/// Correlation adjuster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationAdjusterConfig {
    /// Target annualized volatility for the joint position set.
    pub target_portfolio_volatility: f64,
    /// Correlation at or above which an admitted candidate is logged as
    /// elevated. Actual size reduction happens through the quadratic form.
    pub reduce_threshold: f64,
    /// Correlation at or above which a candidate is refused admission.
    pub block_threshold: f64,
    /// Maximum number of candidates admitted per cycle.
    pub max_admitted: usize,
}

impl Default for CorrelationAdjusterConfig {
    fn default() -> Self {
        Self {
            target_portfolio_volatility: 0.10,
            reduce_threshold: 0.60,
            block_threshold: 0.75,
            max_admitted: 10,
        }
    }
}

/// A candidate position competing for admission.
#[derive(Debug, Clone)]
pub struct PruneCandidate {
    pub asset_id: String,
    /// Priority score, e.g. expected edge. Higher is admitted first.
    pub score: f64,
}

/// Shrinks joint exposure when correlations push portfolio volatility over
/// target.
pub struct CorrelationAdjuster {
    config: CorrelationAdjusterConfig,
}

impl CorrelationAdjuster {
    pub fn new(config: CorrelationAdjusterConfig) -> Self {
        Self { config }
    }

    /// Correlation for the quadratic form; missing entries resolve to 1.0.
    fn rho(matrix: &CorrelationMatrix, a: &str, b: &str) -> f64 {
        matrix.get(a, b).unwrap_or(1.0)
    }

    /// Implied portfolio volatility of a size vector under the matrix:
    /// sqrt of the quadratic form over pairwise correlations.
    pub fn implied_volatility(
        sizes: &HashMap<String, f64>,
        matrix: &CorrelationMatrix,
    ) -> f64 {
        let ids: Vec<&String> = sizes.keys().collect();
        let mut variance = 0.0;
        for a in &ids {
            for b in &ids {
                variance += sizes[*a] * sizes[*b] * Self::rho(matrix, a, b);
            }
        }
        variance.max(0.0).sqrt()
    }

    /// Uniformly rescale sizes so implied portfolio volatility does not
    /// exceed target. Relative sizing across assets is preserved.
    pub fn adjust(
        &self,
        sizes: &HashMap<String, f64>,
        matrix: &CorrelationMatrix,
    ) -> HashMap<String, f64> {
        if sizes.is_empty() {
            return HashMap::new();
        }

        let implied = Self::implied_volatility(sizes, matrix);
        if implied <= self.config.target_portfolio_volatility || implied == 0.0 {
            return sizes.clone();
        }

        let scale = self.config.target_portfolio_volatility / implied;
        debug!(
            implied_vol = implied,
            target = self.config.target_portfolio_volatility,
            scale,
            "shrinking joint exposure"
        );
        sizes
            .iter()
            .map(|(id, size)| (id.clone(), size * scale))
            .collect()
    }

    /// Greedy admission: process candidates in descending score order, admit
    /// only those whose correlation to every already-admitted candidate is
    /// below the block threshold, stop at the admission cap.
    pub fn prune(
        &self,
        candidates: &[PruneCandidate],
        matrix: &CorrelationMatrix,
    ) -> Vec<String> {
        let mut ordered: Vec<&PruneCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut admitted: Vec<String> = Vec::new();
        for candidate in ordered {
            if admitted.len() >= self.config.max_admitted {
                break;
            }
            let max_rho = admitted
                .iter()
                .map(|held| Self::rho(matrix, held, &candidate.asset_id))
                .fold(f64::NEG_INFINITY, f64::max);
            if max_rho >= self.config.block_threshold {
                debug!(asset = %candidate.asset_id, max_rho, "candidate blocked by correlation");
                continue;
            }
            if max_rho >= self.config.reduce_threshold {
                debug!(
                    asset = %candidate.asset_id,
                    max_rho, "candidate admitted with elevated correlation"
                );
            }
            admitted.push(candidate.asset_id.clone());
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjuster() -> CorrelationAdjuster {
        CorrelationAdjuster::new(CorrelationAdjusterConfig::default())
    }

    fn sizes(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_under_target_untouched() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert("A", "B", 0.0);
        let input = sizes(&[("A", 0.05), ("B", 0.05)]);
        let out = adjuster().adjust(&input, &matrix);
        // Implied vol sqrt(0.05^2 + 0.05^2) ~= 0.0707 < 0.10
        assert_eq!(out["A"], 0.05);
        assert_eq!(out["B"], 0.05);
    }

    #[test]
    fn test_over_target_uniform_shrink() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert("A", "B", 1.0);
        let input = sizes(&[("A", 0.10), ("B", 0.05)]);
        let out = adjuster().adjust(&input, &matrix);

        // Fully correlated: implied vol = 0.15, shrink to 0.10.
        let ratio_before = input["A"] / input["B"];
        let ratio_after = out["A"] / out["B"];
        assert!((ratio_before - ratio_after).abs() < 1e-12);

        let implied = CorrelationAdjuster::implied_volatility(&out, &matrix);
        assert!((implied - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_missing_correlation_treated_as_one() {
        let full = {
            let mut m = CorrelationMatrix::new();
            m.insert("A", "B", 1.0);
            m
        };
        let missing = CorrelationMatrix::new();

        let input = sizes(&[("A", 0.10), ("B", 0.10)]);
        let adjusted_full = adjuster().adjust(&input, &full);
        let adjusted_missing = adjuster().adjust(&input, &missing);

        // Identical to the fully-correlated case, never better.
        assert!((adjusted_full["A"] - adjusted_missing["A"]).abs() < 1e-12);
        assert!((adjusted_full["B"] - adjusted_missing["B"]).abs() < 1e-12);
    }

    #[test]
    fn test_prune_orders_by_score() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert("A", "B", 0.9);
        matrix.insert("A", "C", 0.1);
        matrix.insert("B", "C", 0.1);

        let candidates = vec![
            PruneCandidate { asset_id: "A".to_string(), score: 0.5 },
            PruneCandidate { asset_id: "B".to_string(), score: 0.9 },
            PruneCandidate { asset_id: "C".to_string(), score: 0.2 },
        ];

        // B wins on score; A is blocked by its 0.9 correlation to B; C fits.
        let admitted = adjuster().prune(&candidates, &matrix);
        assert_eq!(admitted, vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_prune_missing_correlation_blocks() {
        let matrix = CorrelationMatrix::new();
        let candidates = vec![
            PruneCandidate { asset_id: "A".to_string(), score: 0.9 },
            PruneCandidate { asset_id: "B".to_string(), score: 0.5 },
        ];
        let admitted = adjuster().prune(&candidates, &matrix);
        assert_eq!(admitted, vec!["A".to_string()]);
    }

    #[test]
    fn test_prune_respects_cap() {
        let config = CorrelationAdjusterConfig {
            max_admitted: 2,
            ..Default::default()
        };
        let adjuster = CorrelationAdjuster::new(config);

        let mut matrix = CorrelationMatrix::new();
        for pair in [("A", "B"), ("A", "C"), ("B", "C")] {
            matrix.insert(pair.0, pair.1, 0.0);
        }
        let candidates: Vec<PruneCandidate> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, id)| PruneCandidate {
                asset_id: id.to_string(),
                score: 1.0 - i as f64 * 0.1,
            })
            .collect();

        assert_eq!(adjuster.prune(&candidates, &matrix).len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let out = adjuster().adjust(&HashMap::new(), &CorrelationMatrix::new());
        assert!(out.is_empty());
    }
}
