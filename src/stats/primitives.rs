//! Pure numeric primitives.
//!
//! No state, no side effects. Missing-data conditions are reported as
//! `InsufficientData` or `None`; nothing here fabricates a value.

use crate::data::ReturnSeries;
use crate::errors::{RiskError, RiskResult};

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Annualized volatility: stdev of returns scaled by sqrt(periods_per_year).
pub fn annualized_volatility(returns: &ReturnSeries, periods_per_year: f64) -> RiskResult<f64> {
    if returns.len() < 2 {
        return Err(RiskError::InsufficientData {
            what: "annualized volatility",
            needed: 2,
            available: returns.len(),
        });
    }
    Ok(stddev(&returns.values()) * periods_per_year.sqrt())
}

/// Pearson correlation over two aligned windows.
///
/// `None` when fewer than `min_overlap` aligned points exist or when either
/// series has zero variance: correlation is undefined there, and callers must
/// not silently treat the result as "uncorrelated".
pub fn correlation(a: &[f64], b: &[f64], min_overlap: usize) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < min_overlap.max(2) {
        return None;
    }
    let a = &a[..n];
    let b = &b[..n];

    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }

    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Per-period Sharpe ratio: mean excess return over stdev. 0 when stdev is 0.
pub fn sharpe_ratio_raw(returns: &[f64], risk_free_rate: f64) -> f64 {
    let sd = stddev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    (mean(returns) - risk_free_rate) / sd
}

/// Annualized Sharpe ratio.
pub fn sharpe_ratio(returns: &ReturnSeries, risk_free_rate: f64, periods_per_year: f64) -> f64 {
    sharpe_ratio_raw(&returns.values(), risk_free_rate) * periods_per_year.sqrt()
}

/// Per-period Sortino ratio (downside deviation denominator).
///
/// `None` when there are no negative observations to measure downside with.
pub fn sortino_ratio_raw(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return None;
    }
    let downside_dev = (downside.iter().map(|r| r.powi(2)).sum::<f64>()
        / returns.len() as f64)
        .sqrt();
    if downside_dev == 0.0 {
        return None;
    }
    Some(mean(returns) / downside_dev)
}

/// Annualized Sortino ratio; 0 when downside deviation is undefined.
pub fn sortino_ratio(returns: &ReturnSeries, periods_per_year: f64) -> f64 {
    sortino_ratio_raw(&returns.values())
        .map(|s| s * periods_per_year.sqrt())
        .unwrap_or(0.0)
}

/// Empirical (historical) CVaR: mean of the worst `(1 - confidence)` tail.
///
/// Returns the tail mean itself (negative for losses). `None` on an empty
/// series.
pub fn cvar(returns: &[f64], confidence: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let tail_fraction = (1.0 - confidence).clamp(0.0, 1.0);
    let tail_count = ((sorted.len() as f64 * tail_fraction).ceil() as usize).max(1);
    let tail = &sorted[..tail_count.min(sorted.len())];
    Some(mean(tail))
}

/// Kelly fraction: f* = w - (1 - w) / (avg_win / avg_loss).
///
/// Returns 0 on the undefined edges (non-positive average win or loss) rather
/// than dividing by zero.
pub fn kelly_fraction(win_rate: f64, avg_win_pct: f64, avg_loss_pct: f64) -> f64 {
    if avg_loss_pct <= 0.0 || avg_win_pct <= 0.0 {
        return 0.0;
    }
    let payoff = avg_win_pct / avg_loss_pct;
    win_rate - (1.0 - win_rate) / payoff
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> ReturnSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ReturnSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (base + chrono::Duration::days(i as i64), *v))
                .collect(),
        )
    }

    #[test]
    fn test_volatility_insufficient_data() {
        let err = annualized_volatility(&series(&[0.01]), 252.0).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_volatility_annualization() {
        // stdev of [0.01, -0.01] is ~0.01414
        let vol = annualized_volatility(&series(&[0.01, -0.01]), 252.0).unwrap();
        assert!((vol - 0.014142 * 252.0_f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_correlation_perfect() {
        let a: Vec<f64> = (0..25).map(|i| i as f64 * 0.01).collect();
        let b: Vec<f64> = a.iter().map(|v| v * 2.0 + 0.5).collect();
        let rho = correlation(&a, &b, 20).unwrap();
        assert!((rho - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_short_window_is_none() {
        let a = vec![0.01; 10];
        let b = vec![0.02; 10];
        assert!(correlation(&a, &b, 20).is_none());
    }

    #[test]
    fn test_correlation_zero_variance_is_none() {
        let a = vec![0.01; 25];
        let b: Vec<f64> = (0..25).map(|i| i as f64 * 0.01).collect();
        assert!(correlation(&a, &b, 20).is_none());
    }

    #[test]
    fn test_sharpe_zero_stdev() {
        assert_eq!(sharpe_ratio_raw(&[0.01, 0.01, 0.01], 0.0), 0.0);
    }

    #[test]
    fn test_sharpe_annualization() {
        let s = series(&[0.01, 0.02, -0.01, 0.015, 0.005]);
        let raw = sharpe_ratio_raw(&s.values(), 0.0);
        let annual = sharpe_ratio(&s, 0.0, 252.0);
        assert!((annual - raw * 252.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_sortino_no_downside_is_none() {
        assert!(sortino_ratio_raw(&[0.01, 0.02, 0.03]).is_none());
    }

    #[test]
    fn test_cvar_tail_mean() {
        // 20 observations, 95% confidence -> worst single observation
        let mut returns: Vec<f64> = (0..19).map(|_| 0.01).collect();
        returns.push(-0.10);
        let tail = cvar(&returns, 0.95).unwrap();
        assert!((tail + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_cvar_wider_tail() {
        // 10% tail over 20 observations -> worst two
        let mut returns: Vec<f64> = (0..18).map(|_| 0.01).collect();
        returns.push(-0.10);
        returns.push(-0.06);
        let tail = cvar(&returns, 0.90).unwrap();
        assert!((tail + 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_cvar_empty_is_none() {
        assert!(cvar(&[], 0.95).is_none());
    }

    #[test]
    fn test_kelly_positive_edge() {
        // 55% win rate, 5:3 payoff -> 0.55 - 0.45 / (5/3) = 0.28
        let f = kelly_fraction(0.55, 5.0, 3.0);
        assert!((f - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_negative_edge() {
        assert!(kelly_fraction(0.40, 1.0, 2.0) < 0.0);
    }

    #[test]
    fn test_kelly_undefined_edges() {
        assert_eq!(kelly_fraction(0.55, 5.0, 0.0), 0.0);
        assert_eq!(kelly_fraction(0.55, 0.0, 3.0), 0.0);
    }
}
