//! Deflated Sharpe ratio (Bailey & López de Prado, 2014).
//!
//! Corrects an observed Sharpe ratio for multiple-testing bias: when N
//! strategies were tried, the best observed Sharpe is expected to be well
//! above zero even with no genuine skill. The DSR is the probability that the
//! strategy's true Sharpe exceeds zero after accounting for how many
//! strategies were tested.
//!
//! `observed_sharpe` is the per-period Sharpe estimate at the same frequency
//! as the `track_length` observations (per-trade Sharpe over a trade count,
//! daily Sharpe over a day count).

use statrs::distribution::{ContinuousCDF, Normal};

/// Euler-Mascheroni constant, used in the expected-maximum approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Result of a deflated Sharpe computation.
#[derive(Debug, Clone, Copy)]
pub struct DeflatedSharpe {
    /// Probability in [0, 1] that the true Sharpe exceeds zero.
    pub dsr: f64,
    /// Expected maximum Sharpe across the tested strategies under the null.
    pub expected_max_sharpe: f64,
    /// Share of the observed Sharpe attributable to selection bias, 0-100.
    pub haircut_pct: f64,
}

impl DeflatedSharpe {
    fn failed() -> Self {
        Self {
            dsr: 0.0,
            expected_max_sharpe: 0.0,
            haircut_pct: 100.0,
        }
    }
}

/// Expected maximum of `n` draws of the null Sharpe estimator with standard
/// deviation `trial_sd`.
fn expected_max_sharpe(n: usize, trial_sd: f64) -> f64 {
    if n <= 1 {
        // A single trial carries no selection bias.
        return 0.0;
    }
    let normal = Normal::new(0.0, 1.0).unwrap();
    let n = n as f64;
    let z1 = normal.inverse_cdf(1.0 - 1.0 / n);
    let z2 = normal.inverse_cdf(1.0 - 1.0 / (n * std::f64::consts::E));
    trial_sd * ((1.0 - EULER_GAMMA) * z1 + EULER_GAMMA * z2)
}

/// Deflated Sharpe ratio.
///
/// Fails (dsr = 0) when the track is shorter than 2 observations or no
/// strategies were tested. Pass `skewness = 0` and `kurtosis = 3` when the
/// higher moments of the return distribution are unknown.
pub fn deflated_sharpe_ratio(
    observed_sharpe: f64,
    num_strategies_tested: usize,
    track_length: usize,
    skewness: f64,
    kurtosis: f64,
) -> DeflatedSharpe {
    if track_length < 2 || num_strategies_tested < 1 || !observed_sharpe.is_finite() {
        return DeflatedSharpe::failed();
    }

    let t = track_length as f64;

    // Null sampling stdev of the per-period Sharpe estimator.
    let trial_sd = (1.0 / t).sqrt();
    let benchmark = expected_max_sharpe(num_strategies_tested, trial_sd);

    // PSR denominator adjusting for non-normal returns.
    let adjustment =
        1.0 - skewness * observed_sharpe + (kurtosis - 1.0) / 4.0 * observed_sharpe.powi(2);
    if adjustment <= 0.0 {
        // Higher moments make the estimator variance undefined; treat as no
        // evidence of skill.
        return DeflatedSharpe::failed();
    }

    let normal = Normal::new(0.0, 1.0).unwrap();
    let z = (observed_sharpe - benchmark) * (t - 1.0).sqrt() / adjustment.sqrt();
    let dsr = normal.cdf(z);

    let haircut_pct = if observed_sharpe > 0.0 {
        (benchmark / observed_sharpe * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };

    DeflatedSharpe {
        dsr,
        expected_max_sharpe: benchmark,
        haircut_pct,
    }
}
