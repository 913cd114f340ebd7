//! Statistics library.
//!
//! Pure numeric primitives:
//! - Annualized volatility, Pearson correlation
//! - Sharpe and Sortino ratios (per-period and annualized)
//! - Empirical CVaR
//! - Kelly fraction
//! - Deflated Sharpe ratio (multiple-testing correction)

pub mod deflated_sharpe;
pub mod primitives;

pub use deflated_sharpe::{deflated_sharpe_ratio, DeflatedSharpe};
pub use primitives::{
    annualized_volatility, correlation, cvar, kelly_fraction, sharpe_ratio, sharpe_ratio_raw,
    sortino_ratio, sortino_ratio_raw,
};
