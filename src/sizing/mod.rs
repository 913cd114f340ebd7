//! Raw position sizing.
//!
//! Provides:
//! - Volatility targeting (inverse-volatility weighting with bounds)
//! - Correlation-based exposure reduction (joint rescaling and greedy
//!   candidate pruning)

pub mod correlation;
pub mod vol_target;

pub use correlation::{CorrelationAdjuster, CorrelationAdjusterConfig, PruneCandidate};
pub use vol_target::{VolatilityTargeter, VolatilityTargeterConfig};
