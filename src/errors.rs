//! Error taxonomy for the risk engine.
//!
//! Two families with very different propagation rules:
//! - Missing-data errors (`InsufficientData`, `DataUnavailable`) are recovered
//!   locally by the component that detected them, which degrades to its most
//!   conservative output and keeps the sizing cycle alive.
//! - `Configuration` and `FatalRiskState` surface to the operator.
//!   Configuration problems are fatal at startup, never at runtime; the fatal
//!   risk state corresponds to the shutdown drawdown tier and blocks all new
//!   sizing until manually cleared.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient data for {what}: need {needed}, have {available}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Fatal risk state: {0}")]
    FatalRiskState(String),
}

impl RiskError {
    /// Whether this error is in the missing-data family, which components
    /// absorb locally by degrading to a conservative value.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::DataUnavailable(_)
        )
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
