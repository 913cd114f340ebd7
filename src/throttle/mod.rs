//! Drawdown throttling.
//!
//! Provides:
//! - Equity curve state with a one-way high-water mark
//! - The tiered drawdown state machine (normal / halved / halted / shutdown)
//! - The rolling-Sharpe slow-bleed gate

pub mod drawdown;

pub use drawdown::{DrawdownThrottle, DrawdownThrottleConfig, EquityCurveState, ThrottleState};
