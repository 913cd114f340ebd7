//! Regime gating.
//!
//! Consumes the external market-regime classification and momentum-crash
//! indicators; emits per-category size scalars.

pub mod gate;

pub use gate::{RegimeGate, RegimeGateConfig};
