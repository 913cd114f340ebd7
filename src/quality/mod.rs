//! Signal quality gating.
//!
//! Evidence-based eligibility: sample size, edge sign, and a deflated-Sharpe
//! multiple-testing correction decide whether a strategy may size positions.

pub mod gate;

pub use gate::{GateResult, QualityFlag, SignalQualityGate, SignalQualityGateConfig};
