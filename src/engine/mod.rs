//! Position-sizing orchestration.
//!
//! Runs the full pipeline per sizing cycle:
//! 1. Quality gate eligibility per candidate
//! 2. Volatility-target and half-Kelly sizes, blended
//! 3. Joint correlation adjustment
//! 4. Drawdown throttle, regime gate, tail-risk scalars
//! 5. Bounded final decision with a full audit trail

pub mod pipeline;

pub use pipeline::{
    DecisionComponents, PositionSizingEngine, RiskDecision, SizingCandidate,
};
