pub mod config;
pub mod data;
pub mod engine;
pub mod errors;
pub mod quality;
pub mod regime;
pub mod sizing;
pub mod stats;
pub mod throttle;

// Re-export commonly used types
pub use config::EngineConfig;
pub use data::{
    CorrelationMatrix, MomentumCrashSignal, PriceFeed, RegimeLabel, RegimeProvider, RegimeSignal,
    ReturnSeries, StrategyCategory, StrategyPerformanceRecord, TradeDirection, TradeLedger,
    TradeRecord,
};
pub use engine::{DecisionComponents, PositionSizingEngine, RiskDecision, SizingCandidate};
pub use errors::{RiskError, RiskResult};
pub use quality::{GateResult, QualityFlag, SignalQualityGate};
pub use regime::RegimeGate;
pub use sizing::{CorrelationAdjuster, PruneCandidate, VolatilityTargeter};
pub use throttle::{DrawdownThrottle, EquityCurveState, ThrottleState};
