//! Drawdown throttle.
//!
//! A tiered control loop over the equity curve:
//! - Normal: drawdown below tier 1, full size
//! - Halved: tier 1 reached, global scalar 0.5
//! - Halted: tier 2 reached, scalar 0, new entries blocked; the halt persists
//!   for a minimum cool-down even if drawdown recovers inside that window
//! - Shutdown: tier 3 reached, terminal, requires explicit manual reset
//!
//! An independent rolling-Sharpe gate catches slow bleed that never crosses a
//! drawdown tier: trailing-window Sharpe negative for long enough applies its
//! own multiplicative scalar regardless of tier.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::RiskError;
use crate::stats;

/// Running equity state for one portfolio/session.
///
/// Peak equity is a one-way ratchet: it never decreases once set. Reset only
/// happens through an explicit new-session construction. Updates must follow
/// a single-writer discipline; tier transitions are not safe against torn
/// reads of peak/current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurveState {
    peak_equity: Decimal,
    current_equity: Decimal,
}

impl EquityCurveState {
    /// Start a new session at the given equity.
    pub fn new_session(initial_equity: Decimal) -> Self {
        Self {
            peak_equity: initial_equity,
            current_equity: initial_equity,
        }
    }

    /// Apply a realized P&L delta.
    pub fn apply_delta(&mut self, delta: Decimal) {
        self.current_equity += delta;
        if self.current_equity > self.peak_equity {
            self.peak_equity = self.current_equity;
        }
    }

    /// Set absolute current equity (e.g. from a mark-to-market sweep).
    pub fn set_equity(&mut self, equity: Decimal) {
        self.current_equity = equity;
        if self.current_equity > self.peak_equity {
            self.peak_equity = self.current_equity;
        }
    }

    pub fn peak_equity(&self) -> Decimal {
        self.peak_equity
    }

    pub fn current_equity(&self) -> Decimal {
        self.current_equity
    }

    /// Drawdown from the high-water mark, always >= 0.
    pub fn drawdown(&self) -> f64 {
        let peak: f64 = self.peak_equity.try_into().unwrap_or(0.0);
        if peak <= 0.0 {
            return 0.0;
        }
        let current: f64 = self.current_equity.try_into().unwrap_or(peak);
        ((peak - current) / peak).max(0.0)
    }
}

/// Throttle tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottleState {
    Normal,
    Halved,
    Halted,
    Shutdown,
}

impl ThrottleState {
    /// Global size scalar for this tier.
    pub fn scalar(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Halved => 0.5,
            Self::Halted | Self::Shutdown => 0.0,
        }
    }

    pub fn allows_new_entries(&self) -> bool {
        matches!(self, Self::Normal | Self::Halved)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Normal => "drawdown below tier 1",
            Self::Halved => "tier 1 drawdown, sizing halved",
            Self::Halted => "tier 2 drawdown, new entries halted",
            Self::Shutdown => "tier 3 drawdown, manual reset required",
        }
    }
}

/// Drawdown throttle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownThrottleConfig {
    /// Tier thresholds as drawdown fractions of the high-water mark.
    pub tier1: f64,
    pub tier2: f64,
    pub tier3: f64,
    /// Minimum hours a halt persists even after drawdown recovers.
    pub cooldown_hours: i64,
    /// Trailing window for the rolling Sharpe gate (days).
    pub sharpe_window_days: usize,
    /// Consecutive negative-Sharpe days before the crisis scalar applies.
    pub sharpe_crisis_days: usize,
    /// Scalar applied while the rolling-Sharpe crisis is active.
    pub sharpe_crisis_scalar: f64,
}

impl Default for DrawdownThrottleConfig {
    fn default() -> Self {
        Self {
            tier1: 0.10,
            tier2: 0.15,
            tier3: 0.20,
            cooldown_hours: 48,
            sharpe_window_days: 30,
            sharpe_crisis_days: 14,
            sharpe_crisis_scalar: 0.25,
        }
    }
}

/// Stateful drawdown throttle.
pub struct DrawdownThrottle {
    config: DrawdownThrottleConfig,
    state: ThrottleState,
    halted_at: Option<DateTime<Utc>>,
    daily_returns: Vec<(NaiveDate, f64)>,
    negative_sharpe_since: Option<NaiveDate>,
    crisis_active: bool,
    transitions: Vec<(DateTime<Utc>, ThrottleState)>,
}

impl DrawdownThrottle {
    pub fn new(config: DrawdownThrottleConfig) -> Self {
        Self {
            config,
            state: ThrottleState::Normal,
            halted_at: None,
            daily_returns: Vec::new(),
            negative_sharpe_since: None,
            crisis_active: false,
            transitions: Vec::new(),
        }
    }

    /// Recompute the tier from the current equity state.
    ///
    /// Downward transitions are automatic. Recovery out of Halted needs both
    /// drawdown below tier 1 and cool-down expiry; Shutdown never
    /// auto-recovers.
    pub fn update(&mut self, now: DateTime<Utc>, equity: &EquityCurveState) -> ThrottleState {
        let drawdown = equity.drawdown();
        let next = self.next_state(now, drawdown);

        if next != self.state {
            warn!(
                drawdown = format!("{:.1}%", drawdown * 100.0),
                from = ?self.state,
                to = ?next,
                "drawdown tier transition"
            );
            if next == ThrottleState::Halted {
                self.halted_at = Some(now);
            }
            self.transitions.push((now, next));
        }

        self.state = next;
        self.state
    }

    fn next_state(&self, now: DateTime<Utc>, drawdown: f64) -> ThrottleState {
        if self.state == ThrottleState::Shutdown {
            return ThrottleState::Shutdown;
        }
        if drawdown >= self.config.tier3 {
            return ThrottleState::Shutdown;
        }
        if drawdown >= self.config.tier2 {
            return ThrottleState::Halted;
        }
        if self.state == ThrottleState::Halted {
            // Between tier 1 and tier 2 a halt holds; below tier 1 it still
            // holds until the cool-down expires.
            if drawdown >= self.config.tier1 {
                return ThrottleState::Halted;
            }
            let expired = self.halted_at.map_or(true, |at| {
                now - at >= Duration::hours(self.config.cooldown_hours)
            });
            return if expired {
                ThrottleState::Normal
            } else {
                ThrottleState::Halted
            };
        }
        if drawdown >= self.config.tier1 {
            return ThrottleState::Halved;
        }
        ThrottleState::Normal
    }

    /// Record one day of portfolio return and re-evaluate the rolling-Sharpe
    /// gate.
    pub fn record_return(&mut self, date: NaiveDate, daily_return: f64) {
        self.daily_returns.push((date, daily_return));

        // Observations past the window never matter again; drop them so a
        // long-running session stays bounded.
        let window_start = date - Duration::days(self.config.sharpe_window_days as i64);
        self.daily_returns.retain(|(d, _)| *d > window_start);

        let window: Vec<f64> = self.daily_returns.iter().map(|(_, r)| *r).collect();

        if window.len() < 2 {
            return;
        }

        let rolling_sharpe = stats::sharpe_ratio_raw(&window, 0.0);
        if rolling_sharpe < 0.0 {
            let since = *self.negative_sharpe_since.get_or_insert(date);
            let days_negative = (date - since).num_days() + 1;
            if days_negative >= self.config.sharpe_crisis_days as i64 && !self.crisis_active {
                warn!(
                    days_negative,
                    rolling_sharpe, "rolling Sharpe crisis, applying slow-bleed scalar"
                );
                self.crisis_active = true;
            }
        } else {
            self.negative_sharpe_since = None;
            self.crisis_active = false;
        }
    }

    /// Combined multiplicative scalar: tier scalar times the rolling-Sharpe
    /// crisis scalar when active.
    pub fn scalar(&self) -> f64 {
        let crisis = if self.crisis_active {
            self.config.sharpe_crisis_scalar
        } else {
            1.0
        };
        self.state.scalar() * crisis
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    pub fn is_crisis_active(&self) -> bool {
        self.crisis_active
    }

    pub fn transitions(&self) -> &[(DateTime<Utc>, ThrottleState)] {
        &self.transitions
    }

    /// The fatal error surfaced to the operator while in Shutdown.
    pub fn fatal_error(&self) -> Option<RiskError> {
        if self.state == ThrottleState::Shutdown {
            Some(RiskError::FatalRiskState(
                "tier 3 drawdown shutdown, manual reset required".to_string(),
            ))
        } else {
            None
        }
    }

    /// Explicit operator reset out of Shutdown. Clears the halt clock; the
    /// equity curve itself is reset separately via a new session.
    pub fn manual_reset(&mut self) {
        self.state = ThrottleState::Normal;
        self.halted_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn throttle() -> DrawdownThrottle {
        DrawdownThrottle::new(DrawdownThrottleConfig::default())
    }

    #[test]
    fn test_peak_is_one_way_ratchet() {
        let mut equity = EquityCurveState::new_session(dec!(100_000));
        equity.apply_delta(dec!(10_000));
        assert_eq!(equity.peak_equity(), dec!(110_000));
        equity.apply_delta(dec!(-30_000));
        assert_eq!(equity.peak_equity(), dec!(110_000));
        equity.apply_delta(dec!(5_000));
        assert_eq!(equity.peak_equity(), dec!(110_000));
        assert!(equity.drawdown() > 0.0);
    }

    #[test]
    fn test_tier_progression() {
        let mut throttle = throttle();
        let mut equity = EquityCurveState::new_session(dec!(100_000));

        assert_eq!(throttle.update(at(1, 9), &equity), ThrottleState::Normal);
        assert_eq!(throttle.scalar(), 1.0);

        equity.set_equity(dec!(88_000)); // 12% drawdown
        assert_eq!(throttle.update(at(1, 10), &equity), ThrottleState::Halved);
        assert_eq!(throttle.scalar(), 0.5);

        equity.set_equity(dec!(84_000)); // 16% drawdown
        assert_eq!(throttle.update(at(1, 11), &equity), ThrottleState::Halted);
        assert_eq!(throttle.scalar(), 0.0);
        assert!(!throttle.state().allows_new_entries());
    }

    #[test]
    fn test_halt_cooldown_holds_through_recovery() {
        let mut throttle = throttle();
        let mut equity = EquityCurveState::new_session(dec!(100_000));

        equity.set_equity(dec!(84_000));
        throttle.update(at(1, 9), &equity);
        assert_eq!(throttle.state(), ThrottleState::Halted);

        // Full recovery 12 hours later: still inside the 48h cool-down.
        equity.set_equity(dec!(100_000));
        assert_eq!(throttle.update(at(1, 21), &equity), ThrottleState::Halted);

        // After the cool-down expires the halt lifts.
        assert_eq!(throttle.update(at(3, 10), &equity), ThrottleState::Normal);
    }

    #[test]
    fn test_halt_holds_between_tier1_and_tier2() {
        let mut throttle = throttle();
        let mut equity = EquityCurveState::new_session(dec!(100_000));

        equity.set_equity(dec!(84_000));
        throttle.update(at(1, 9), &equity);

        // Partial recovery to 12% drawdown, well past the cool-down: a halt
        // only lifts below tier 1.
        equity.set_equity(dec!(88_000));
        assert_eq!(throttle.update(at(5, 9), &equity), ThrottleState::Halted);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut throttle = throttle();
        let mut equity = EquityCurveState::new_session(dec!(100_000));

        equity.set_equity(dec!(78_000)); // 22% drawdown
        assert_eq!(throttle.update(at(1, 9), &equity), ThrottleState::Shutdown);
        assert!(throttle.fatal_error().is_some());

        // Even full recovery does not clear a shutdown.
        equity.set_equity(dec!(100_000));
        assert_eq!(throttle.update(at(10, 9), &equity), ThrottleState::Shutdown);

        throttle.manual_reset();
        assert_eq!(throttle.update(at(10, 10), &equity), ThrottleState::Normal);
        assert!(throttle.fatal_error().is_none());
    }

    #[test]
    fn test_rolling_sharpe_crisis() {
        let mut throttle = throttle();

        // Slow bleed: 20 consecutive slightly-negative days, far from any
        // drawdown tier.
        for day in 1..=20 {
            throttle.record_return(date(day), if day % 4 == 0 { 0.0005 } else { -0.002 });
        }
        assert!(throttle.is_crisis_active());
        assert_eq!(throttle.scalar(), 0.25);

        // A strong positive stretch flips the rolling Sharpe back and clears
        // the crisis.
        for day in 21..=28 {
            throttle.record_return(date(day), 0.02);
        }
        assert!(!throttle.is_crisis_active());
        assert_eq!(throttle.scalar(), 1.0);
    }

    #[test]
    fn test_return_buffer_stays_bounded() {
        let mut throttle = throttle();
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for day in 0..400 {
            throttle.record_return(base + Duration::days(day), 0.001);
        }
        assert!(throttle.daily_returns.len() <= throttle.config.sharpe_window_days);
    }

    #[test]
    fn test_crisis_needs_persistence() {
        let mut throttle = throttle();
        for day in 1..=5 {
            throttle.record_return(date(day), -0.01);
        }
        // Only five negative days: no crisis yet.
        assert!(!throttle.is_crisis_active());
        assert_eq!(throttle.scalar(), 1.0);
    }
}
