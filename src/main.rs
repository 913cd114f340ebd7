//! # Validate a configuration
//! risk-engine check-config --config config/default.toml
//!
//! # Size a candidate set from a cycle snapshot
//! risk-engine size --config config/default.toml --input snapshot.toml
//!
//! The snapshot file carries the already-resolved inputs for one sizing
//! cycle: candidates with their performance records, pairwise correlations,
//! the equity state, and the regime/crash signals.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;

use portfolio_risk::throttle::DrawdownThrottleConfig;
use portfolio_risk::{
    CorrelationMatrix, DrawdownThrottle, EngineConfig, EquityCurveState, MomentumCrashSignal,
    PositionSizingEngine, RegimeLabel, RegimeSignal, SizingCandidate, StrategyCategory,
    StrategyPerformanceRecord, TradeDirection,
};

const SEPARATOR: &str = "============================================================";

/// Risk engine CLI.
#[derive(Parser)]
#[command(name = "risk-engine")]
#[command(about = "Portfolio risk and position-sizing engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Run one sizing cycle over a snapshot of candidates
    Size {
        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the cycle snapshot file
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// One candidate row in the snapshot file.
#[derive(Debug, Deserialize)]
struct CandidateRow {
    strategy: String,
    asset: String,
    category: StrategyCategory,
    direction: TradeDirection,
    sample_size: usize,
    win_rate: f64,
    avg_win_pct: f64,
    avg_loss_pct: f64,
    /// Per-trade Sharpe of the strategy's track record.
    sharpe: f64,
    /// Annualized asset volatility, omitted when unavailable.
    volatility: Option<f64>,
    /// Strategies competing in this universe.
    universe: usize,
}

#[derive(Debug, Deserialize)]
struct CorrelationRow {
    a: String,
    b: String,
    rho: f64,
}

/// Already-resolved inputs for one sizing cycle.
#[derive(Debug, Deserialize)]
struct CycleSnapshot {
    initial_equity: f64,
    current_equity: f64,
    vix: f64,
    trailing_5d_return: f64,
    regime: RegimeLabel,
    #[serde(default)]
    regime_confidence: f64,
    #[serde(default)]
    candidates: Vec<CandidateRow>,
    #[serde(default)]
    correlations: Vec<CorrelationRow>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => check_config(&config),
        Commands::Size { config, input } => size(config.as_deref(), &input),
    }
}

fn check_config(path: &std::path::Path) -> Result<()> {
    let config = EngineConfig::load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    println!("Configuration OK: {}", path.display());
    println!(
        "  position bounds: [{:.1}%, {:.1}%]",
        config.min_position_size * 100.0,
        config.max_position_size * 100.0
    );
    println!(
        "  drawdown tiers: {:.0}% / {:.0}% / {:.0}%",
        config.drawdown_tier1_pct * 100.0,
        config.drawdown_tier2_pct * 100.0,
        config.drawdown_tier3_pct * 100.0
    );
    println!("  target volatility: {:.1}%", config.target_volatility * 100.0);
    Ok(())
}

fn size(config_path: Option<&std::path::Path>, input: &std::path::Path) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let engine = PositionSizingEngine::new(config)?;

    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let snapshot: CycleSnapshot =
        toml::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

    let initial = Decimal::try_from(snapshot.initial_equity).context("initial_equity")?;
    let current = Decimal::try_from(snapshot.current_equity).context("current_equity")?;
    let mut equity = EquityCurveState::new_session(initial);
    equity.set_equity(current);

    let mut throttle = DrawdownThrottle::new(DrawdownThrottleConfig {
        tier1: engine.config().drawdown_tier1_pct,
        tier2: engine.config().drawdown_tier2_pct,
        tier3: engine.config().drawdown_tier3_pct,
        cooldown_hours: engine.config().halt_cooldown_hours,
        sharpe_window_days: engine.config().sharpe_window_days,
        sharpe_crisis_days: engine.config().sharpe_crisis_days,
        sharpe_crisis_scalar: engine.config().sharpe_crisis_scalar,
    });
    throttle.update(Utc::now(), &equity);
    if let Some(fatal) = throttle.fatal_error() {
        return Err(fatal.into());
    }

    let mut matrix = CorrelationMatrix::new();
    for row in &snapshot.correlations {
        matrix.insert(&row.a, &row.b, row.rho);
    }

    let candidates: Vec<SizingCandidate> = snapshot
        .candidates
        .iter()
        .map(|row| SizingCandidate {
            strategy: row.strategy.clone(),
            asset: row.asset.clone(),
            category: row.category,
            direction: row.direction,
            performance: StrategyPerformanceRecord {
                strategy: row.strategy.clone(),
                asset_class: row.asset.clone(),
                sample_size: row.sample_size,
                win_rate: row.win_rate,
                avg_win_pct: row.avg_win_pct,
                avg_loss_pct: row.avg_loss_pct,
                sharpe: row.sharpe,
                sortino: None,
            },
            asset_volatility: row.volatility,
            asset_returns: None,
            num_strategies_in_universe: row.universe,
        })
        .collect();

    let regime = RegimeSignal {
        label: snapshot.regime,
        confidence: snapshot.regime_confidence,
    };
    let crash = MomentumCrashSignal {
        vix: snapshot.vix,
        trailing_5d_return: snapshot.trailing_5d_return,
    };

    let decisions = engine.size_cycle(&candidates, &matrix, &throttle, &regime, &crash);

    println!("{}", SEPARATOR);
    println!(
        "Sizing cycle: {} candidates, drawdown {:.1}%, {:?}",
        decisions.len(),
        equity.drawdown() * 100.0,
        throttle.state()
    );
    println!("{}", SEPARATOR);
    for decision in &decisions {
        println!(
            "{:>12} {:>8}  size {:>6.3}  {}",
            decision.strategy, decision.asset, decision.final_size_fraction, decision.rationale
        );
    }
    Ok(())
}
