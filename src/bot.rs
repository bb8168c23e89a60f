//! Bot runner: paces engine ticks on a fixed interval.
//!
//! Handles:
//! - Ticking the trading engine once per interval
//! - Reporting transient exchange errors and retrying on the next interval
//! - Ending the session when the stop rule trips
//! - Ctrl+C and external shutdown, checked only between ticks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::Exchange;
use crate::models::TradeSide;
use crate::trading::{EngineState, TickOutcome, TradingConfig, TradingEngine};

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Time between ticks (milliseconds)
    pub poll_interval_ms: u64,

    /// Stop after this many ticks (None runs until stopped)
    pub max_ticks: Option<u64>,

    /// Listen for Ctrl+C and shut down between ticks
    pub handle_ctrl_c: bool,

    /// Trading configuration
    pub trading_config: TradingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            max_ticks: None,
            handle_ctrl_c: true,
            trading_config: TradingConfig::default(),
        }
    }
}

/// Why a bot session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Inventory reached the stop level
    RiskLimit,
    /// Shutdown was requested
    Cancelled,
    /// The configured tick limit was reached
    TickLimit,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::RiskLimit => write!(f, "stop rule triggered"),
            SessionEnd::Cancelled => write!(f, "cancelled"),
            SessionEnd::TickLimit => write!(f, "tick limit reached"),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    ticks: u64,
    seeds: u64,
    holds: u64,
    buys: u64,
    sells: u64,
    failures: u64,
}

/// Main bot runner.
pub struct Bot<E> {
    config: BotConfig,
    engine: TradingEngine<E>,
    counters: Counters,
    started_at: DateTime<Utc>,

    // Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl<E: Exchange> Bot<E> {
    /// Create a new bot trading through `exchange`.
    pub fn new(config: BotConfig, exchange: E) -> Result<Self> {
        let engine = TradingEngine::new(config.trading_config.clone(), exchange)
            .context("Failed to create trading engine")?;

        Ok(Self {
            config,
            engine,
            counters: Counters::default(),
            started_at: Utc::now(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get shutdown signal for external control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn engine(&self) -> &TradingEngine<E> {
        &self.engine
    }

    /// Main run loop. Returns once the session is over.
    pub async fn run(&mut self) -> SessionEnd {
        info!(
            pair = %self.config.trading_config.pair,
            poll_interval_ms = self.config.poll_interval_ms,
            max_ticks = ?self.config.max_ticks,
            "Starting bot run loop"
        );

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Register shutdown handler for the whole session, so a signal that
        // arrives mid-tick is still seen before the next one.
        let ctrl_c = self.config.handle_ctrl_c.then(|| {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    shutdown.store(true, Ordering::SeqCst);
                }
            })
        });

        let end = loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break SessionEnd::Cancelled;
            }
            if let Some(limit) = self.config.max_ticks {
                if self.counters.ticks >= limit {
                    break SessionEnd::TickLimit;
                }
            }

            poll_interval.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break SessionEnd::Cancelled;
            }

            if let Some(end) = self.tick().await {
                break end;
            }
        };

        if let Some(handle) = ctrl_c {
            handle.abort();
        }

        info!(reason = %end, "Bot session ended");
        end
    }

    /// Single iteration of the main loop. Returns `Some` when the session must end.
    async fn tick(&mut self) -> Option<SessionEnd> {
        self.counters.ticks += 1;
        debug!(tick = self.counters.ticks, "Bot tick");

        match self.engine.tick().await {
            Ok(TickOutcome::Seeded { .. }) => self.counters.seeds += 1,
            Ok(TickOutcome::Held { .. }) => self.counters.holds += 1,
            Ok(TickOutcome::Traded(fill)) => match fill.side {
                TradeSide::Buy => self.counters.buys += 1,
                TradeSide::Sell => self.counters.sells += 1,
            },
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Trading stopped");
                return Some(SessionEnd::RiskLimit);
            }
            Err(e) => {
                self.counters.failures += 1;
                warn!(error = %e, "Tick failed, retrying next interval");
            }
        }

        None
    }

    /// Get current stats.
    pub fn stats(&self) -> BotStats {
        let position = self.engine.position();

        BotStats {
            pair: position.pair.clone(),
            started_at: self.started_at,
            ticks: self.counters.ticks,
            seeds: self.counters.seeds,
            holds: self.counters.holds,
            buys: self.counters.buys,
            sells: self.counters.sells,
            failures: self.counters.failures,
            initial_inventory: position.initial_inventory,
            current_inventory: position.current_inventory,
            cash_delta: position.cash_delta,
            reference_price: position.reference_price,
            state: self.engine.state(),
        }
    }
}

/// Bot statistics.
#[derive(Debug, Clone)]
pub struct BotStats {
    pub pair: String,
    pub started_at: DateTime<Utc>,
    pub ticks: u64,
    pub seeds: u64,
    pub holds: u64,
    pub buys: u64,
    pub sells: u64,
    pub failures: u64,
    pub initial_inventory: Decimal,
    pub current_inventory: Decimal,
    pub cash_delta: Decimal,
    pub reference_price: Decimal,
    pub state: EngineState,
}

impl BotStats {
    pub fn trades(&self) -> u64 {
        self.buys + self.sells
    }
}

impl std::fmt::Display for BotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bot Statistics ===")?;
        writeln!(f, "Pair:            {}", self.pair)?;
        writeln!(f, "Started:         {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(
            f,
            "Ticks:           {} (Seeds: {}, Holds: {}, Failed: {})",
            self.ticks,
            self.seeds,
            self.holds,
            self.failures
        )?;
        writeln!(
            f,
            "Trades:          {} (Buys: {}, Sells: {})",
            self.trades(),
            self.buys,
            self.sells
        )?;
        writeln!(
            f,
            "Inventory:       {} (initial {})",
            self.current_inventory.normalize(),
            self.initial_inventory.normalize()
        )?;
        writeln!(f, "Cash Delta:      {}", self.cash_delta.normalize())?;
        writeln!(f, "Reference Price: {}", self.reference_price.normalize())?;
        let status = match self.state {
            EngineState::Running => "Running",
            EngineState::Stopped => "Stopped (stop rule)",
        };
        writeln!(f, "Status:          {}", status)?;
        Ok(())
    }
}
