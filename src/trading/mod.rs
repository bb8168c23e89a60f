//! Trading logic: configuration and the threshold trading engine.

mod config;
mod engine;

pub use config::TradingConfig;
pub use engine::{EngineError, EngineState, TickOutcome, TradingEngine};
