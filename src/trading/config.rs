//! Trading configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::EngineError;

/// Configuration for the threshold trading engine. Immutable once the
/// engine is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Pair to trade (e.g., "BTC-USD")
    pub pair: String,

    /// Inventory held when the engine starts; the stop rule halts trading
    /// once inventory falls to half of this
    pub initial_inventory: Decimal,

    /// Quantity bought or sold on every triggered trade
    pub trade_size: Decimal,

    /// Minimum absolute price move from the reference price that triggers a trade
    pub min_move_threshold: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pair: "BTC-USD".to_string(),
            initial_inventory: dec!(1.0),
            trade_size: dec!(0.01),         // 0.01 BTC per trade
            min_move_threshold: dec!(0.01), // Any cent move trades
        }
    }
}

impl TradingConfig {
    /// Reject configurations the engine cannot trade with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.pair.trim().is_empty() {
            return Err(EngineError::ConfigInvalid("pair must not be empty".to_string()));
        }
        if self.initial_inventory <= Decimal::ZERO {
            return Err(EngineError::ConfigInvalid(format!(
                "initial inventory must be positive, got {}",
                self.initial_inventory
            )));
        }
        if self.trade_size <= Decimal::ZERO {
            return Err(EngineError::ConfigInvalid(format!(
                "trade size must be positive, got {}",
                self.trade_size
            )));
        }
        // A zero threshold would let an unchanged price trade.
        if self.min_move_threshold <= Decimal::ZERO {
            return Err(EngineError::ConfigInvalid(format!(
                "minimum move threshold must be positive, got {}",
                self.min_move_threshold
            )));
        }
        Ok(())
    }
}
