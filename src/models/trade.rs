//! Trade side and fill records produced by the trading engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A trade the exchange confirmed, with the bookkeeping it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Trade direction
    pub side: TradeSide,

    /// Quantity of the traded asset
    pub quantity: Decimal,

    /// Price the order was submitted at
    pub price: Decimal,

    /// Absolute move from the previous reference price
    pub delta: Decimal,

    /// Inventory after the fill was booked
    pub inventory_after: Decimal,

    /// Cash accumulator after the fill was booked
    pub cash_delta_after: Decimal,

    /// 1-based sequence number of this trade
    pub trade_number: u64,

    /// When the fill was booked
    pub executed_at: DateTime<Utc>,
}
