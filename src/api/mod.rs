//! Exchange access: the capability the trading engine trades through,
//! an HTTP gateway client, and an in-memory simulated exchange.

mod gateway_client;
mod simulated;
mod types;

pub use gateway_client::GatewayClient;
pub use simulated::{load_price_script, parse_price_script, SimulatedExchange, SimulatedOrder};
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Price source and order sink for a trading pair.
///
/// Any transport that can quote a price and fill market orders satisfies
/// this; the engine depends on nothing else.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Latest known price for `pair`.
    async fn get_price(&self, pair: &str) -> Result<Decimal>;

    /// Buy `quantity` of `pair` at or near `price`.
    async fn buy(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()>;

    /// Sell `quantity` of `pair` at or near `price`.
    async fn sell(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()>;
}
