//! In-memory exchange that replays a scripted price sequence.
//!
//! Used for paper trading and as the deterministic exchange in tests:
//! prices come out of the script in order, every accepted order is
//! recorded, and failures can be forced from the outside.

use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::models::TradeSide;

use super::Exchange;

/// An order accepted by the simulated exchange.
#[derive(Debug, Clone)]
pub struct SimulatedOrder {
    pub id: Uuid,
    pub side: TradeSide,
    pub pair: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    prices: VecDeque<Decimal>,
    orders: Vec<SimulatedOrder>,
    price_requests: usize,
    order_requests: usize,
    price_error: Option<String>,
    order_error: Option<String>,
}

/// Scripted exchange with no external dependencies.
#[derive(Default)]
pub struct SimulatedExchange {
    state: Mutex<State>,
}

impl SimulatedExchange {
    /// Create an exchange that will quote `prices` in order.
    pub fn new(prices: impl IntoIterator<Item = Decimal>) -> Self {
        Self {
            state: Mutex::new(State {
                prices: prices.into_iter().collect(),
                ..State::default()
            }),
        }
    }

    /// Append a price to the end of the script.
    pub fn push_price(&self, price: Decimal) {
        self.state().prices.push_back(price);
    }

    /// Make the next price request fail with `message`.
    pub fn fail_next_price(&self, message: &str) {
        self.state().price_error = Some(message.to_string());
    }

    /// Reject every order with `message` until cleared with `None`.
    pub fn fail_orders(&self, message: Option<&str>) {
        self.state().order_error = message.map(str::to_string);
    }

    /// All accepted orders, oldest first.
    pub fn orders(&self) -> Vec<SimulatedOrder> {
        self.state().orders.clone()
    }

    /// Number of price requests received, failed ones included.
    pub fn price_requests(&self) -> usize {
        self.state().price_requests
    }

    /// Number of buy/sell requests received, rejected ones included.
    pub fn order_requests(&self) -> usize {
        self.state().order_requests
    }

    /// Prices left in the script.
    pub fn remaining_prices(&self) -> usize {
        self.state().prices.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_order(
        &self,
        side: TradeSide,
        pair: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<()> {
        let mut state = self.state();
        state.order_requests += 1;

        if let Some(message) = &state.order_error {
            return Err(anyhow!("{} rejected: {}", side, message));
        }

        let order = SimulatedOrder {
            id: Uuid::new_v4(),
            side,
            pair: pair.to_string(),
            quantity,
            price,
            submitted_at: Utc::now(),
        };
        debug!(id = %order.id, side = %side, pair = %pair, quantity = %quantity, price = %price, "Simulated order filled");
        state.orders.push(order);

        Ok(())
    }
}

#[async_trait]
impl Exchange for SimulatedExchange {
    async fn get_price(&self, pair: &str) -> Result<Decimal> {
        let mut state = self.state();
        state.price_requests += 1;

        if let Some(message) = state.price_error.take() {
            return Err(anyhow!("price unavailable for {}: {}", pair, message));
        }

        state
            .prices
            .pop_front()
            .ok_or_else(|| anyhow!("price script exhausted for {}", pair))
    }

    async fn buy(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()> {
        self.record_order(TradeSide::Buy, pair, quantity, price)
    }

    async fn sell(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()> {
        self.record_order(TradeSide::Sell, pair, quantity, price)
    }
}

/// Parse a price script: one price per line, `#` starts a comment.
pub fn parse_price_script(contents: &str) -> Result<Vec<Decimal>> {
    let mut prices = Vec::new();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let price = Decimal::from_str(line)
            .with_context(|| format!("Invalid price on line {}: {}", index + 1, line))?;
        if price <= Decimal::ZERO {
            bail!("Price on line {} must be positive: {}", index + 1, line);
        }
        prices.push(price);
    }

    Ok(prices)
}

/// Load a price script from disk.
pub fn load_price_script(path: &Path) -> Result<Vec<Decimal>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read price file: {}", path.display()))?;
    parse_price_script(&contents)
}
