//! Position model: the inventory and cash bookkeeping of one trading engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradeSide;

/// Running position for a single pair.
///
/// Owned by exactly one engine. Inventory and cash only move through
/// [`Position::book`], which the engine calls after the exchange confirmed
/// an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Traded pair (e.g., "BTC-USD")
    pub pair: String,

    /// Inventory at construction, baseline for the stop rule
    pub initial_inventory: Decimal,

    /// Inventory currently held
    pub current_inventory: Decimal,

    /// Quantity bought or sold per trade
    pub trade_size: Decimal,

    /// Minimum absolute price move that triggers a trade
    pub min_move_threshold: Decimal,

    /// Signed sum of price deltas: minus on buys, plus on sells
    pub cash_delta: Decimal,

    /// Price the next observation is compared to; zero until seeded
    pub reference_price: Decimal,

    /// Number of executed trades
    pub tick_count: u64,
}

impl Position {
    /// Create a fresh, unseeded position.
    pub fn new(
        pair: String,
        initial_inventory: Decimal,
        trade_size: Decimal,
        min_move_threshold: Decimal,
    ) -> Self {
        Self {
            pair,
            initial_inventory,
            current_inventory: initial_inventory,
            trade_size,
            min_move_threshold,
            cash_delta: Decimal::ZERO,
            reference_price: Decimal::ZERO,
            tick_count: 0,
        }
    }

    /// True once inventory has fallen to half of the initial amount or below.
    pub fn stop_condition_met(&self) -> bool {
        self.initial_inventory / Decimal::TWO >= self.current_inventory
    }

    /// Whether a reference price has been observed yet.
    pub fn is_seeded(&self) -> bool {
        !self.reference_price.is_zero()
    }

    /// Seed the reference price from the first observation.
    pub fn seed(&mut self, price: Decimal) {
        self.reference_price = price;
    }

    /// Absolute distance between `price` and the reference price.
    pub fn delta_from_reference(&self, price: Decimal) -> Decimal {
        (price - self.reference_price).abs()
    }

    /// Book a confirmed trade at `price` that moved `delta` from the reference.
    pub fn book(&mut self, side: TradeSide, price: Decimal, delta: Decimal) {
        match side {
            TradeSide::Buy => {
                self.current_inventory += self.trade_size;
                self.cash_delta -= delta;
            }
            TradeSide::Sell => {
                self.current_inventory -= self.trade_size;
                self.cash_delta += delta;
            }
        }
        self.reference_price = price;
        self.tick_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_position() -> Position {
        Position::new("BTC-USD".to_string(), dec!(1.0), dec!(0.01), dec!(0.5))
    }

    #[test]
    fn test_new_position_is_unseeded() {
        let pos = make_position();

        assert!(!pos.is_seeded());
        assert_eq!(pos.current_inventory, dec!(1.0));
        assert_eq!(pos.cash_delta, Decimal::ZERO);
        assert_eq!(pos.tick_count, 0);
        assert!(!pos.stop_condition_met());
    }

    #[test]
    fn test_book_buy_and_sell() {
        let mut pos = make_position();
        pos.seed(dec!(100));

        pos.book(TradeSide::Buy, dec!(101), dec!(1.0));
        assert_eq!(pos.current_inventory, dec!(1.01));
        assert_eq!(pos.cash_delta, dec!(-1.0));
        assert_eq!(pos.reference_price, dec!(101));

        pos.book(TradeSide::Sell, dec!(99.5), dec!(1.5));
        assert_eq!(pos.current_inventory, dec!(1.00));
        assert_eq!(pos.cash_delta, dec!(0.5));
        assert_eq!(pos.tick_count, 2);
    }

    #[test]
    fn test_stop_condition_boundary() {
        let mut pos = Position::new("ETH-USD".to_string(), dec!(1.0), dec!(0.25), dec!(1));

        pos.book(TradeSide::Sell, dec!(10), dec!(1));
        assert!(!pos.stop_condition_met()); // 0.75

        pos.book(TradeSide::Sell, dec!(9), dec!(1));
        assert_eq!(pos.current_inventory, dec!(0.5));
        assert!(pos.stop_condition_met()); // exactly half trips
    }

    #[test]
    fn test_delta_is_absolute() {
        let mut pos = make_position();
        pos.seed(dec!(100));

        assert_eq!(pos.delta_from_reference(dec!(98.5)), dec!(1.5));
        assert_eq!(pos.delta_from_reference(dec!(100.3)), dec!(0.3));
    }
}
