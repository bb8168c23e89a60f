//! Threshold trading engine: turns one price observation per tick into a
//! buy, a sell, or nothing, and keeps the position's books.
//!
//! Each tick runs in a fixed order:
//! 1. Stop rule: inventory at or below half the initial amount ends trading
//! 2. Fetch the current price
//! 3. Seed the reference price on the first observation
//! 4. Hold if the move from the reference is below the threshold
//! 5. Buy on an up move, sell on a down move
//! 6. Book the trade only after the exchange confirmed it

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::Exchange;
use crate::models::{Fill, Position, TradeSide};

use super::TradingConfig;

/// Errors returned by [`TradingEngine::tick`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Inventory fell to the stop level. Fatal: the engine never trades again.
    #[error("stop triggered: inventory {current_inventory} is at or below half of initial {initial_inventory}")]
    StopTriggered {
        initial_inventory: Decimal,
        current_inventory: Decimal,
    },

    /// The exchange did not return a price. The tick changed nothing.
    #[error("price fetch failed for {pair}: {source:#}")]
    PriceFetchFailed {
        pair: String,
        #[source]
        source: anyhow::Error,
    },

    /// The exchange rejected or failed the order. The tick changed nothing.
    #[error("{side} order failed for {pair}: {source:#}")]
    OrderExecutionFailed {
        side: TradeSide,
        pair: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid trading config: {0}")]
    ConfigInvalid(String),
}

impl EngineError {
    /// Whether the engine must not be ticked again after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::StopTriggered { .. })
    }
}

/// Engine lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Stopped,
}

/// What a successful tick did.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// First observation; the reference price was set and nothing traded.
    Seeded { price: Decimal },
    /// The move was below the threshold.
    Held { price: Decimal, delta: Decimal },
    /// A trade was executed and booked.
    Traded(Fill),
}

/// Single-pair threshold trader bound to one exchange.
pub struct TradingEngine<E> {
    exchange: E,
    position: Position,
    state: EngineState,
}

impl<E: Exchange> TradingEngine<E> {
    /// Create an engine with a fresh position built from `config`.
    pub fn new(config: TradingConfig, exchange: E) -> Result<Self, EngineError> {
        config.validate()?;

        let position = Position::new(
            config.pair,
            config.initial_inventory,
            config.trade_size,
            config.min_move_threshold,
        );

        Ok(Self {
            exchange,
            position,
            state: EngineState::Running,
        })
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Run one evaluation cycle.
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        if self.state == EngineState::Stopped || self.position.stop_condition_met() {
            self.state = EngineState::Stopped;
            return Err(EngineError::StopTriggered {
                initial_inventory: self.position.initial_inventory,
                current_inventory: self.position.current_inventory,
            });
        }

        let pair = self.position.pair.clone();
        let price = match self.exchange.get_price(&pair).await {
            Ok(price) => price,
            Err(source) => return Err(EngineError::PriceFetchFailed { pair, source }),
        };

        if !self.position.is_seeded() {
            self.position.seed(price);
            info!(pair = %pair, price = %price, "Reference price seeded");
            return Ok(TickOutcome::Seeded { price });
        }

        let delta = self.position.delta_from_reference(price);
        if delta < self.position.min_move_threshold {
            debug!(
                pair = %pair,
                price = %price,
                reference = %self.position.reference_price,
                delta = %delta,
                "Move below threshold, holding"
            );
            return Ok(TickOutcome::Held { price, delta });
        }

        let side = if price > self.position.reference_price {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };
        let quantity = self.position.trade_size;

        let result = match side {
            TradeSide::Buy => self.exchange.buy(&pair, quantity, price).await,
            TradeSide::Sell => self.exchange.sell(&pair, quantity, price).await,
        };
        if let Err(source) = result {
            return Err(EngineError::OrderExecutionFailed { side, pair, source });
        }

        self.position.book(side, price, delta);

        let fill = Fill {
            side,
            quantity,
            price,
            delta,
            inventory_after: self.position.current_inventory,
            cash_delta_after: self.position.cash_delta,
            trade_number: self.position.tick_count,
            executed_at: Utc::now(),
        };

        info!(
            pair = %pair,
            side = %side,
            price = %price,
            delta = %delta,
            inventory = %fill.inventory_after,
            cash_delta = %fill.cash_delta_after,
            trade = fill.trade_number,
            "Trade executed"
        );

        Ok(TickOutcome::Traded(fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SimulatedExchange;
    use rust_decimal_macros::dec;

    fn make_config(initial: Decimal, size: Decimal, threshold: Decimal) -> TradingConfig {
        TradingConfig {
            pair: "BTC-USD".to_string(),
            initial_inventory: initial,
            trade_size: size,
            min_move_threshold: threshold,
        }
    }

    fn make_engine(prices: Vec<Decimal>) -> TradingEngine<SimulatedExchange> {
        TradingEngine::new(
            make_config(dec!(1.0), dec!(0.01), dec!(0.5)),
            SimulatedExchange::new(prices),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_tick_seeds_without_trading() {
        let mut engine = make_engine(vec![dec!(100)]);

        let outcome = engine.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Seeded { price } if price == dec!(100)));

        let pos = engine.position();
        assert_eq!(pos.reference_price, dec!(100));
        assert_eq!(pos.current_inventory, dec!(1.0));
        assert_eq!(pos.cash_delta, Decimal::ZERO);
        assert_eq!(pos.tick_count, 0);
        assert!(engine.exchange().orders().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_buy_then_sell() {
        let mut engine = make_engine(vec![dec!(100), dec!(100.3), dec!(101), dec!(99.5)]);

        engine.tick().await.unwrap();

        let outcome = engine.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Held { delta, .. } if delta == dec!(0.3)));
        assert_eq!(engine.position().reference_price, dec!(100));
        assert!(engine.exchange().orders().is_empty());

        match engine.tick().await.unwrap() {
            TickOutcome::Traded(fill) => {
                assert_eq!(fill.side, TradeSide::Buy);
                assert_eq!(fill.delta, dec!(1.0));
                assert_eq!(fill.trade_number, 1);
            }
            other => panic!("expected a buy, got {:?}", other),
        }
        let pos = engine.position();
        assert_eq!(pos.current_inventory, dec!(1.01));
        assert_eq!(pos.cash_delta, dec!(-1.0));
        assert_eq!(pos.reference_price, dec!(101));

        match engine.tick().await.unwrap() {
            TickOutcome::Traded(fill) => assert_eq!(fill.side, TradeSide::Sell),
            other => panic!("expected a sell, got {:?}", other),
        }
        let pos = engine.position();
        assert_eq!(pos.current_inventory, dec!(1.00));
        assert_eq!(pos.cash_delta, dec!(0.5));
        assert_eq!(pos.reference_price, dec!(99.5));
        assert_eq!(pos.tick_count, 2);

        let orders = engine.exchange().orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, TradeSide::Buy);
        assert_eq!(orders[0].quantity, dec!(0.01));
        assert_eq!(orders[0].price, dec!(101));
        assert_eq!(orders[1].side, TradeSide::Sell);
        assert_eq!(orders[1].price, dec!(99.5));
    }

    #[tokio::test]
    async fn test_move_exactly_at_threshold_trades() {
        let mut engine = make_engine(vec![dec!(100), dec!(99.5)]);

        engine.tick().await.unwrap();
        let outcome = engine.tick().await.unwrap();

        assert!(matches!(outcome, TickOutcome::Traded(ref f) if f.side == TradeSide::Sell));
        assert_eq!(engine.position().current_inventory, dec!(0.99));
        assert_eq!(engine.position().cash_delta, dec!(0.5));
    }

    #[tokio::test]
    async fn test_failed_order_changes_nothing() {
        let mut engine = make_engine(vec![dec!(100), dec!(102), dec!(102)]);
        engine.tick().await.unwrap();

        engine.exchange().fail_orders(Some("gateway returned 500"));
        let err = engine.tick().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::OrderExecutionFailed { side: TradeSide::Buy, .. }
        ));
        assert!(!err.is_fatal());

        let pos = engine.position();
        assert_eq!(pos.current_inventory, dec!(1.0));
        assert_eq!(pos.cash_delta, Decimal::ZERO);
        assert_eq!(pos.reference_price, dec!(100));
        assert_eq!(pos.tick_count, 0);

        // The next tick retries against the unchanged reference.
        engine.exchange().fail_orders(None);
        assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Traded(_)));
        assert_eq!(engine.position().current_inventory, dec!(1.01));
        assert_eq!(engine.position().cash_delta, dec!(-2));
    }

    #[tokio::test]
    async fn test_failed_price_fetch_changes_nothing() {
        let mut engine = make_engine(vec![dec!(100)]);
        engine.exchange().fail_next_price("timeout");

        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, EngineError::PriceFetchFailed { .. }));
        assert!(!engine.position().is_seeded());
        assert_eq!(engine.state(), EngineState::Running);

        // Seeding still happens on the first successful observation.
        assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Seeded { .. }));
    }

    #[tokio::test]
    async fn test_stop_after_inventory_halves() {
        // Each sell drops 0.25; two sells reach exactly half.
        let mut engine = TradingEngine::new(
            make_config(dec!(1.0), dec!(0.25), dec!(0.5)),
            SimulatedExchange::new(vec![dec!(100), dec!(99), dec!(98), dec!(150), dec!(150)]),
        )
        .unwrap();

        engine.tick().await.unwrap();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();
        assert_eq!(engine.position().current_inventory, dec!(0.5));

        let requests_before = engine.exchange().price_requests();
        for _ in 0..3 {
            let err = engine.tick().await.unwrap_err();
            assert!(matches!(err, EngineError::StopTriggered { .. }));
            assert!(err.is_fatal());
        }

        assert!(engine.is_stopped());
        assert_eq!(engine.exchange().price_requests(), requests_before);
        assert_eq!(engine.exchange().remaining_prices(), 2);
        assert_eq!(engine.exchange().orders().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_sells_reach_stop() {
        // Seed at 100, then fifty one-point drops at 0.01 each.
        let prices: Vec<Decimal> = (50..=100).rev().map(Decimal::from).collect();
        let mut engine = make_engine(prices);
        engine.exchange().push_price(dec!(500));

        for _ in 0..51 {
            engine.tick().await.unwrap();
        }
        assert_eq!(engine.position().current_inventory, dec!(0.5));
        assert_eq!(engine.position().cash_delta, dec!(50));
        assert_eq!(engine.position().tick_count, 50);

        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, EngineError::StopTriggered { .. }));
        assert_eq!(engine.exchange().remaining_prices(), 1);
    }

    #[tokio::test]
    async fn test_inventory_moves_in_trade_size_steps() {
        let prices = vec![
            dec!(100), dec!(103), dec!(101.9), dec!(102.1), dec!(104), dec!(95), dec!(96.7),
        ];
        let mut engine = make_engine(prices.clone());
        let mut previous = engine.position().current_inventory;

        for _ in 0..prices.len() {
            match engine.tick().await.unwrap() {
                TickOutcome::Traded(fill) => {
                    let step = fill.inventory_after - previous;
                    match fill.side {
                        TradeSide::Buy => assert_eq!(step, dec!(0.01)),
                        TradeSide::Sell => assert_eq!(step, dec!(-0.01)),
                    }
                    assert_eq!(fill.quantity, dec!(0.01));
                    previous = fill.inventory_after;
                }
                _ => assert_eq!(engine.position().current_inventory, previous),
            }
        }

        // up, down, up, down, up
        let sides: Vec<_> = engine.exchange().orders().iter().map(|o| o.side).collect();
        assert_eq!(
            sides,
            vec![TradeSide::Buy, TradeSide::Sell, TradeSide::Buy, TradeSide::Sell, TradeSide::Buy]
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = TradingEngine::new(
            make_config(dec!(1.0), dec!(0), dec!(0.5)),
            SimulatedExchange::default(),
        );
        assert!(matches!(result, Err(EngineError::ConfigInvalid(_))));
    }
}
