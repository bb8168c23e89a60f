//! Response types for the exchange gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ticker from the gateway's /ticker endpoint.
///
/// The gateway forwards upstream tickers that use either lowercase or
/// Go-style capitalized keys, and quote prices as strings or numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    #[serde(alias = "Symbol", alias = "pair", alias = "Pair")]
    pub symbol: String,
    #[serde(alias = "Price", alias = "last", alias = "Last")]
    pub price: Decimal,
    #[serde(default, alias = "Low")]
    pub low: Option<Decimal>,
    #[serde(default, alias = "High")]
    pub high: Option<Decimal>,
    #[serde(default, alias = "Volume")]
    pub volume: Option<Decimal>,
    #[serde(default, alias = "QuoteVolume")]
    pub quote_volume: Option<Decimal>,
    #[serde(default, alias = "PercentChange")]
    pub percent_change: Option<Decimal>,
}

/// Form body for /buy and /sell.
#[derive(Debug, Clone, Serialize)]
pub struct OrderForm {
    pub pair: String,
    pub amount: String,
    pub price: String,
}
