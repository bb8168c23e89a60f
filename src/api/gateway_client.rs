//! HTTP client for the exchange gateway.
//!
//! The gateway exposes three endpoints:
//! - `GET /ticker?pair=..` returning the current ticker
//! - `POST /buy` and `POST /sell` taking a form with pair, amount and price
//!
//! Every request is sent with the account's API key and secret headers.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::debug;

use crate::models::TradeSide;

use super::types::{OrderForm, Ticker};
use super::Exchange;

/// Default gateway address.
pub const GATEWAY_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the exchange gateway.
pub struct GatewayClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(base_url: &str, api_key: &str, api_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    /// Point the client at a different gateway.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Gateway base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full ticker for a pair.
    pub async fn ticker(&self, pair: &str) -> Result<Ticker> {
        let url = format!("{}/ticker", self.base_url);
        debug!(url = %url, pair = %pair, "Fetching ticker");

        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&[("pair", pair)])
            .send()
            .await
            .context("Failed to fetch ticker")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Ticker request failed: {} - {}", status, text));
        }

        resp.json().await.context("Failed to parse ticker response")
    }

    /// Submit a buy or sell order.
    pub async fn submit_order(
        &self,
        side: TradeSide,
        pair: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<()> {
        let path = match side {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        };
        let url = format!("{}/{}", self.base_url, path);
        let form = OrderForm {
            pair: pair.to_string(),
            amount: quantity.normalize().to_string(),
            price: price.normalize().to_string(),
        };

        debug!(url = %url, pair = %pair, amount = %form.amount, price = %form.price, "Submitting order");

        let resp = self
            .http
            .post(&url)
            .headers(self.auth_headers()?)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("Failed to send {} order", side))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "failed to {} {} {} at {}: {} - {}",
                path,
                form.amount,
                pair,
                form.price,
                status,
                text
            ));
        }

        Ok(())
    }

    /// Build the API key headers sent with every request.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(&self.api_key).context("Invalid API key header")?,
        );
        headers.insert(
            HeaderName::from_static("x-api-secret"),
            HeaderValue::from_str(&self.api_secret).context("Invalid API secret header")?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl Exchange for GatewayClient {
    async fn get_price(&self, pair: &str) -> Result<Decimal> {
        quoted_price(&self.ticker(pair).await?)
    }

    async fn buy(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()> {
        self.submit_order(TradeSide::Buy, pair, quantity, price).await
    }

    async fn sell(&self, pair: &str, quantity: Decimal, price: Decimal) -> Result<()> {
        self.submit_order(TradeSide::Sell, pair, quantity, price).await
    }
}

/// Price from a ticker, refusing quotes the engine could not trade on.
fn quoted_price(ticker: &Ticker) -> Result<Decimal> {
    if ticker.price <= Decimal::ZERO {
        bail!("Gateway quoted non-positive price {} for {}", ticker.price, ticker.symbol);
    }
    Ok(ticker.price)
}

/// Helper to create a client from environment variables.
impl GatewayClient {
    /// Create from environment variables:
    /// - PRICEBOT_API_KEY
    /// - PRICEBOT_API_SECRET
    /// - PRICEBOT_GATEWAY_URL (defaults to http://localhost:8080)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("PRICEBOT_API_KEY").context("PRICEBOT_API_KEY not set")?;
        let api_secret =
            std::env::var("PRICEBOT_API_SECRET").context("PRICEBOT_API_SECRET not set")?;
        let base_url =
            std::env::var("PRICEBOT_GATEWAY_URL").unwrap_or_else(|_| GATEWAY_URL.to_string());

        Self::new(&base_url, &api_key, &api_secret)
    }
}
