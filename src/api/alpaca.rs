//! Alpaca paper-trading client.
//!
//! Only the paper trading host is wired in; there is deliberately no way to
//! construct this client against the live endpoint.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use crate::models::{Account, OrderResult, PriceBar, Position};

use super::types::*;
use super::Broker;

const PAPER_TRADING_BASE: &str = "https://paper-api.alpaca.markets";
const MARKET_DATA_BASE: &str = "https://data.alpaca.markets";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

pub struct AlpacaClient {
    http: Client,
    api_key: String,
    api_secret: String,
    trading_base: String,
    data_base: String,
}

impl AlpacaClient {
    /// Create a client against the Alpaca paper endpoints.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            trading_base: PAPER_TRADING_BASE.to_string(),
            data_base: MARKET_DATA_BASE.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!(url = %url, "Alpaca GET");
        let response = self
            .http
            .get(url)
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {what}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{what} request failed: {} - {}", status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }

    async fn submit_order(&self, ticker: &str, qty: u64, side: &'static str) -> Result<OrderResult> {
        let url = format!("{}/v2/orders", self.trading_base);
        let request = OrderRequest::market(ticker, qty, side);

        debug!(ticker = %ticker, qty, side, "Submitting market order");

        let response = self
            .http
            .post(&url)
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
            .json(&request)
            .send()
            .await
            .context("Failed to submit order")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Order submission failed: {} - {}", status, body);
        }

        let order: OrderResponse = response
            .json()
            .await
            .context("Failed to parse order response")?;

        Ok(OrderResult {
            status: order.status,
            order_id: order.id,
        })
    }
}

#[async_trait]
impl Broker for AlpacaClient {
    async fn account(&self) -> Result<Account> {
        let url = format!("{}/v2/account", self.trading_base);
        let wire: AccountResponse = self.get_json(&url, "account").await?;
        wire.into_account()
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let url = format!("{}/v2/positions", self.trading_base);
        let wire: Vec<PositionResponse> = self.get_json(&url, "positions").await?;
        wire.into_iter().map(|p| p.into_position()).collect()
    }

    async fn bars(&self, tickers: &[String], days: u32) -> Result<HashMap<String, Vec<PriceBar>>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let start = Utc::now() - chrono::Duration::days(i64::from(days));
        let url = format!(
            "{}/v2/stocks/bars?symbols={}&timeframe=1Day&start={}&feed=iex&limit=10000",
            self.data_base,
            tickers.join(","),
            start.to_rfc3339(),
        );

        let wire: BarsResponse = self.get_json(&url, "bars").await?;

        let mut result: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for ticker in tickers {
            let mut bars: Vec<PriceBar> = wire
                .bars
                .get(ticker)
                .map(|v| v.iter().cloned().map(BarResponse::into_bar).collect())
                .unwrap_or_default();
            bars.sort_by_key(|b| b.date);
            result.insert(ticker.clone(), bars);
        }
        Ok(result)
    }

    async fn latest_price(&self, ticker: &str) -> Result<f64> {
        let url = format!(
            "{}/v2/stocks/{}/trades/latest?feed=iex",
            self.data_base, ticker
        );
        let wire: LatestTradeResponse = self.get_json(&url, "latest trade").await?;
        Ok(wire.trade.p)
    }

    async fn buy(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
        self.submit_order(ticker, qty, "buy").await
    }

    async fn sell(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
        self.submit_order(ticker, qty, "sell").await
    }

    async fn headlines(&self, ticker: &str, limit: u32) -> Result<Vec<String>> {
        let url = format!(
            "{}/v1beta1/news?symbols={}&limit={}",
            self.data_base,
            ticker,
            limit.min(50)
        );
        let wire: NewsResponse = self.get_json(&url, "news").await?;
        Ok(wire
            .news
            .into_iter()
            .map(|n| n.headline)
            .filter(|h| !h.is_empty())
            .collect())
    }
}
