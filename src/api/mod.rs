//! Broker capability: account state, market data, and order execution.

mod alpaca;
mod retry;
mod types;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Account, OrderResult, PriceBar, Position};

pub use alpaca::AlpacaClient;
pub use retry::RetryBroker;

/// Abstract broker the engine trades through. Implementations must be
/// paper-trading only; a live endpoint never reaches this layer.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Fresh account snapshot. Never cached by callers across cycles.
    async fn account(&self) -> Result<Account>;

    /// All currently open positions.
    async fn positions(&self) -> Result<Vec<Position>>;

    /// Daily bars per ticker over the trailing `days`, oldest-first.
    /// Tickers with no data map to an empty list.
    async fn bars(&self, tickers: &[String], days: u32) -> Result<HashMap<String, Vec<PriceBar>>>;

    /// Latest trade price for a ticker.
    async fn latest_price(&self, ticker: &str) -> Result<f64>;

    /// Submit a market buy for whole shares.
    async fn buy(&self, ticker: &str, qty: u64) -> Result<OrderResult>;

    /// Submit a market sell for whole shares.
    async fn sell(&self, ticker: &str, qty: u64) -> Result<OrderResult>;

    /// Recent news headlines for a ticker (titles only).
    async fn headlines(&self, ticker: &str, limit: u32) -> Result<Vec<String>>;
}
