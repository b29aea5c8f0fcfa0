//! Wire types for the Alpaca REST API.
//!
//! Alpaca sends account and position numbers as strings; they are normalized
//! to numeric types here, at the boundary, so the engine's data model stays
//! purely numeric.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Account, PriceBar, Position};

pub(super) fn parse_num(value: &str, field: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("Failed to parse {field} from {value:?}"))
}

/// /v2/account response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub equity: String,
    pub cash: String,
    pub buying_power: String,
}

impl AccountResponse {
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            equity: parse_num(&self.equity, "equity")?,
            cash: parse_num(&self.cash, "cash")?,
            buying_power: parse_num(&self.buying_power, "buying_power")?,
        })
    }
}

/// /v2/positions entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionResponse {
    pub symbol: String,
    pub qty: String,
    pub avg_entry_price: String,
    pub current_price: String,
    pub unrealized_pl: String,
    pub unrealized_plpc: String,
    pub market_value: String,
}

impl PositionResponse {
    pub fn into_position(self) -> Result<Position> {
        Ok(Position {
            ticker: self.symbol,
            // Whole shares only in this engine; a fractional wire quantity
            // is floored rather than rejected.
            qty: parse_num(&self.qty, "qty")?.max(0.0).floor() as u64,
            avg_entry_price: parse_num(&self.avg_entry_price, "avg_entry_price")?,
            current_price: parse_num(&self.current_price, "current_price")?,
            unrealized_pl: parse_num(&self.unrealized_pl, "unrealized_pl")?,
            unrealized_plpc: parse_num(&self.unrealized_plpc, "unrealized_plpc")?,
            market_value: parse_num(&self.market_value, "market_value")?,
        })
    }
}

/// One bar in the /v2/stocks/bars response.
#[derive(Debug, Clone, Deserialize)]
pub struct BarResponse {
    pub t: DateTime<Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: u64,
}

impl BarResponse {
    pub fn into_bar(self) -> PriceBar {
        PriceBar {
            date: self.t.date_naive(),
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        }
    }
}

/// /v2/stocks/bars response.
#[derive(Debug, Clone, Deserialize)]
pub struct BarsResponse {
    #[serde(default)]
    pub bars: HashMap<String, Vec<BarResponse>>,
}

/// /v2/stocks/{symbol}/trades/latest response.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestTradeResponse {
    pub trade: LatestTrade,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestTrade {
    /// Trade price.
    pub p: f64,
}

/// /v2/orders request body (market order, day time-in-force).
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
}

impl OrderRequest {
    pub fn market(symbol: &str, qty: u64, side: &'static str) -> Self {
        Self {
            symbol: symbol.to_string(),
            qty: qty.to_string(),
            side,
            order_type: "market",
            time_in_force: "day",
        }
    }
}

/// /v2/orders response (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
}

/// /v1beta1/news response.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub headline: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_numbers_are_normalized() {
        let wire = AccountResponse {
            equity: "100000.55".to_string(),
            cash: "2500".to_string(),
            buying_power: "200001.10".to_string(),
        };
        let account = wire.into_account().unwrap();
        assert!((account.equity - 100000.55).abs() < 1e-9);
        assert!((account.cash - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn position_quantity_floors_to_whole_shares() {
        let wire = PositionResponse {
            symbol: "AAPL".to_string(),
            qty: "120.7".to_string(),
            avg_entry_price: "150.0".to_string(),
            current_price: "142.5".to_string(),
            unrealized_pl: "-900.0".to_string(),
            unrealized_plpc: "-0.05".to_string(),
            market_value: "17100.0".to_string(),
        };
        let pos = wire.into_position().unwrap();
        assert_eq!(pos.qty, 120);
        assert!((pos.unrealized_plpc + 0.05).abs() < 1e-9);
    }

    #[test]
    fn garbage_numbers_are_errors() {
        let wire = AccountResponse {
            equity: "not-a-number".to_string(),
            cash: "0".to_string(),
            buying_power: "0".to_string(),
        };
        assert!(wire.into_account().is_err());
    }
}
