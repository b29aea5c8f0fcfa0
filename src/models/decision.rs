//! Immutable audit record for every evaluated ticker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What was done (or deliberately not done) for a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionAction::Buy => write!(f, "buy"),
            DecisionAction::Sell => write!(f, "sell"),
            DecisionAction::Hold => write!(f, "hold"),
        }
    }
}

/// One line of the decision ledger. Append-only; never mutated or deleted
/// individually (bulk retention rotation is the only removal path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// UTC timestamp of the decision; the natural sort key within the stream.
    pub timestamp: DateTime<Utc>,

    pub ticker: String,

    pub action: DecisionAction,

    /// Shares bought or sold; zero for holds.
    #[serde(default)]
    pub shares: u64,

    /// Price used for the decision, when one was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Rationale tag, e.g. "stop-loss" or "RSI sell-half (63.2)".
    pub reason: String,

    /// Indicator value the decision was based on, rounded for the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,

    /// Unrealized P&L percent that triggered a risk exit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plpc: Option<f64>,

    /// Fraction of equity allocated on a buy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_pct: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<String>,

    /// Account equity at the time of the decision.
    pub portfolio_value: f64,
}

impl Decision {
    /// Start a record with the fields every decision carries; optional fields
    /// are filled in by the builder-style setters below.
    pub fn new(
        ticker: impl Into<String>,
        action: DecisionAction,
        shares: u64,
        reason: impl Into<String>,
        portfolio_value: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            ticker: ticker.into(),
            action,
            shares,
            price: None,
            reason: reason.into(),
            rsi: None,
            plpc: None,
            allocation_pct: None,
            order_id: None,
            order_status: None,
            portfolio_value,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Record the RSI the decision used, rounded to two decimals for display.
    pub fn with_rsi(mut self, rsi: f64) -> Self {
        self.rsi = Some((rsi * 100.0).round() / 100.0);
        self
    }

    pub fn with_plpc(mut self, plpc: f64) -> Self {
        self.plpc = Some(plpc);
        self
    }

    pub fn with_allocation(mut self, allocation_pct: f64) -> Self {
        self.allocation_pct = Some(allocation_pct);
        self
    }

    pub fn with_order(mut self, result: &crate::models::OrderResult) -> Self {
        self.order_id = Some(result.order_id.clone());
        self.order_status = Some(result.status.clone());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_one_json_object() {
        let d = Decision::new("NVDA", DecisionAction::Buy, 40, "RSI buy (18.0)", 10_000.0)
            .with_price(50.0)
            .with_rsi(18.034)
            .with_allocation(0.20);

        let line = serde_json::to_string(&d).unwrap();
        assert!(!line.contains('\n'));

        let back: Decision = serde_json::from_str(&line).unwrap();
        assert_eq!(back.ticker, "NVDA");
        assert_eq!(back.action, DecisionAction::Buy);
        assert_eq!(back.shares, 40);
        assert_eq!(back.rsi, Some(18.03));
        assert_eq!(back.plpc, None);
    }

    #[test]
    fn hold_omits_optional_fields() {
        let d = Decision::new("KO", DecisionAction::Hold, 0, "hold", 10_000.0);
        let line = serde_json::to_string(&d).unwrap();
        assert!(!line.contains("order_id"));
        assert!(!line.contains("plpc"));
    }
}
