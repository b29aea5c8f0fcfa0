//! Open position in a single ticker.

use serde::{Deserialize, Serialize};

/// An open long position. A ticker has at most one open position at any time;
/// the broker is the source of truth for quantity and P&L.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Ticker symbol, unique key across open positions.
    pub ticker: String,

    /// Whole shares held; greater than zero while the position is open.
    pub qty: u64,

    /// Average entry price per share.
    pub avg_entry_price: f64,

    /// Latest known market price per share.
    pub current_price: f64,

    /// Unrealized P&L in dollars.
    pub unrealized_pl: f64,

    /// Unrealized P&L as a fraction of cost basis (e.g. -0.05 = down 5%).
    pub unrealized_plpc: f64,

    /// Current market value in dollars.
    pub market_value: f64,
}

impl Position {
    /// Half the position, floored. Zero for a single-share position.
    pub fn half_qty(&self) -> u64 {
        self.qty / 2
    }
}
