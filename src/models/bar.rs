//! Daily OHLCV price bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar for a ticker. Immutable once fetched; sequences are always
/// ordered oldest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Calendar day of the bar (ascending order is significant).
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Extract the closing prices from an oldest-first bar sequence.
    pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
        bars.iter().map(|b| b.close).collect()
    }
}
