//! Strategy configuration: thresholds and allocation tiers.

use serde::{Deserialize, Serialize};

/// Numeric knobs for the decision engine. Defaults match the aggressive
/// RSI mean-reversion profile: buy dips hard, take profits fast, cut losses
/// early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    // === Risk exits (on unrealized P&L percent) ===
    /// Sell everything below this loss fraction.
    pub stop_loss_pct: f64,

    /// Sell everything at or above this gain fraction.
    pub profit_take_full_pct: f64,

    /// Sell half at or above this gain fraction (below the full threshold).
    pub profit_take_half_pct: f64,

    // === RSI signal thresholds ===
    /// Sell the entire held position above this RSI.
    pub rsi_sell_all: f64,

    /// Sell half the held position above this RSI.
    pub rsi_sell_half: f64,

    /// Buy tiers for non-held tickers: below `rsi_buy_deep` allocate
    /// `alloc_deep`, below `rsi_buy_oversold` allocate `alloc_oversold`,
    /// below `rsi_buy_dip` allocate `alloc_dip`. At or above the dip
    /// threshold there is no trade.
    pub rsi_buy_deep: f64,
    pub rsi_buy_oversold: f64,
    pub rsi_buy_dip: f64,
    pub alloc_deep: f64,
    pub alloc_oversold: f64,
    pub alloc_dip: f64,

    // === Near-oversold watch-list for the cycle summary ===
    /// Non-held tickers below this RSI are watch-list candidates.
    pub watch_rsi_max: f64,

    /// How many watch-list entries to keep (ascending RSI).
    pub watch_top_n: usize,

    // === Market data ===
    /// Wilder RSI lookback period.
    pub rsi_period: usize,

    /// Calendar days of daily bars to request per ticker.
    pub bar_lookback_days: u32,

    // === Advisor gate (advisor-selected strategy only) ===
    /// Minimum advisor confidence (1-10) before acting.
    pub confidence_threshold: u8,

    /// Equity fraction a full advisor allocation maps to.
    pub max_position_pct: f64,

    // === Failure policy ===
    /// When the post-exit position rescan fails, suppress all buys for the
    /// cycle instead of trusting the locally rebuilt holdings.
    pub conservative_on_rescan_failure: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: -0.03,
            profit_take_full_pct: 0.05,
            profit_take_half_pct: 0.03,

            rsi_sell_all: 65.0,
            rsi_sell_half: 55.0,
            rsi_buy_deep: 20.0,
            rsi_buy_oversold: 30.0,
            rsi_buy_dip: 40.0,
            alloc_deep: 0.20,
            alloc_oversold: 0.15,
            alloc_dip: 0.10,

            watch_rsi_max: 45.0,
            watch_top_n: 3,

            rsi_period: crate::indicators::RSI_PERIOD,
            bar_lookback_days: 30,

            confidence_threshold: 8,
            max_position_pct: 0.05,

            conservative_on_rescan_failure: true,
        }
    }
}
