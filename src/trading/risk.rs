//! Risk exit evaluation: stop-loss and profit-taking on open positions.
//!
//! Runs before any RSI signal is computed and looks only at unrealized P&L.
//! Rules are checked top-down per position and short-circuit, so a position
//! can match at most one rule per evaluation.

use tracing::debug;

use crate::models::Position;

use super::StrategyConfig;

/// Why a position is being liquidated by the risk pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    ProfitTakeFull,
    ProfitTakeHalf,
}

impl ExitReason {
    /// Rationale tag recorded in the decision ledger.
    pub fn tag(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop-loss",
            ExitReason::ProfitTakeFull => "profit-take-full",
            ExitReason::ProfitTakeHalf => "profit-take-half",
        }
    }
}

/// A liquidation the orchestrator should execute and log.
#[derive(Debug, Clone)]
pub struct ExitOrder {
    pub ticker: String,
    pub qty: u64,
    pub reason: ExitReason,
    /// P&L percent that triggered the rule, carried into the ledger record.
    pub plpc: f64,
    pub price: f64,
}

/// Evaluate stop-loss / profit-take rules over all open positions.
///
/// Sell quantity never exceeds the position's current quantity, and a
/// half-take that floors to zero shares produces no order at all.
pub fn evaluate_exits(positions: &[Position], config: &StrategyConfig) -> Vec<ExitOrder> {
    let mut exits = Vec::new();

    for pos in positions {
        if pos.qty == 0 {
            continue;
        }
        let plpc = pos.unrealized_plpc;

        let (qty, reason) = if plpc < config.stop_loss_pct {
            (pos.qty, ExitReason::StopLoss)
        } else if plpc >= config.profit_take_full_pct {
            (pos.qty, ExitReason::ProfitTakeFull)
        } else if plpc >= config.profit_take_half_pct {
            let half = pos.half_qty();
            if half == 0 {
                continue;
            }
            (half, ExitReason::ProfitTakeHalf)
        } else {
            continue;
        };

        debug!(
            ticker = %pos.ticker,
            qty,
            plpc,
            reason = reason.tag(),
            "Risk exit triggered"
        );

        exits.push(ExitOrder {
            ticker: pos.ticker.clone(),
            qty,
            reason,
            plpc,
            price: pos.current_price,
        });
    }

    exits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(ticker: &str, qty: u64, plpc: f64) -> Position {
        Position {
            ticker: ticker.to_string(),
            qty,
            avg_entry_price: 100.0,
            current_price: 100.0 * (1.0 + plpc),
            unrealized_pl: qty as f64 * 100.0 * plpc,
            unrealized_plpc: plpc,
            market_value: qty as f64 * 100.0 * (1.0 + plpc),
        }
    }

    fn config() -> StrategyConfig {
        StrategyConfig::default()
    }

    #[test]
    fn stop_loss_sells_everything() {
        let exits = evaluate_exits(&[position("TSLA", 120, -0.05)], &config());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].qty, 120);
        assert_eq!(exits[0].reason, ExitReason::StopLoss);
    }

    #[test]
    fn stop_loss_is_exclusive() {
        // -4% matches only the stop-loss rule, never a profit-take.
        let exits = evaluate_exits(&[position("TSLA", 100, -0.04)], &config());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, ExitReason::StopLoss);
    }

    #[test]
    fn full_take_wins_over_half_take() {
        // +6% clears both profit thresholds; only the full take fires.
        let exits = evaluate_exits(&[position("NVDA", 50, 0.06)], &config());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].qty, 50);
        assert_eq!(exits[0].reason, ExitReason::ProfitTakeFull);
    }

    #[test]
    fn half_take_floors_quantity() {
        let exits = evaluate_exits(&[position("AMD", 7, 0.035)], &config());
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].qty, 3);
        assert_eq!(exits[0].reason, ExitReason::ProfitTakeHalf);
    }

    #[test]
    fn half_take_of_one_share_is_no_action() {
        let exits = evaluate_exits(&[position("AMD", 1, 0.04)], &config());
        assert!(exits.is_empty());
    }

    #[test]
    fn flat_position_is_untouched() {
        let exits = evaluate_exits(&[position("KO", 10, 0.01)], &config());
        assert!(exits.is_empty());
    }

    #[test]
    fn boundary_values() {
        // Exactly -3% is not a stop-loss (strictly below), exactly +3% and
        // +5% are profit-takes (at or above).
        let cfg = config();
        assert!(evaluate_exits(&[position("A", 10, -0.03)], &cfg).is_empty());
        assert_eq!(
            evaluate_exits(&[position("B", 10, 0.05)], &cfg)[0].reason,
            ExitReason::ProfitTakeFull
        );
        assert_eq!(
            evaluate_exits(&[position("C", 10, 0.03)], &cfg)[0].reason,
            ExitReason::ProfitTakeHalf
        );
    }
}
