//! Signal generation: RSI classification with two interchangeable policies.
//!
//! The pure RSI policy and the advisor-gated policy used to live in separate,
//! slightly divergent scripts; they are collapsed here behind one generator
//! selected by configuration. They are alternatives, never layered.

use std::sync::Arc;

use crate::advisor::{AdvisedAction, Advisor};
use crate::models::Position;

use super::StrategyConfig;

/// Classified intent for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalAction {
    /// Buy with this fraction of account equity.
    Buy { allocation: f64 },

    /// Sell this many shares of the held position.
    Sell { qty: u64 },

    Hold,
}

/// Outcome of classification, with the rationale tag for the ledger.
#[derive(Debug, Clone)]
pub struct Signal {
    pub action: SignalAction,
    pub reason: String,
}

impl Signal {
    fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Hold,
            reason: reason.into(),
        }
    }
}

/// Everything the generator may need to classify one ticker.
pub struct TickerContext<'a> {
    pub ticker: &'a str,
    pub rsi: Option<f64>,
    pub price: Option<f64>,
    pub headlines: &'a [String],
    /// The open position for this ticker, if any survived the risk pass.
    pub held: Option<&'a Position>,
}

/// Configuration-selected signal policy.
pub enum SignalGenerator {
    /// Pure RSI mean-reversion thresholds.
    RsiOnly { config: StrategyConfig },

    /// Acts only when the advisor's confidence clears the threshold; buy
    /// allocation comes from the advisor scaled by the maximum position
    /// percent, not from the RSI tiers.
    AdvisorGated {
        advisor: Arc<dyn Advisor>,
        config: StrategyConfig,
    },
}

impl SignalGenerator {
    /// Whether this policy is useless without an RSI value. The RSI-only
    /// policy skips tickers with insufficient bar history; the advisor can
    /// still reason from headlines alone.
    pub fn requires_rsi(&self) -> bool {
        matches!(self, SignalGenerator::RsiOnly { .. })
    }

    /// Whether classification consults the advisor (and so wants headlines).
    pub fn uses_advisor(&self) -> bool {
        matches!(self, SignalGenerator::AdvisorGated { .. })
    }

    pub async fn classify(&self, ctx: TickerContext<'_>) -> Signal {
        match self {
            SignalGenerator::RsiOnly { config } => Self::classify_rsi(&ctx, config),
            SignalGenerator::AdvisorGated { advisor, config } => {
                Self::classify_advised(&ctx, advisor.as_ref(), config).await
            }
        }
    }

    fn classify_rsi(ctx: &TickerContext<'_>, config: &StrategyConfig) -> Signal {
        let Some(rsi) = ctx.rsi else {
            return Signal::hold("hold (RSI unavailable)");
        };

        if let Some(pos) = ctx.held {
            // Boundary values fall to the gentler branch: RSI == 65 is a
            // half-sell candidate, RSI == 55 a hold.
            if rsi > config.rsi_sell_all {
                return Signal {
                    action: SignalAction::Sell { qty: pos.qty },
                    reason: format!("RSI sell-all ({rsi:.1})"),
                };
            }
            if rsi > config.rsi_sell_half {
                let half = pos.half_qty();
                if half == 0 {
                    return Signal::hold(format!("hold (RSI sell-half ({rsi:.1}) rounds to zero)"));
                }
                return Signal {
                    action: SignalAction::Sell { qty: half },
                    reason: format!("RSI sell-half ({rsi:.1})"),
                };
            }
            return Signal::hold(format!("RSI hold ({rsi:.1})"));
        }

        // Buy tiers; RSI at or above the dip threshold is the no-trade branch.
        let (allocation, label) = if rsi < config.rsi_buy_deep {
            (config.alloc_deep, "deep oversold")
        } else if rsi < config.rsi_buy_oversold {
            (config.alloc_oversold, "oversold")
        } else if rsi < config.rsi_buy_dip {
            (config.alloc_dip, "dipping")
        } else {
            return Signal::hold(format!("RSI hold ({rsi:.1})"));
        };

        Signal {
            action: SignalAction::Buy { allocation },
            reason: format!("RSI buy ({rsi:.1}) - {label}"),
        }
    }

    async fn classify_advised(
        ctx: &TickerContext<'_>,
        advisor: &dyn Advisor,
        config: &StrategyConfig,
    ) -> Signal {
        let report = advisor
            .analyze(ctx.ticker, ctx.rsi, ctx.headlines, ctx.price)
            .await;

        if report.confidence < config.confidence_threshold {
            return Signal::hold(format!(
                "hold (advisor confidence {} below {}: {})",
                report.confidence, config.confidence_threshold, report.reasoning
            ));
        }

        match report.action {
            AdvisedAction::Buy => {
                if ctx.held.is_some() {
                    return Signal::hold("hold (already held)");
                }
                let allocation = report.suggested_allocation * config.max_position_pct;
                if allocation <= 0.0 {
                    return Signal::hold(format!(
                        "hold (advisor buy with zero allocation: {})",
                        report.reasoning
                    ));
                }
                Signal {
                    action: SignalAction::Buy { allocation },
                    reason: format!(
                        "advisor buy ({}, confidence {})",
                        report.sentiment, report.confidence
                    ),
                }
            }
            AdvisedAction::Sell => match ctx.held {
                Some(pos) => Signal {
                    action: SignalAction::Sell { qty: pos.qty },
                    reason: format!(
                        "advisor sell ({}, confidence {})",
                        report.sentiment, report.confidence
                    ),
                },
                None => Signal::hold("hold (no position to sell)"),
            },
            AdvisedAction::Hold => Signal::hold(format!(
                "advisor hold (confidence {}): {}",
                report.confidence, report.reasoning
            )),
        }
    }
}
