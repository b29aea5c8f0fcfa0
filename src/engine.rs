//! Cycle orchestrator: risk exits first, then signals, one summary per cycle.
//!
//! A cycle is best-effort per ticker: broker failures are tallied and logged,
//! never allowed to abort the rest of the scan. The only hard failure inside
//! a cycle is the decision ledger, because trading without an audit trail is
//! worse than not trading.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::Broker;
use crate::indicators::rsi;
use crate::ledger::DecisionLedger;
use crate::models::{Decision, DecisionAction, Position, PriceBar};
use crate::trading::{
    evaluate_exits, shares_for_allocation, SignalAction, SignalGenerator, StrategyConfig,
    TickerContext,
};

const HEADLINE_LIMIT: u32 = 5;

/// One executed trade, as reported in the cycle summary.
#[derive(Debug, Clone, Serialize)]
pub struct TradeLine {
    pub ticker: String,
    pub qty: u64,
    pub reason: String,
}

/// Near-oversold ticker worth watching next cycle.
#[derive(Debug, Clone, Serialize)]
pub struct WatchEntry {
    pub ticker: String,
    pub rsi: f64,
}

/// What one cycle did, in aggregate.
#[derive(Debug, Default, Serialize)]
pub struct CycleSummary {
    pub equity: f64,
    pub tickers_scanned: usize,
    pub buys: Vec<TradeLine>,
    pub sells: Vec<TradeLine>,
    pub holds: usize,
    pub skipped: usize,
    pub errors: usize,
    pub watchlist: Vec<WatchEntry>,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "equity ${:.2} | scanned {} | buys {} | sells {} | holds {} | skipped {} | errors {}",
            self.equity,
            self.tickers_scanned,
            self.buys.len(),
            self.sells.len(),
            self.holds,
            self.skipped,
            self.errors
        )?;
        for t in &self.sells {
            writeln!(f, "  sell {} x{} ({})", t.ticker, t.qty, t.reason)?;
        }
        for t in &self.buys {
            writeln!(f, "  buy  {} x{} ({})", t.ticker, t.qty, t.reason)?;
        }
        if !self.watchlist.is_empty() {
            let entries: Vec<String> = self
                .watchlist
                .iter()
                .map(|w| format!("{} ({:.1})", w.ticker, w.rsi))
                .collect();
            writeln!(f, "  watch: {}", entries.join(", "))?;
        }
        Ok(())
    }
}

pub struct CycleEngine {
    broker: Arc<dyn Broker>,
    signals: SignalGenerator,
    ledger: Arc<DecisionLedger>,
    config: StrategyConfig,
    watch_groups: Vec<Vec<String>>,
}

impl CycleEngine {
    pub fn new(
        broker: Arc<dyn Broker>,
        signals: SignalGenerator,
        ledger: Arc<DecisionLedger>,
        config: StrategyConfig,
        watch_groups: Vec<Vec<String>>,
    ) -> Self {
        Self {
            broker,
            signals,
            ledger,
            config,
            watch_groups,
        }
    }

    /// Run one full decision cycle: account snapshot, risk exits, position
    /// rescan, signal scan over every watch group.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();

        let account = match self.broker.account().await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "Account fetch failed, skipping cycle");
                summary.errors += 1;
                return Ok(summary);
            }
        };
        summary.equity = account.equity;
        if account.equity <= 0.0 {
            warn!(equity = account.equity, "No usable equity, skipping cycle");
            return Ok(summary);
        }

        let positions = match self.broker.positions().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Position fetch failed, skipping cycle");
                summary.errors += 1;
                return Ok(summary);
            }
        };

        // Risk pass. Any ticker the risk rules acted on (or tried to) is
        // settled for this cycle and excluded from the signal scan.
        let exits = evaluate_exits(&positions, &self.config);
        let mut handled: HashSet<&str> = HashSet::new();
        let mut executed: Vec<(String, u64)> = Vec::new();
        for exit in &exits {
            handled.insert(exit.ticker.as_str());
            match self.broker.sell(&exit.ticker, exit.qty).await {
                Ok(order) => {
                    info!(
                        ticker = %exit.ticker,
                        qty = exit.qty,
                        reason = exit.reason.tag(),
                        plpc = exit.plpc,
                        "Risk exit executed"
                    );
                    let decision = Decision::new(
                        &exit.ticker,
                        DecisionAction::Sell,
                        exit.qty,
                        exit.reason.tag(),
                        account.equity,
                    )
                    .with_plpc(exit.plpc)
                    .with_price(exit.price)
                    .with_order(&order);
                    self.ledger.append(&decision)?;

                    summary.sells.push(TradeLine {
                        ticker: exit.ticker.clone(),
                        qty: exit.qty,
                        reason: exit.reason.tag().to_string(),
                    });
                    executed.push((exit.ticker.clone(), exit.qty));
                }
                Err(e) => {
                    warn!(ticker = %exit.ticker, error = %e, "Risk exit sell failed");
                    summary.errors += 1;
                }
            }
        }

        // Rescan so the signal pass sees post-exit holdings. If the rescan
        // fails the holdings are rebuilt locally from the executed exits, and
        // buys are suppressed unless configured otherwise.
        let mut suppress_buys = false;
        let held = if executed.is_empty() {
            positions
        } else {
            match self.broker.positions().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Post-exit rescan failed, rebuilding holdings locally");
                    summary.errors += 1;
                    suppress_buys = self.config.conservative_on_rescan_failure;
                    rebuild_positions(positions, &executed)
                }
            }
        };
        let held_by_ticker: HashMap<&str, &Position> =
            held.iter().map(|p| (p.ticker.as_str(), p)).collect();

        let mut watch: Vec<WatchEntry> = Vec::new();

        for group in &self.watch_groups {
            let bars = match self
                .broker
                .bars(group, self.config.bar_lookback_days)
                .await
            {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, group = ?group, "Bars fetch failed, skipping group");
                    summary.errors += 1;
                    continue;
                }
            };

            for ticker in group {
                summary.tickers_scanned += 1;

                if handled.contains(ticker.as_str()) {
                    debug!(ticker = %ticker, "Settled by risk exit this cycle");
                    summary.skipped += 1;
                    continue;
                }

                let closes: Vec<f64> = bars
                    .get(ticker)
                    .map(|b| PriceBar::closes(b))
                    .unwrap_or_default();
                let rsi_value = rsi(&closes, self.config.rsi_period);
                let price = closes.last().copied();
                let held_pos = held_by_ticker.get(ticker.as_str()).copied();

                if rsi_value.is_none() && self.signals.requires_rsi() {
                    debug!(ticker = %ticker, bars = closes.len(), "Insufficient history for RSI");
                    summary.skipped += 1;
                    continue;
                }

                if let (Some(r), None) = (rsi_value, held_pos) {
                    if r < self.config.watch_rsi_max {
                        watch.push(WatchEntry {
                            ticker: ticker.clone(),
                            rsi: r,
                        });
                    }
                }

                let headlines = if self.signals.uses_advisor() {
                    match self.broker.headlines(ticker, HEADLINE_LIMIT).await {
                        Ok(h) => h,
                        Err(e) => {
                            warn!(ticker = %ticker, error = %e, "Headline fetch failed");
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };

                let signal = self
                    .signals
                    .classify(TickerContext {
                        ticker,
                        rsi: rsi_value,
                        price,
                        headlines: &headlines,
                        held: held_pos,
                    })
                    .await;

                match signal.action {
                    SignalAction::Buy { allocation } => {
                        if suppress_buys {
                            self.record_hold(
                                &mut summary,
                                ticker,
                                "hold (buys suppressed after rescan failure)",
                                rsi_value,
                                price,
                                account.equity,
                            )?;
                            continue;
                        }
                        // Buys are priced off the latest trade; the daily
                        // close can be a full session stale. The close is
                        // only a fallback when no quote is available.
                        let quote = match self.broker.latest_price(ticker).await {
                            Ok(p) if p > 0.0 => Some(p),
                            Ok(_) => None,
                            Err(e) => {
                                warn!(ticker = %ticker, error = %e, "Latest trade fetch failed, falling back to last close");
                                None
                            }
                        };
                        let Some(px) = quote.or_else(|| price.filter(|p| *p > 0.0)) else {
                            self.record_hold(
                                &mut summary,
                                ticker,
                                "hold (price unavailable)",
                                rsi_value,
                                price,
                                account.equity,
                            )?;
                            continue;
                        };
                        let shares = shares_for_allocation(account.equity, px, allocation);
                        if shares == 0 {
                            self.record_hold(
                                &mut summary,
                                ticker,
                                "hold (position too small)",
                                rsi_value,
                                Some(px),
                                account.equity,
                            )?;
                            continue;
                        }
                        match self.broker.buy(ticker, shares).await {
                            Ok(order) => {
                                info!(ticker = %ticker, shares, reason = %signal.reason, "Buy executed");
                                let mut decision = Decision::new(
                                    ticker,
                                    DecisionAction::Buy,
                                    shares,
                                    &signal.reason,
                                    account.equity,
                                )
                                .with_price(px)
                                .with_allocation(allocation)
                                .with_order(&order);
                                if let Some(r) = rsi_value {
                                    decision = decision.with_rsi(r);
                                }
                                self.ledger.append(&decision)?;
                                summary.buys.push(TradeLine {
                                    ticker: ticker.clone(),
                                    qty: shares,
                                    reason: signal.reason.clone(),
                                });
                            }
                            Err(e) => {
                                warn!(ticker = %ticker, error = %e, "Buy failed");
                                summary.errors += 1;
                            }
                        }
                    }
                    SignalAction::Sell { qty } => match self.broker.sell(ticker, qty).await {
                        Ok(order) => {
                            info!(ticker = %ticker, qty, reason = %signal.reason, "Sell executed");
                            let mut decision = Decision::new(
                                ticker,
                                DecisionAction::Sell,
                                qty,
                                &signal.reason,
                                account.equity,
                            )
                            .with_order(&order);
                            if let Some(p) = price {
                                decision = decision.with_price(p);
                            }
                            if let Some(r) = rsi_value {
                                decision = decision.with_rsi(r);
                            }
                            self.ledger.append(&decision)?;
                            summary.sells.push(TradeLine {
                                ticker: ticker.clone(),
                                qty,
                                reason: signal.reason.clone(),
                            });
                        }
                        Err(e) => {
                            warn!(ticker = %ticker, error = %e, "Sell failed");
                            summary.errors += 1;
                        }
                    },
                    SignalAction::Hold => {
                        self.record_hold(
                            &mut summary,
                            ticker,
                            &signal.reason,
                            rsi_value,
                            price,
                            account.equity,
                        )?;
                    }
                }
            }
        }

        watch.sort_by(|a, b| a.rsi.partial_cmp(&b.rsi).unwrap_or(std::cmp::Ordering::Equal));
        watch.truncate(self.config.watch_top_n);
        summary.watchlist = watch;

        info!(
            scanned = summary.tickers_scanned,
            buys = summary.buys.len(),
            sells = summary.sells.len(),
            holds = summary.holds,
            skipped = summary.skipped,
            errors = summary.errors,
            "Cycle complete"
        );
        Ok(summary)
    }

    fn record_hold(
        &self,
        summary: &mut CycleSummary,
        ticker: &str,
        reason: &str,
        rsi_value: Option<f64>,
        price: Option<f64>,
        equity: f64,
    ) -> Result<()> {
        let mut decision = Decision::new(ticker, DecisionAction::Hold, 0, reason, equity);
        if let Some(r) = rsi_value {
            decision = decision.with_rsi(r);
        }
        if let Some(p) = price {
            decision = decision.with_price(p);
        }
        self.ledger.append(&decision)?;
        summary.holds += 1;
        Ok(())
    }
}

/// Reconstruct holdings from the pre-exit snapshot and the exits that
/// actually went through. Used only when the post-exit rescan fails.
fn rebuild_positions(positions: Vec<Position>, executed: &[(String, u64)]) -> Vec<Position> {
    let sold: HashMap<&str, u64> = executed
        .iter()
        .map(|(t, q)| (t.as_str(), *q))
        .collect();

    positions
        .into_iter()
        .filter_map(|mut pos| {
            let sold_qty = sold.get(pos.ticker.as_str()).copied().unwrap_or(0);
            let remaining = pos.qty.saturating_sub(sold_qty);
            if remaining == 0 {
                None
            } else {
                pos.qty = remaining;
                pos.market_value = remaining as f64 * pos.current_price;
                Some(pos)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, OrderResult, PriceBar};
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct MockBroker {
        account: Account,
        positions: Vec<Position>,
        bars: HashMap<String, Vec<PriceBar>>,
        quotes: HashMap<String, f64>,
        fail_bars: AtomicBool,
        fail_quotes: AtomicBool,
        fail_rescan: AtomicBool,
        orders: Mutex<Vec<(String, String, u64)>>,
    }

    impl MockBroker {
        fn new(equity: f64) -> Self {
            Self {
                account: Account {
                    equity,
                    cash: equity,
                    buying_power: equity * 2.0,
                },
                positions: Vec::new(),
                bars: HashMap::new(),
                quotes: HashMap::new(),
                fail_bars: AtomicBool::new(false),
                fail_quotes: AtomicBool::new(false),
                fail_rescan: AtomicBool::new(false),
                orders: Mutex::new(Vec::new()),
            }
        }

        fn orders(&self) -> Vec<(String, String, u64)> {
            self.orders.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Broker for MockBroker {
        async fn account(&self) -> Result<Account> {
            Ok(self.account)
        }

        async fn positions(&self) -> Result<Vec<Position>> {
            if self.fail_rescan.load(Ordering::SeqCst) && !self.orders().is_empty() {
                anyhow::bail!("rescan unavailable");
            }
            Ok(self.positions.clone())
        }

        async fn bars(
            &self,
            tickers: &[String],
            _days: u32,
        ) -> Result<HashMap<String, Vec<PriceBar>>> {
            if self.fail_bars.load(Ordering::SeqCst) {
                anyhow::bail!("market data unavailable");
            }
            Ok(tickers
                .iter()
                .map(|t| (t.clone(), self.bars.get(t).cloned().unwrap_or_default()))
                .collect())
        }

        async fn latest_price(&self, ticker: &str) -> Result<f64> {
            if self.fail_quotes.load(Ordering::SeqCst) {
                anyhow::bail!("quote unavailable");
            }
            Ok(self.quotes.get(ticker).copied().unwrap_or(0.0))
        }

        async fn buy(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
            self.orders
                .lock()
                .unwrap()
                .push(("buy".to_string(), ticker.to_string(), qty));
            Ok(OrderResult {
                status: "accepted".to_string(),
                order_id: "order-1".to_string(),
            })
        }

        async fn sell(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
            self.orders
                .lock()
                .unwrap()
                .push(("sell".to_string(), ticker.to_string(), qty));
            Ok(OrderResult {
                status: "accepted".to_string(),
                order_id: "order-2".to_string(),
            })
        }

        async fn headlines(&self, _ticker: &str, _limit: u32) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 1_000,
            })
            .collect()
    }

    /// Strictly falling closes ending at `last`; RSI approaches zero.
    fn oversold_closes(last: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| last + (n - 1 - i) as f64).collect()
    }

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

    fn engine(broker: Arc<MockBroker>, dir: &tempfile::TempDir, groups: Vec<Vec<String>>) -> CycleEngine {
        CycleEngine::new(
            broker,
            SignalGenerator::RsiOnly {
                config: StrategyConfig::default(),
            },
            Arc::new(DecisionLedger::new(dir.path().join("decisions.jsonl"))),
            StrategyConfig::default(),
            groups,
        )
    }

    #[tokio::test]
    async fn oversold_ticker_is_bought_and_logged() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(100_000.0);
        broker
            .bars
            .insert("NVDA".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["NVDA".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();

        // 20% of 100k at $50 is 400 shares.
        assert_eq!(summary.buys.len(), 1);
        assert_eq!(summary.buys[0].qty, 400);
        assert!(summary.buys[0].reason.contains("deep oversold"));
        assert_eq!(summary.errors, 0);
        assert_eq!(
            broker.orders(),
            vec![("buy".to_string(), "NVDA".to_string(), 400)]
        );

        let records = engine.ledger.recent(10, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, DecisionAction::Buy);
        assert_eq!(records[0].shares, 400);
        assert_eq!(records[0].order_id.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn buys_are_priced_from_the_latest_trade() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(100_000.0);
        // The daily close says $50 but the stock has since traded down to $40.
        broker
            .bars
            .insert("NVDA".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        broker.quotes.insert("NVDA".to_string(), 40.0);
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["NVDA".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();

        // 20% of 100k at the $40 trade price, not the stale $50 close.
        assert_eq!(summary.buys.len(), 1);
        assert_eq!(summary.buys[0].qty, 500);

        let records = engine.ledger.recent(10, None).unwrap();
        assert_eq!(records[0].price, Some(40.0));
    }

    #[tokio::test]
    async fn quote_failure_falls_back_to_last_close() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(100_000.0);
        broker
            .bars
            .insert("NVDA".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        broker.fail_quotes.store(true, Ordering::SeqCst);
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["NVDA".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();

        assert_eq!(summary.buys.len(), 1);
        assert_eq!(summary.buys[0].qty, 400);
        assert_eq!(
            broker.orders(),
            vec![("buy".to_string(), "NVDA".to_string(), 400)]
        );
    }

    #[tokio::test]
    async fn stop_loss_liquidates_and_skips_signal_pass() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(50_000.0);
        broker.positions.push(position("TSLA", 120, -0.05));
        broker
            .bars
            .insert("TSLA".to_string(), bars_from_closes(&oversold_closes(95.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["TSLA".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();

        assert_eq!(summary.sells.len(), 1);
        assert_eq!(summary.sells[0].qty, 120);
        assert_eq!(summary.sells[0].reason, "stop-loss");
        // Oversold bars notwithstanding, an exited ticker is not re-bought.
        assert!(summary.buys.is_empty());
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            broker.orders(),
            vec![("sell".to_string(), "TSLA".to_string(), 120)]
        );

        let records = engine.ledger.recent(10, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, "stop-loss");
        assert_eq!(records[0].plpc, Some(-0.05));
    }

    #[tokio::test]
    async fn zero_equity_skips_the_cycle() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(0.0);
        broker
            .bars
            .insert("NVDA".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["NVDA".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();
        assert_eq!(summary.tickers_scanned, 0);
        assert!(broker.orders().is_empty());
        assert!(engine.ledger.recent(10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn bars_failure_is_tallied_not_fatal() {
        let dir = tempdir().unwrap();
        let broker = MockBroker::new(10_000.0);
        broker.fail_bars.store(true, Ordering::SeqCst);
        let broker = Arc::new(broker);
        let engine = engine(
            broker.clone(),
            &dir,
            vec![vec!["AAPL".to_string(), "MSFT".to_string()]],
        );

        let summary = engine.run_cycle().await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.tickers_scanned, 0);
        assert!(broker.orders().is_empty());
    }

    #[tokio::test]
    async fn insufficient_history_is_skipped_without_a_record() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(10_000.0);
        broker
            .bars
            .insert("AAPL".to_string(), bars_from_closes(&oversold_closes(50.0, 5)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["AAPL".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.holds, 0);
        assert!(engine.ledger.recent(10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn tiny_allocation_records_a_hold() {
        let dir = tempdir().unwrap();
        // 10% of $100 at $50 floors to zero shares.
        let mut broker = MockBroker::new(100.0);
        broker
            .bars
            .insert("AMZN".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["AMZN".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();
        assert!(summary.buys.is_empty());
        assert_eq!(summary.holds, 1);
        assert!(broker.orders().is_empty());

        let records = engine.ledger.recent(10, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, DecisionAction::Hold);
        assert!(records[0].reason.contains("too small"));
    }

    #[tokio::test]
    async fn rescan_failure_suppresses_buys() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(100_000.0);
        broker.positions.push(position("TSLA", 120, -0.05));
        broker.fail_rescan.store(true, Ordering::SeqCst);
        broker
            .bars
            .insert("NVDA".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        broker
            .bars
            .insert("TSLA".to_string(), bars_from_closes(&oversold_closes(95.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(
            broker.clone(),
            &dir,
            vec![vec!["TSLA".to_string(), "NVDA".to_string()]],
        );

        let summary = engine.run_cycle().await.unwrap();

        // The exit went through, the rescan failed, so the oversold buy is
        // suppressed and recorded as a hold.
        assert_eq!(summary.sells.len(), 1);
        assert!(summary.buys.is_empty());
        assert_eq!(summary.errors, 1);
        let buy_orders: Vec<_> = broker
            .orders()
            .into_iter()
            .filter(|(side, _, _)| side == "buy")
            .collect();
        assert!(buy_orders.is_empty());

        let records = engine.ledger.recent(10, None).unwrap();
        let hold = records
            .iter()
            .find(|d| d.ticker == "NVDA")
            .expect("NVDA decision");
        assert_eq!(hold.action, DecisionAction::Hold);
        assert!(hold.reason.contains("suppressed"));
    }

    #[tokio::test]
    async fn watchlist_collects_near_oversold_tickers() {
        let dir = tempdir().unwrap();
        let mut broker = MockBroker::new(100.0);
        // Falling series with small steps: RSI low but distinct per ticker.
        broker
            .bars
            .insert("AAPL".to_string(), bars_from_closes(&oversold_closes(50.0, 20)));
        let broker = Arc::new(broker);
        let engine = engine(broker.clone(), &dir, vec![vec!["AAPL".to_string()]]);

        let summary = engine.run_cycle().await.unwrap();
        assert_eq!(summary.watchlist.len(), 1);
        assert_eq!(summary.watchlist[0].ticker, "AAPL");
        assert!(summary.watchlist[0].rsi < 45.0);
    }

    #[test]
    fn rebuild_drops_fully_sold_and_shrinks_half_sold() {
        let positions = vec![position("TSLA", 120, -0.05), position("NVDA", 10, 0.035)];
        let executed = vec![("TSLA".to_string(), 120), ("NVDA".to_string(), 5)];

        let rebuilt = rebuild_positions(positions, &executed);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].ticker, "NVDA");
        assert_eq!(rebuilt[0].qty, 5);
    }

    #[test]
    fn summary_display_lists_trades() {
        let summary = CycleSummary {
            equity: 100_000.0,
            tickers_scanned: 2,
            buys: vec![TradeLine {
                ticker: "NVDA".to_string(),
                qty: 400,
                reason: "RSI buy (12.3) - deep oversold".to_string(),
            }],
            sells: vec![TradeLine {
                ticker: "TSLA".to_string(),
                qty: 120,
                reason: "stop-loss".to_string(),
            }],
            holds: 0,
            skipped: 0,
            errors: 0,
            watchlist: vec![],
        };
        let text = summary.to_string();
        assert!(text.contains("buys 1"));
        assert!(text.contains("sell TSLA x120 (stop-loss)"));
        assert!(text.contains("buy  NVDA x400"));
    }
}
