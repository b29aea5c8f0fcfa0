//! Bounded-retry wrapper around any broker.
//!
//! Broker calls are the only retried operations in the engine: a fixed number
//! of attempts with a fixed inter-attempt delay, synchronous (no concurrent
//! retry fan-out). Everything else either falls back or fails the ticker.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::models::{Account, OrderResult, PriceBar, Position};

use super::Broker;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct RetryBroker<B> {
    inner: B,
    max_attempts: u32,
    delay: Duration,
}

impl<B: Broker> RetryBroker<B> {
    pub fn new(inner: B) -> Self {
        Self::with_policy(inner, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }

    pub fn with_policy(inner: B, max_attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    async fn retry<T, F, Fut>(&self, op: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        op,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Broker call failed"
                    );
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
        Err(last_err.expect("at least one attempt"))
    }
}

#[async_trait]
impl<B: Broker> Broker for RetryBroker<B> {
    async fn account(&self) -> Result<Account> {
        self.retry("account", || self.inner.account()).await
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        self.retry("positions", || self.inner.positions()).await
    }

    async fn bars(&self, tickers: &[String], days: u32) -> Result<HashMap<String, Vec<PriceBar>>> {
        self.retry("bars", || self.inner.bars(tickers, days)).await
    }

    async fn latest_price(&self, ticker: &str) -> Result<f64> {
        self.retry("latest_price", || self.inner.latest_price(ticker))
            .await
    }

    async fn buy(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
        self.retry("buy", || self.inner.buy(ticker, qty)).await
    }

    async fn sell(&self, ticker: &str, qty: u64) -> Result<OrderResult> {
        self.retry("sell", || self.inner.sell(ticker, qty)).await
    }

    async fn headlines(&self, ticker: &str, limit: u32) -> Result<Vec<String>> {
        self.retry("headlines", || self.inner.headlines(ticker, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` account calls, then succeeds.
    struct FlakyBroker {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyBroker {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Broker for FlakyBroker {
        async fn account(&self) -> Result<Account> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("transient failure {call}");
            }
            Ok(Account {
                equity: 1000.0,
                cash: 1000.0,
                buying_power: 2000.0,
            })
        }

        async fn positions(&self) -> Result<Vec<Position>> {
            Ok(Vec::new())
        }

        async fn bars(
            &self,
            _tickers: &[String],
            _days: u32,
        ) -> Result<HashMap<String, Vec<PriceBar>>> {
            Ok(HashMap::new())
        }

        async fn latest_price(&self, _ticker: &str) -> Result<f64> {
            Ok(0.0)
        }

        async fn buy(&self, _ticker: &str, _qty: u64) -> Result<OrderResult> {
            anyhow::bail!("not under test")
        }

        async fn sell(&self, _ticker: &str, _qty: u64) -> Result<OrderResult> {
            anyhow::bail!("not under test")
        }

        async fn headlines(&self, _ticker: &str, _limit: u32) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn recovers_before_attempts_exhausted() {
        let broker = RetryBroker::with_policy(FlakyBroker::new(2), 3, Duration::from_millis(1));
        let account = broker.account().await.unwrap();
        assert!((account.equity - 1000.0).abs() < 1e-9);
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let broker = RetryBroker::with_policy(FlakyBroker::new(5), 3, Duration::from_millis(1));
        let err = broker.account().await.unwrap_err();
        assert!(err.to_string().contains("transient failure 2"));
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 3);
    }
}
