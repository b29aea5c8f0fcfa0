//! Advisor capability: structured sentiment/confidence recommendations.
//!
//! Consumed only by the advisor-gated strategy. An advisor never fails the
//! cycle; when no provider is reachable it degrades to a neutral hold with a
//! diagnostic reason.

mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use llm::{LlmAdvisor, ProviderConfig};

/// Action the advisor recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdvisedAction {
    Buy,
    Sell,
    #[default]
    Hold,
}

/// Structured recommendation for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorReport {
    pub ticker: String,

    /// "bullish" | "bearish" | "neutral".
    pub sentiment: String,

    /// 1-10; zero marks a synthesized fallback report.
    pub confidence: u8,

    pub reasoning: String,

    pub action: AdvisedAction,

    /// Fraction of the maximum position size, 0.0-1.0.
    pub suggested_allocation: f64,
}

impl AdvisorReport {
    /// Neutral hold used when inference is unavailable.
    pub fn neutral(ticker: &str, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            sentiment: "neutral".to_string(),
            confidence: 0,
            reasoning: reason.into(),
            action: AdvisedAction::Hold,
            suggested_allocation: 0.0,
        }
    }
}

/// Remote recommendation capability.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Analyze one ticker. Infallible by contract: implementations degrade to
    /// [`AdvisorReport::neutral`] rather than erroring.
    async fn analyze(
        &self,
        ticker: &str,
        rsi: Option<f64>,
        headlines: &[String],
        price: Option<f64>,
    ) -> AdvisorReport;
}
