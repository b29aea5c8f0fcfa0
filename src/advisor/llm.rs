//! LLM-backed advisor with primary/fallback inference providers.
//!
//! Each provider gets a single try per ticker; failure falls through to the
//! next provider instead of retrying. Both failing synthesizes a neutral hold.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Advisor, AdvisorReport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.1;

const SYSTEM_PROMPT: &str = "You are a senior quantitative analyst at a hedge fund. \
Given a ticker's RSI value and recent news headlines, provide a structured analysis. \
Respond with ONLY valid JSON in this exact format (no markdown, no extra text): \
{\"ticker\": \"SYMBOL\", \"sentiment\": \"bullish\" | \"bearish\" | \"neutral\", \
\"confidence\": 1-10, \"reasoning\": \"brief explanation\", \
\"action\": \"buy\" | \"sell\" | \"hold\", \"suggested_allocation\": 0.0-1.0}. \
Rules: only recommend action at 8+ confidence; suggested_allocation is a fraction \
of the maximum position size; RSI below 30 is oversold, above 70 overbought; weigh \
news sentiment heavily; when in doubt, hold; with no headlines, decide on RSI alone.";

/// One OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Short name used in logs and fallback diagnostics.
    pub name: String,

    /// Base URL up to the API version, e.g. "https://api.groq.com/openai/v1".
    pub base_url: String,

    pub model: String,

    pub api_key: String,
}

/// Advisor backed by a chain of chat-completion providers.
pub struct LlmAdvisor {
    http: Client,
    providers: Vec<ProviderConfig>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Raw model output before clamping.
#[derive(Deserialize)]
struct RawReport {
    #[serde(default)]
    ticker: String,
    #[serde(default = "default_sentiment")]
    sentiment: String,
    #[serde(default)]
    confidence: i64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    action: super::AdvisedAction,
    #[serde(default)]
    suggested_allocation: f64,
}

fn default_sentiment() -> String {
    "neutral".to_string()
}

impl LlmAdvisor {
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, providers })
    }

    fn user_prompt(
        ticker: &str,
        rsi: Option<f64>,
        headlines: &[String],
        price: Option<f64>,
    ) -> String {
        let rsi_text = match rsi {
            Some(v) => format!("RSI (14-period): {v:.2}"),
            None => "RSI: unavailable".to_string(),
        };
        let price_text = match price {
            Some(p) if p > 0.0 => format!("Current Price: ${p:.2}"),
            _ => "Current Price: unavailable".to_string(),
        };
        let headlines_text = if headlines.is_empty() {
            "No recent headlines available.".to_string()
        } else {
            headlines
                .iter()
                .map(|h| format!("- {h}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Analyze {ticker}:\n\n{price_text}\n{rsi_text}\n\nRecent Headlines:\n{headlines_text}\n\nProvide your analysis as JSON."
        )
    }

    async fn call_provider(&self, provider: &ProviderConfig, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &provider.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(provider = %provider.name, url = %url, "Calling advisor provider");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&provider.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Provider request failed: {} - {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Provider returned no choices")
    }

    /// Parse model output into a report, tolerating markdown code fences and
    /// clamping confidence and allocation to their documented ranges.
    fn parse_report(content: &str, ticker: &str) -> Result<AdvisorReport> {
        let mut body = content.trim();
        if let Some(rest) = body.split_once("```json").map(|(_, r)| r) {
            body = rest.split("```").next().unwrap_or(rest).trim();
        } else if let Some(rest) = body.split_once("```").map(|(_, r)| r) {
            body = rest.split("```").next().unwrap_or(rest).trim();
        }

        let raw: RawReport = serde_json::from_str(body).context("Advisor output is not valid JSON")?;

        Ok(AdvisorReport {
            ticker: if raw.ticker.is_empty() {
                ticker.to_string()
            } else {
                raw.ticker
            },
            sentiment: raw.sentiment,
            confidence: raw.confidence.clamp(0, 10) as u8,
            reasoning: raw.reasoning,
            action: raw.action,
            suggested_allocation: raw.suggested_allocation.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn analyze(
        &self,
        ticker: &str,
        rsi: Option<f64>,
        headlines: &[String],
        price: Option<f64>,
    ) -> AdvisorReport {
        let prompt = Self::user_prompt(ticker, rsi, headlines, price);

        for provider in &self.providers {
            match self.call_provider(provider, &prompt).await {
                Ok(content) => match Self::parse_report(&content, ticker) {
                    Ok(report) => return report,
                    Err(e) => {
                        warn!(provider = %provider.name, ticker = %ticker, error = %e, "Unparseable advisor output");
                    }
                },
                Err(e) => {
                    warn!(provider = %provider.name, ticker = %ticker, error = %e, "Advisor provider failed");
                }
            }
        }

        let reason = if self.providers.is_empty() {
            "no advisor providers configured".to_string()
        } else {
            format!(
                "all advisor providers failed ({})",
                self.providers
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        AdvisorReport::neutral(ticker, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::AdvisedAction;

    #[test]
    fn parses_plain_json() {
        let content = r#"{"ticker":"NVDA","sentiment":"bullish","confidence":9,"reasoning":"oversold","action":"buy","suggested_allocation":0.8}"#;
        let report = LlmAdvisor::parse_report(content, "NVDA").unwrap();
        assert_eq!(report.confidence, 9);
        assert_eq!(report.action, AdvisedAction::Buy);
        assert!((report.suggested_allocation - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_fenced_json() {
        let content = "Here you go:\n```json\n{\"sentiment\":\"bearish\",\"confidence\":8,\"action\":\"sell\",\"suggested_allocation\":0.5}\n```";
        let report = LlmAdvisor::parse_report(content, "TSLA").unwrap();
        assert_eq!(report.ticker, "TSLA"); // filled from the argument
        assert_eq!(report.action, AdvisedAction::Sell);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let content = r#"{"confidence":99,"action":"buy","suggested_allocation":3.5}"#;
        let report = LlmAdvisor::parse_report(content, "AMD").unwrap();
        assert_eq!(report.confidence, 10);
        assert!((report.suggested_allocation - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_json() {
        assert!(LlmAdvisor::parse_report("I think you should buy.", "AMD").is_err());
    }

    #[tokio::test]
    async fn no_providers_degrades_to_neutral_hold() {
        let advisor = LlmAdvisor::new(vec![]).unwrap();
        let report = advisor.analyze("KO", Some(50.0), &[], Some(60.0)).await;
        assert_eq!(report.action, AdvisedAction::Hold);
        assert_eq!(report.confidence, 0);
        assert!(report.reasoning.contains("no advisor providers"));
    }
}
