//! Environment-driven application configuration.
//!
//! Everything is read once at startup. Broker credentials are mandatory;
//! advisor credentials are optional and only checked when the advisor
//! strategy is selected.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::advisor::ProviderConfig;
use crate::error::ConfigError;
use crate::trading::StrategyConfig;

const DEFAULT_LEDGER_PATH: &str = "logs/decisions.jsonl";
const DEFAULT_WATCHLIST_PATH: &str = "config/watchlist.json";
const DEFAULT_RETENTION_DAYS: u32 = 90;

const HF_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_HF_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Which signal generator drives the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Pure RSI threshold strategy; needs no advisor credentials.
    Rsi,
    /// LLM advisor gated by a confidence threshold.
    Advisor,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Rsi => "rsi",
            StrategyKind::Advisor => "advisor",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub alpaca_api_key: String,
    pub alpaca_secret_key: String,

    pub hf_token: Option<String>,
    pub hf_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,

    pub strategy_kind: StrategyKind,
    pub strategy: StrategyConfig,

    pub ledger_path: PathBuf,
    /// None disables rotation entirely.
    pub retention_days: Option<u32>,

    /// Tickers are scanned group by group; one group's data-fetch failure
    /// never takes down the others.
    pub watch_groups: Vec<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from the process environment. `.env` loading is the
    /// caller's job; this only reads what is already set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let alpaca_api_key = require("ALPACA_API_KEY")?;
        let alpaca_secret_key = require("ALPACA_SECRET_KEY")?;

        // Hard guard: this engine never trades live money.
        let paper = env::var("ALPACA_PAPER_TRADE")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);
        if !paper {
            return Err(ConfigError::LiveTradingRefused);
        }

        let hf_token = optional("HF_TOKEN");
        let hf_model =
            env::var("HF_MODEL").unwrap_or_else(|_| DEFAULT_HF_MODEL.to_string());
        let groq_api_key = optional("GROQ_API_KEY");
        let groq_model =
            env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string());

        let strategy_kind = match env::var("STRATEGY").as_deref() {
            Ok("advisor") => StrategyKind::Advisor,
            Ok("rsi") | Err(_) => StrategyKind::Rsi,
            Ok(other) => {
                warn!(strategy = %other, "Unknown STRATEGY value, using rsi");
                StrategyKind::Rsi
            }
        };

        let ledger_path = env::var("DECISIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEDGER_PATH));

        let retention_days = env::var("DECISIONS_RETENTION_DAYS")
            .ok()
            .map(|v| parse_retention(&v))
            .unwrap_or(Some(DEFAULT_RETENTION_DAYS));

        let watchlist_path = env::var("WATCHLIST_PATH")
            .unwrap_or_else(|_| DEFAULT_WATCHLIST_PATH.to_string());
        let watch_groups = load_watch_groups(&watchlist_path);

        let config = Self {
            alpaca_api_key,
            alpaca_secret_key,
            hf_token,
            hf_model,
            groq_api_key,
            groq_model,
            strategy_kind,
            strategy: StrategyConfig::default(),
            ledger_path,
            retention_days,
            watch_groups,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy_kind == StrategyKind::Advisor
            && self.hf_token.is_none()
            && self.groq_api_key.is_none()
        {
            return Err(ConfigError::Missing(
                "HF_TOKEN or GROQ_API_KEY (advisor strategy needs at least one provider)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Advisor providers in fallback order: Hugging Face first, Groq second.
    pub fn advisor_providers(&self) -> Vec<ProviderConfig> {
        let mut providers = Vec::new();
        if let Some(token) = &self.hf_token {
            providers.push(ProviderConfig {
                name: "huggingface".to_string(),
                base_url: HF_BASE_URL.to_string(),
                model: self.hf_model.clone(),
                api_key: token.clone(),
            });
        }
        if let Some(key) = &self.groq_api_key {
            providers.push(ProviderConfig {
                name: "groq".to_string(),
                base_url: GROQ_BASE_URL.to_string(),
                model: self.groq_model.clone(),
                api_key: key.clone(),
            });
        }
        providers
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// "0" disables rotation; anything unparseable falls back to the default.
fn parse_retention(value: &str) -> Option<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) => None,
        Ok(days) => Some(days),
        Err(_) => {
            warn!(value, "Invalid DECISIONS_RETENTION_DAYS, using default");
            Some(DEFAULT_RETENTION_DAYS)
        }
    }
}

#[derive(Deserialize)]
struct WatchlistFile {
    groups: Vec<Vec<String>>,
}

fn load_watch_groups(path: &str) -> Vec<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_watch_groups(&contents) {
            Ok(groups) => {
                info!(path, groups = groups.len(), "Loaded watch-list");
                groups
            }
            Err(e) => {
                warn!(path, error = %e, "Invalid watch-list file, using built-in groups");
                default_watch_groups()
            }
        },
        Err(_) => default_watch_groups(),
    }
}

fn parse_watch_groups(contents: &str) -> Result<Vec<Vec<String>>, serde_json::Error> {
    let file: WatchlistFile = serde_json::from_str(contents)?;
    Ok(file
        .groups
        .into_iter()
        .map(|g| {
            g.into_iter()
                .map(|t| t.trim().to_ascii_uppercase())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .filter(|g: &Vec<String>| !g.is_empty())
        .collect())
}

fn default_watch_groups() -> Vec<Vec<String>> {
    let groups: &[&[&str]] = &[
        &[
            "AAPL", "MSFT", "NVDA", "TSLA", "AMZN", "META", "GOOG", "AMD", "INTC", "BA",
        ],
        &[
            "DIS", "NFLX", "JPM", "V", "MA", "UNH", "XOM", "CVX", "PFE", "KO",
        ],
        &[
            "WMT", "COST", "HD", "CRM", "ORCL", "AVGO", "MU", "QCOM", "SOFI", "PLTR",
        ],
        &["HOOD", "IBIT", "TQQQ"],
    ];
    groups
        .iter()
        .map(|g| g.iter().map(|t| t.to_string()).collect())
        .collect()
}
