// Engine settings, loaded from a JSON file with defaults for every missing field
use crate::error::{EngineError, Result};
use serde::Deserialize;
use shared::models::{AnalyzeRequest, TimeFrame};
use std::path::Path;
use std::time::Duration;

/// Indicator periods and score weights.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ma_period: usize,
    pub volume_ma_period: usize,
    pub bollinger_period: usize,
    pub bollinger_mult: f64,
    pub volume_profile_bins: usize,
    pub rsi_weight: f64,
    pub macd_weight: f64,
    pub price_weight: f64,
    pub volume_weight: f64,
    pub ma_weight: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ma_period: 20,
            volume_ma_period: 20,
            bollinger_period: 20,
            bollinger_mult: 2.0,
            volume_profile_bins: 20,
            rsi_weight: 0.25,
            macd_weight: 0.25,
            price_weight: 0.25,
            volume_weight: 0.15,
            ma_weight: 0.10,
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("ma_period", self.ma_period),
            ("volume_ma_period", self.volume_ma_period),
            ("bollinger_period", self.bollinger_period),
            ("volume_profile_bins", self.volume_profile_bins),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(EngineError::ConfigError(format!("{} must be greater than 0", name)));
        }

        let weights = [
            ("bollinger_mult", self.bollinger_mult),
            ("rsi_weight", self.rsi_weight),
            ("macd_weight", self.macd_weight),
            ("price_weight", self.price_weight),
            ("volume_weight", self.volume_weight),
            ("ma_weight", self.ma_weight),
        ];
        if let Some((name, value)) = weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(EngineError::ConfigError(format!("{} must be finite, got {}", name, value)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderSettings {
    pub bybit_base_url: String,
    pub bitunix_base_url: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        ProviderSettings {
            bybit_base_url: "https://api.bybit.com".to_string(),
            bitunix_base_url: "https://api.bitunix.com/fapi/v1".to_string(),
            request_timeout_secs: 15,
            max_concurrent_fetches: 16,
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub providers: ProviderSettings,
    pub params: AnalysisParams,
    pub kline_limit: usize,
    pub kline_cache_ttl_secs: u64,
    pub ticker_refresh_secs: u64,
    pub ticker_max_age_secs: u64,
    pub quote_asset: String,
    pub max_candidates: usize,
    pub symbol_concurrency: usize,
    pub request_deadline_secs: u64,
    pub response_cache_ttl_secs: u64,
    pub scan_interval_secs: u64,
    pub store_path: Option<String>,
    pub default_request: AnalyzeRequest,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            providers: ProviderSettings::default(),
            params: AnalysisParams::default(),
            kline_limit: 500,
            kline_cache_ttl_secs: 30,
            ticker_refresh_secs: 60,
            ticker_max_age_secs: 180,
            quote_asset: "USDT".to_string(),
            max_candidates: 100,
            symbol_concurrency: 8,
            request_deadline_secs: 120,
            response_cache_ttl_secs: 120,
            scan_interval_secs: 300,
            store_path: Some("futures_analysis.csv".to_string()),
            default_request: AnalyzeRequest {
                timeframes: vec![TimeFrame::Minute15, TimeFrame::Minute1, TimeFrame::Day1],
                min_volume: 1_000_000.0,
                limit: 50,
                min_score: None,
            },
        }
    }
}

impl EngineSettings {
    /// Reads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let settings: EngineSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::info!(path = %path.display(), "Loaded engine settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if self.kline_limit == 0 {
            return Err(EngineError::ConfigError("kline_limit must be greater than 0".to_string()));
        }
        if self.symbol_concurrency == 0 || self.providers.max_concurrent_fetches == 0 {
            return Err(EngineError::ConfigError("concurrency limits must be greater than 0".to_string()));
        }
        if self.providers.request_timeout_secs == 0
            || self.request_deadline_secs == 0
            || self.ticker_refresh_secs == 0
        {
            return Err(EngineError::ConfigError("timeouts must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn ticker_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.ticker_refresh_secs)
    }

    pub fn ticker_max_age(&self) -> Duration {
        Duration::from_secs(self.ticker_max_age_secs)
    }

    pub fn kline_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.kline_cache_ttl_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl_secs)
    }
}
