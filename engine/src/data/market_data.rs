// Candle access through an ordered list of providers with fallback, a
// per-call timeout, a global fetch limiter and a short-lived kline cache.
use super::bitunix::BitunixProvider;
use super::bybit::BybitProvider;
use super::http::build_client;
use super::provider::CandleProvider;
use crate::config::EngineSettings;
use crate::error::{EngineError, Result};
use shared::models::{Series, Ticker, TimeFrame};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;

type KlineKey = (String, TimeFrame, usize);

struct CachedSeries {
    fetched_at: Instant,
    series: Arc<Series>,
}

pub struct MarketDataAdapter {
    // Primary first; later entries are fallbacks.
    providers: Vec<Arc<dyn CandleProvider>>,
    request_timeout: Duration,
    fetch_permits: Semaphore,
    kline_cache_ttl: Duration,
    kline_cache: RwLock<HashMap<KlineKey, CachedSeries>>,
}

impl MarketDataAdapter {
    pub fn new(
        providers: Vec<Arc<dyn CandleProvider>>,
        request_timeout: Duration,
        max_concurrent_fetches: usize,
        kline_cache_ttl: Duration,
    ) -> Self {
        MarketDataAdapter {
            providers,
            request_timeout,
            fetch_permits: Semaphore::new(max_concurrent_fetches.max(1)),
            kline_cache_ttl,
            kline_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Bybit as primary, Bitunix as fallback, sharing one HTTP client.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let cfg = &settings.providers;
        let client = build_client(cfg.request_timeout())?;
        let providers: Vec<Arc<dyn CandleProvider>> = vec![
            Arc::new(BybitProvider::new(&cfg.bybit_base_url, client.clone())),
            Arc::new(BitunixProvider::new(&cfg.bitunix_base_url, client)),
        ];
        Ok(Self::new(
            providers,
            cfg.request_timeout(),
            cfg.max_concurrent_fetches,
            settings.kline_cache_ttl(),
        ))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns a normalized series (oldest first, unique timestamps) from the
    /// first provider that succeeds. The last provider error is returned when
    /// every provider fails.
    pub async fn fetch_series(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Arc<Series>> {
        let key: KlineKey = (symbol.to_string(), timeframe, limit);
        if let Some(series) = self.cached_series(&key).await {
            tracing::trace!(symbol, %timeframe, "Kline cache hit");
            return Ok(series);
        }

        let mut last_error = None;
        for provider in &self.providers {
            let result = self
                .call(provider.name(), provider.fetch_klines(symbol, timeframe, limit))
                .await
                .and_then(|candles| {
                    let series = Series::from_candles(candles);
                    if series.is_empty() {
                        Err(EngineError::MalformedData(format!("empty kline list for {} {}", symbol, timeframe)))
                    } else {
                        Ok(series)
                    }
                });

            match result {
                Ok(series) => {
                    let series = Arc::new(series);
                    self.store_series(key, series.clone()).await;
                    return Ok(series);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        symbol,
                        %timeframe,
                        error = %e,
                        "Kline fetch failed, falling back to next provider"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| EngineError::NoData("no candle providers configured".to_string())))
    }

    pub async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let mut last_error = None;
        for provider in &self.providers {
            match self.call(provider.name(), provider.fetch_tickers()).await {
                Ok(tickers) if !tickers.is_empty() => return Ok(tickers),
                Ok(_) => {
                    tracing::warn!(provider = provider.name(), "Provider returned no tickers");
                    last_error = Some(EngineError::MalformedData(format!("{} returned no tickers", provider.name())));
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Ticker fetch failed, falling back to next provider");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| EngineError::NoData("no candle providers configured".to_string())))
    }

    // One upstream call: waits for a fetch permit, then runs under the per-call timeout.
    async fn call<T>(&self, provider: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let _permit = self
            .fetch_permits
            .acquire()
            .await
            .map_err(|_| EngineError::transient(provider, "fetch limiter closed"))?;
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                provider: provider.to_string(),
                secs: self.request_timeout.as_secs(),
            }),
        }
    }

    async fn cached_series(&self, key: &KlineKey) -> Option<Arc<Series>> {
        if self.kline_cache_ttl.is_zero() {
            return None;
        }
        let cache = self.kline_cache.read().await;
        cache
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.kline_cache_ttl)
            .map(|entry| entry.series.clone())
    }

    async fn store_series(&self, key: KlineKey, series: Arc<Series>) {
        if self.kline_cache_ttl.is_zero() {
            return;
        }
        let mut cache = self.kline_cache.write().await;
        let ttl = self.kline_cache_ttl;
        cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        cache.insert(
            key,
            CachedSeries {
                fetched_at: Instant::now(),
                series,
            },
        );
    }
}
