// In-memory candle provider and fixtures for tests.
use crate::data::CandleProvider;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{Candle, Ticker, TimeFrame};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MockProvider {
    name: String,
    series: HashMap<(String, TimeFrame), Vec<Candle>>,
    tickers: Option<Vec<Ticker>>,
    failing: bool,
    delay: Option<Duration>,
    kline_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        MockProvider {
            name: name.to_string(),
            series: HashMap::new(),
            tickers: None,
            failing: false,
            delay: None,
            kline_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_series(mut self, symbol: &str, timeframe: TimeFrame, candles: Vec<Candle>) -> Self {
        self.series.insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn with_tickers(mut self, tickers: Vec<Ticker>) -> Self {
        self.tickers = Some(tickers);
        self
    }

    /// Every call fails with a transient upstream error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn kline_calls(&self) -> usize {
        self.kline_calls.load(Ordering::SeqCst)
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CandleProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval_code(&self, timeframe: TimeFrame) -> &'static str {
        timeframe.label()
    }

    async fn fetch_klines(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>> {
        self.kline_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing {
            return Err(EngineError::transient(&self.name, "HTTP 503"));
        }
        match self.series.get(&(symbol.to_string(), timeframe)) {
            Some(candles) => {
                let skip = candles.len().saturating_sub(limit);
                Ok(candles[skip..].to_vec())
            }
            None => Err(EngineError::MalformedData(format!("no klines for {} {}", symbol, timeframe))),
        }
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.failing {
            return Err(EngineError::transient(&self.name, "HTTP 503"));
        }
        self.tickers
            .clone()
            .ok_or_else(|| EngineError::transient(&self.name, "tickers unavailable"))
    }
}

/// One-minute candles with the given closes and a constant volume.
pub fn candles_from_closes(closes: &[f64], volume: f64) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: minute(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        })
        .collect()
}

pub fn minute(i: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + i * 60, 0).unwrap()
}

pub fn ticker(symbol: &str, volume_24h: f64) -> Ticker {
    Ticker {
        symbol: symbol.to_string(),
        last_price: 1.0,
        volume_24h,
        price_change_24h_percent: 0.0,
        tradable: true,
    }
}

pub fn halted_ticker(symbol: &str, volume_24h: f64) -> Ticker {
    Ticker {
        tradable: false,
        ..ticker(symbol, volume_24h)
    }
}
