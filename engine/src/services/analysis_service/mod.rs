// engine/src/services/analysis_service/mod.rs
// AnalysisService owns the market data adapter, the ticker cache and the
// optional record sink, and dispatches each operation to its handler module.
use crate::config::EngineSettings;
use crate::data::{AnalysisSink, MarketDataAdapter, TickerCache};
use crate::error::Result;
use crate::scoring::Scorer;
use shared::models::{AnalysisRecord, AnalyzeRequest, AnalyzeResponse, AnalyzeSymbolRequest, SymbolTimeframeAnalysis};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod analyze_market;
pub mod analyze_symbol;
pub mod helpers;
pub mod scan_loop;

struct CachedResponse {
    cached_at: Instant,
    response: AnalyzeResponse,
}

pub struct AnalysisService {
    adapter: Arc<MarketDataAdapter>,
    tickers: Arc<TickerCache>,
    sink: Option<Arc<dyn AnalysisSink>>,
    settings: Arc<EngineSettings>,
    scorer: Scorer,
    responses: Mutex<HashMap<String, CachedResponse>>,
}

impl AnalysisService {
    pub fn new(adapter: Arc<MarketDataAdapter>, tickers: Arc<TickerCache>, settings: Arc<EngineSettings>) -> Self {
        AnalysisService {
            adapter,
            tickers,
            sink: None,
            scorer: Scorer::new(&settings.params),
            settings,
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AnalysisSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Ranks quote-asset symbols by their average score across the requested
    /// timeframes. Symbols with no successful timeframe are left out; `total`
    /// counts ranked symbols before truncation to `limit`.
    pub async fn analyze_market(&self, req: AnalyzeRequest) -> Result<AnalyzeResponse> {
        helpers::validate_request(&req)?;
        let key = helpers::request_key(&req);
        if let Some(response) = self.cached_response(&key).await {
            tracing::debug!(total = response.total, "Serving cached market analysis");
            return Ok(response);
        }

        let response = analyze_market::handle_analyze_market(self, &req).await?;
        self.store_response(key, &response).await;
        Ok(response)
    }

    pub async fn analyze_symbol(&self, req: AnalyzeSymbolRequest) -> Result<SymbolTimeframeAnalysis> {
        tracing::info!(symbol = %req.symbol, timeframe = %req.timeframe, "Received analyze symbol request");
        analyze_symbol::handle_analyze_symbol(self, &req).await
    }

    /// Runs a scan with the configured default request every `every` until
    /// `shutdown` resolves, including while a scan is in flight.
    pub async fn run_scans<F: Future>(&self, every: Duration, shutdown: F) -> usize {
        scan_loop::handle_run_scans(self, every, shutdown).await
    }

    // Sink failures are logged, never returned.
    fn record(&self, records: &[AnalysisRecord]) {
        if let Some(sink) = &self.sink {
            if records.is_empty() {
                return;
            }
            if let Err(e) = sink.append(records) {
                tracing::error!(error = %e, count = records.len(), "Failed to persist analysis records");
            }
        }
    }

    async fn cached_response(&self, key: &str) -> Option<AnalyzeResponse> {
        let ttl = self.settings.response_cache_ttl();
        if ttl.is_zero() {
            return None;
        }
        let cache = self.responses.lock().await;
        cache
            .get(key)
            .filter(|entry| entry.cached_at.elapsed() < ttl)
            .map(|entry| entry.response.clone())
    }

    async fn store_response(&self, key: String, response: &AnalyzeResponse) {
        let ttl = self.settings.response_cache_ttl();
        if ttl.is_zero() {
            return;
        }
        let mut cache = self.responses.lock().await;
        cache.retain(|_, entry| entry.cached_at.elapsed() < ttl);
        cache.insert(
            key,
            CachedResponse {
                cached_at: Instant::now(),
                response: response.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CandleProvider;
    use crate::error::EngineError;
    use crate::test_support::{candles_from_closes, halted_ticker, ticker, MockProvider};
    use shared::models::TimeFrame;

    #[derive(Default)]
    struct MemorySink {
        records: std::sync::Mutex<Vec<AnalysisRecord>>,
    }

    impl AnalysisSink for MemorySink {
        fn append(&self, records: &[AnalysisRecord]) -> Result<()> {
            self.records.lock().unwrap().extend_from_slice(records);
            Ok(())
        }
    }

    struct BrokenSink;

    impl AnalysisSink for BrokenSink {
        fn append(&self, _records: &[AnalysisRecord]) -> Result<()> {
            Err(EngineError::StorageError("disk full".to_string()))
        }
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64 + (i as f64 * 0.7).sin() * 3.0).collect()
    }

    fn falling(len: usize) -> Vec<f64> {
        (0..len).map(|i| 300.0 - i as f64 + (i as f64 * 0.5).cos() * 2.0).collect()
    }

    fn test_settings() -> EngineSettings {
        EngineSettings {
            response_cache_ttl_secs: 0,
            store_path: None,
            ..EngineSettings::default()
        }
    }

    fn service_with(providers: Vec<Arc<dyn CandleProvider>>, settings: EngineSettings) -> AnalysisService {
        let adapter = Arc::new(MarketDataAdapter::new(providers, Duration::from_secs(30), 8, Duration::ZERO));
        let tickers = Arc::new(TickerCache::new(settings.ticker_max_age()));
        AnalysisService::new(adapter, tickers, Arc::new(settings))
    }

    fn market_provider() -> MockProvider {
        MockProvider::new("primary")
            .with_tickers(vec![
                ticker("BTCUSDT", 5e7),
                ticker("ETHUSDT", 3e7),
                ticker("FAILUSDT", 2e7),
                ticker("LOWUSDT", 10.0),
                ticker("BTCEUR", 1e9),
            ])
            .with_series("BTCUSDT", TimeFrame::Minute15, candles_from_closes(&rising(80), 10.0))
            .with_series("BTCUSDT", TimeFrame::Hour1, candles_from_closes(&rising(60), 10.0))
            .with_series("ETHUSDT", TimeFrame::Minute15, candles_from_closes(&falling(80), 10.0))
            .with_series("ETHUSDT", TimeFrame::Hour1, candles_from_closes(&falling(60), 10.0))
    }

    fn request(limit: usize) -> AnalyzeRequest {
        AnalyzeRequest {
            timeframes: vec![TimeFrame::Minute15, TimeFrame::Hour1],
            min_volume: 1e6,
            limit,
            min_score: None,
        }
    }

    #[tokio::test]
    async fn test_analyze_market_excludes_failed_and_filtered_symbols() {
        let sink = Arc::new(MemorySink::default());
        let service = service_with(vec![Arc::new(market_provider())], test_settings()).with_sink(sink.clone());

        let response = service.analyze_market(request(10)).await.unwrap();

        assert_eq!(response.total, 2);
        let names: Vec<&str> = response.symbols.iter().map(|s| s.symbol.as_str()).collect();
        assert!(names.contains(&"BTCUSDT"));
        assert!(names.contains(&"ETHUSDT"));
        for symbol in &response.symbols {
            assert_eq!(symbol.timeframes.len(), 2);
        }
        assert!(response.symbols[0].avg_score >= response.symbols[1].avg_score);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.run_id == records[0].run_id));
    }

    #[tokio::test]
    async fn test_avg_score_covers_successful_timeframes_only() {
        let provider = MockProvider::new("primary")
            .with_tickers(vec![ticker("SOLUSDT", 2e6)])
            .with_series("SOLUSDT", TimeFrame::Minute1, candles_from_closes(&rising(50), 3.0))
            .with_series("SOLUSDT", TimeFrame::Day1, candles_from_closes(&falling(50), 3.0));
        let service = service_with(vec![Arc::new(provider)], test_settings());

        let req = AnalyzeRequest {
            timeframes: vec![TimeFrame::Minute15, TimeFrame::Minute1, TimeFrame::Day1],
            min_volume: 0.0,
            limit: 5,
            min_score: None,
        };
        let response = service.analyze_market(req).await.unwrap();
        let sol = &response.symbols[0];

        assert_eq!(sol.timeframes.len(), 2);
        assert!(!sol.timeframes.contains_key(&TimeFrame::Minute15));
        let expected = sol.timeframes.values().map(|a| a.score.total_score).sum::<f64>() / 2.0;
        assert!((sol.avg_score - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_total_counts_before_truncation() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings());
        let response = service.analyze_market(request(1)).await.unwrap();
        assert_eq!(response.symbols.len(), 1);
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn test_min_score_filters_before_ranking() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings());
        let mut req = request(10);
        req.min_score = Some(1_000.0);
        let response = service.analyze_market(req).await.unwrap();
        assert!(response.symbols.is_empty());
        assert_eq!(response.total, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings());
        let err = service.analyze_market(request(0)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_abort_analysis() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings()).with_sink(Arc::new(BrokenSink));
        let response = service.analyze_market(request(10)).await.unwrap();
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn test_uses_fresh_ticker_cache_before_fetching() {
        let provider = Arc::new(market_provider());
        let service = service_with(vec![provider.clone()], test_settings());
        service.tickers.replace(vec![ticker("BTCUSDT", 5e7)]).await;

        let response = service.analyze_market(request(10)).await.unwrap();
        assert_eq!(provider.ticker_calls(), 0);
        assert_eq!(response.total, 1);
        assert_eq!(response.symbols[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_candidates_are_capped() {
        let settings = EngineSettings {
            max_candidates: 1,
            ..test_settings()
        };
        let service = service_with(vec![Arc::new(market_provider())], settings);
        let response = service.analyze_market(request(10)).await.unwrap();
        // only the highest-volume candidate is analyzed
        assert_eq!(response.total, 1);
        assert_eq!(response.symbols[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_repeated_request_is_served_from_cache() {
        let provider = Arc::new(market_provider());
        let settings = EngineSettings {
            response_cache_ttl_secs: 120,
            ..test_settings()
        };
        let service = service_with(vec![provider.clone()], settings);

        let first = service.analyze_market(request(10)).await.unwrap();
        let calls = provider.kline_calls();
        let second = service.analyze_market(request(10)).await.unwrap();

        assert_eq!(provider.kline_calls(), calls);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_completed_symbols() {
        let fast = MockProvider::new("fast")
            .with_tickers(vec![ticker("BTCUSDT", 5e7), ticker("ETHUSDT", 3e7)])
            .with_series("BTCUSDT", TimeFrame::Minute15, candles_from_closes(&rising(60), 1.0));
        // ETH only comes from the slow fallback
        let slow = MockProvider::new("slow")
            .with_delay(Duration::from_secs(10))
            .with_series("ETHUSDT", TimeFrame::Minute15, candles_from_closes(&falling(60), 1.0));
        let settings = EngineSettings {
            request_deadline_secs: 1,
            ..test_settings()
        };
        let service = service_with(vec![Arc::new(fast), Arc::new(slow)], settings);

        let req = AnalyzeRequest {
            timeframes: vec![TimeFrame::Minute15],
            min_volume: 0.0,
            limit: 10,
            min_score: None,
        };
        let response = service.analyze_market(req).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.symbols[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_analyze_symbol_normalizes_and_records() {
        let sink = Arc::new(MemorySink::default());
        let service = service_with(vec![Arc::new(market_provider())], test_settings()).with_sink(sink.clone());

        let result = service
            .analyze_symbol(AnalyzeSymbolRequest {
                symbol: " btcusdt".to_string(),
                timeframe: TimeFrame::Hour1,
            })
            .await
            .unwrap();

        assert_eq!(result.symbol, "BTCUSDT");
        assert_eq!(result.timeframe, TimeFrame::Hour1);
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_symbol_errors() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings());

        let missing = service
            .analyze_symbol(AnalyzeSymbolRequest {
                symbol: "FAILUSDT".to_string(),
                timeframe: TimeFrame::Hour1,
            })
            .await
            .unwrap_err();
        assert!(matches!(missing, EngineError::NoData(_)));

        let invalid = service
            .analyze_symbol(AnalyzeSymbolRequest {
                symbol: "BTC/USDT".to_string(),
                timeframe: TimeFrame::Hour1,
            })
            .await
            .unwrap_err();
        assert!(matches!(invalid, EngineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_ticker_fetch_failure_with_empty_cache_yields_empty_response() {
        let service = service_with(vec![Arc::new(MockProvider::new("primary").failing())], test_settings());
        let response = service.analyze_market(request(10)).await.unwrap();
        assert!(response.symbols.is_empty());
        assert_eq!(response.total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tickers_used_when_refetch_fails() {
        // klines available, tickers not
        let provider = MockProvider::new("primary")
            .with_series("BTCUSDT", TimeFrame::Minute15, candles_from_closes(&rising(60), 1.0))
            .with_series("BTCUSDT", TimeFrame::Hour1, candles_from_closes(&rising(60), 1.0));
        let settings = test_settings();
        let max_age = settings.ticker_max_age();
        let service = service_with(vec![Arc::new(provider)], settings);
        service.tickers.replace(vec![ticker("BTCUSDT", 5e7)]).await;
        tokio::time::advance(max_age + Duration::from_secs(1)).await;
        assert!(service.tickers.fresh_snapshot().await.is_none());

        let response = service.analyze_market(request(10)).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.symbols[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_direct_ticker_fetch_refreshes_cache() {
        let provider = Arc::new(market_provider());
        let service = service_with(vec![provider.clone()], test_settings());

        service.analyze_market(request(10)).await.unwrap();
        assert!(service.tickers.fresh_snapshot().await.is_some());

        let mut req = request(10);
        req.limit = 5;
        service.analyze_market(req).await.unwrap();
        assert_eq!(provider.ticker_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_trading_contracts_are_not_candidates() {
        let provider = MockProvider::new("primary")
            .with_tickers(vec![ticker("BTCUSDT", 5e7), halted_ticker("ETHUSDT", 9e7)])
            .with_series("BTCUSDT", TimeFrame::Minute15, candles_from_closes(&rising(60), 1.0))
            .with_series("ETHUSDT", TimeFrame::Minute15, candles_from_closes(&falling(60), 1.0));
        let provider = Arc::new(provider);
        let service = service_with(vec![provider.clone()], test_settings());

        let req = AnalyzeRequest {
            timeframes: vec![TimeFrame::Minute15],
            min_volume: 0.0,
            limit: 10,
            min_score: None,
        };
        let response = service.analyze_market(req).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.symbols[0].symbol, "BTCUSDT");
        // the halted contract never reaches the kline fan-out
        assert_eq!(provider.kline_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_scan_in_flight() {
        let provider = MockProvider::new("slow")
            .with_delay(Duration::from_secs(60))
            .with_tickers(vec![ticker("BTCUSDT", 5e7)]);
        let service = service_with(vec![Arc::new(provider)], test_settings());

        let started = tokio::time::Instant::now();
        let completed = service
            .run_scans(Duration::from_secs(300), tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(completed, 0);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_repeat_until_shutdown() {
        let service = service_with(vec![Arc::new(market_provider())], test_settings());
        let completed = service
            .run_scans(Duration::from_secs(300), tokio::time::sleep(Duration::from_secs(400)))
            .await;
        // ticks at 0s and 300s
        assert_eq!(completed, 2);
    }
}
