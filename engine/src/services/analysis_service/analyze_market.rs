// Handler for a full market scan across several timeframes
use super::helpers::analyze_series;
use super::AnalysisService;
use crate::error::Result;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use shared::models::{
    AnalysisRecord, AnalyzeRequest, AnalyzeResponse, SymbolAnalysis, Ticker, TimeFrame, TimeframeAnalysis,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::time::Instant;
use uuid::Uuid;

pub async fn handle_analyze_market(service: &AnalysisService, req: &AnalyzeRequest) -> Result<AnalyzeResponse> {
    let run_id = Uuid::new_v4();
    let candidates = select_candidates(service, req.min_volume).await;
    tracing::info!(%run_id, candidates = candidates.len(), timeframes = ?req.timeframes, "Starting market analysis");

    let deadline = Instant::now() + service.settings.request_deadline();
    let mut pending = stream::iter(candidates)
        .map(|ticker| analyze_candidate(service, ticker, &req.timeframes))
        .buffer_unordered(service.settings.symbol_concurrency.max(1));

    let mut symbols = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some(Some(analysis))) => symbols.push(analysis),
            Ok(Some(None)) => {}
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(%run_id, completed = symbols.len(), "Analysis deadline reached, dropping outstanding symbols");
                break;
            }
        }
    }
    drop(pending);

    persist(service, run_id, &symbols);

    if let Some(min_score) = req.min_score {
        symbols.retain(|s| s.avg_score >= min_score);
    }
    symbols.sort_by(|a, b| b.avg_score.partial_cmp(&a.avg_score).unwrap_or(Ordering::Equal));
    let total = symbols.len();
    symbols.truncate(req.limit);

    tracing::info!(%run_id, total, returned = symbols.len(), "Market analysis finished");
    Ok(AnalyzeResponse { symbols, total })
}

// Cached tickers when fresh, otherwise a direct fetch. A failed fetch falls
// back to the stale snapshot, or to no candidates at all. Tradable
// quote-asset symbols over the volume floor, by volume descending, capped.
async fn select_candidates(service: &AnalysisService, min_volume: f64) -> Vec<Ticker> {
    let tickers = match service.tickers.fresh_snapshot().await {
        Some(snapshot) => snapshot.tickers.clone(),
        None => match service.adapter.fetch_tickers().await {
            Ok(tickers) => {
                service.tickers.replace(tickers.clone()).await;
                tickers
            }
            Err(e) => {
                let stale = service.tickers.snapshot().await;
                tracing::warn!(
                    error = %e,
                    stale_tickers = stale.tickers.len(),
                    "Ticker fetch failed, using last known tickers"
                );
                stale.tickers.clone()
            }
        },
    };

    let quote = service.settings.quote_asset.as_str();
    let mut candidates: Vec<Ticker> = tickers
        .into_iter()
        .filter(|t| t.tradable && t.symbol.ends_with(quote) && t.volume_24h >= min_volume)
        .collect();
    candidates.sort_by(|a, b| b.volume_24h.partial_cmp(&a.volume_24h).unwrap_or(Ordering::Equal));
    candidates.truncate(service.settings.max_candidates);
    candidates
}

// All timeframes of one symbol run concurrently. None when every timeframe failed.
async fn analyze_candidate(service: &AnalysisService, ticker: Ticker, timeframes: &[TimeFrame]) -> Option<SymbolAnalysis> {
    let symbol = ticker.symbol.as_str();
    let units = timeframes
        .iter()
        .map(|&tf| async move { (tf, analyze_unit(service, symbol, tf).await) });

    let mut analyzed: BTreeMap<TimeFrame, TimeframeAnalysis> = BTreeMap::new();
    for (timeframe, result) in join_all(units).await {
        match result {
            Ok(analysis) => {
                analyzed.insert(timeframe, analysis);
            }
            Err(e) if e.is_skippable() => {
                tracing::warn!(symbol, %timeframe, error = %e, "Skipping timeframe");
            }
            Err(e) => {
                tracing::error!(symbol, %timeframe, error = %e, "Timeframe analysis failed");
            }
        }
    }

    if analyzed.is_empty() {
        tracing::debug!(symbol, "No timeframe produced a result, excluding symbol");
        return None;
    }

    let avg_score = analyzed.values().map(|a| a.score.total_score).sum::<f64>() / analyzed.len() as f64;
    Some(SymbolAnalysis {
        symbol: ticker.symbol,
        volume_24h: ticker.volume_24h,
        timeframes: analyzed,
        avg_score,
    })
}

async fn analyze_unit(service: &AnalysisService, symbol: &str, timeframe: TimeFrame) -> Result<TimeframeAnalysis> {
    let series = service
        .adapter
        .fetch_series(symbol, timeframe, service.settings.kline_limit)
        .await?;
    analyze_series(&series, &service.settings.params, &service.scorer)
}

fn persist(service: &AnalysisService, run_id: Uuid, symbols: &[SymbolAnalysis]) {
    let records: Vec<AnalysisRecord> = symbols
        .iter()
        .flat_map(|s| {
            s.timeframes
                .iter()
                .map(move |(tf, analysis)| AnalysisRecord::new(run_id, &s.symbol, *tf, analysis))
        })
        .collect();
    service.record(&records);
}
