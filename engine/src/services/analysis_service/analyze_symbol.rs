// Handler for a single (symbol, timeframe) analysis
use super::helpers::{analyze_series, normalize_symbol};
use super::AnalysisService;
use crate::error::{EngineError, Result};
use shared::models::{AnalysisRecord, AnalyzeSymbolRequest, SymbolTimeframeAnalysis};
use uuid::Uuid;

pub async fn handle_analyze_symbol(
    service: &AnalysisService,
    req: &AnalyzeSymbolRequest,
) -> Result<SymbolTimeframeAnalysis> {
    let symbol = normalize_symbol(&req.symbol)?;
    let timeframe = req.timeframe;

    let series = service
        .adapter
        .fetch_series(&symbol, timeframe, service.settings.kline_limit)
        .await
        .map_err(|e| {
            tracing::warn!(%symbol, %timeframe, error = %e, "No market data for symbol");
            match e {
                EngineError::NoData(_) => e,
                other => EngineError::NoData(format!("{} {}: {}", symbol, timeframe, other)),
            }
        })?;

    let analysis = analyze_series(&series, &service.settings.params, &service.scorer)?;
    service.record(&[AnalysisRecord::new(Uuid::new_v4(), &symbol, timeframe, &analysis)]);

    tracing::debug!(%symbol, %timeframe, score = analysis.score.total_score, signal = %analysis.signal, "Analyzed symbol");
    Ok(SymbolTimeframeAnalysis {
        symbol,
        timeframe,
        analysis,
    })
}
