// Helper functions shared by the analysis_service handlers
use crate::analysis::build_snapshot;
use crate::config::AnalysisParams;
use crate::error::{EngineError, Result};
use crate::scoring::Scorer;
use chrono::Utc;
use shared::models::{AnalyzeRequest, Series, TimeframeAnalysis};

const MIN_SYMBOL_LEN: usize = 2;
const MAX_SYMBOL_LEN: usize = 20;

pub fn validate_request(req: &AnalyzeRequest) -> Result<()> {
    if req.limit == 0 {
        return Err(EngineError::InvalidRequest("limit must be greater than 0".to_string()));
    }
    if req.timeframes.is_empty() {
        return Err(EngineError::InvalidRequest("at least one timeframe is required".to_string()));
    }
    if !req.min_volume.is_finite() || req.min_volume < 0.0 {
        return Err(EngineError::InvalidRequest(format!(
            "min_volume must be a non-negative number, got {}",
            req.min_volume
        )));
    }
    if let Some(min_score) = req.min_score {
        if !min_score.is_finite() {
            return Err(EngineError::InvalidRequest(format!("min_score must be finite, got {}", min_score)));
        }
    }
    Ok(())
}

/// Trimmed, upper-cased symbol of 2 to 20 characters from `A-Z`, `0-9` and `-`.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    let valid_len = (MIN_SYMBOL_LEN..=MAX_SYMBOL_LEN).contains(&symbol.len());
    let valid_chars = symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if !valid_len || !valid_chars {
        return Err(EngineError::InvalidRequest(format!("invalid symbol '{}'", raw.trim())));
    }
    Ok(symbol)
}

/// Snapshot, score and signal for one series, stamped with the analysis time.
pub fn analyze_series(series: &Series, params: &AnalysisParams, scorer: &Scorer) -> Result<TimeframeAnalysis> {
    let snapshot = build_snapshot(series, params)?;
    let (score, signal) = scorer.evaluate(&snapshot);
    Ok(TimeframeAnalysis {
        snapshot,
        score,
        signal,
        timestamp: Utc::now(),
    })
}

/// Cache key for a request; equal requests share a cached response.
pub fn request_key(req: &AnalyzeRequest) -> String {
    format!("{:?}", req)
}
