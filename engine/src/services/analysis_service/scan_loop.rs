// Handler for the periodic market scan loop
use super::AnalysisService;
use std::future::Future;
use std::time::Duration;
use tracing::info;

const TOP_SYMBOLS_LOGGED: usize = 10;

/// Scans every `every` until `shutdown` resolves. A scan in flight is
/// abandoned as soon as shutdown fires. Returns the number of finished scans.
pub async fn handle_run_scans<F>(service: &AnalysisService, every: Duration, shutdown: F) -> usize
where
    F: Future,
{
    tokio::pin!(shutdown);
    let mut scans = tokio::time::interval(every.max(Duration::from_secs(1)));
    let mut completed = 0;
    loop {
        tokio::select! {
            _ = scans.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
        tokio::select! {
            _ = run_scan(service) => completed += 1,
            _ = &mut shutdown => {
                info!("Shutdown signal received, abandoning scan in flight");
                break;
            }
        }
    }
    completed
}

async fn run_scan(service: &AnalysisService) {
    let request = service.settings.default_request.clone();
    match service.analyze_market(request).await {
        Ok(response) => {
            info!(total = response.total, returned = response.symbols.len(), "Scan complete");
            for (rank, symbol) in response.symbols.iter().take(TOP_SYMBOLS_LOGGED).enumerate() {
                let signals: Vec<String> = symbol
                    .timeframes
                    .iter()
                    .map(|(tf, analysis)| format!("{}={}", tf, analysis.signal))
                    .collect();
                info!(
                    rank = rank + 1,
                    symbol = %symbol.symbol,
                    avg_score = %format!("{:.2}", symbol.avg_score),
                    volume_24h = symbol.volume_24h,
                    signals = %signals.join(" "),
                    "Top symbol"
                );
            }
        }
        Err(e) => tracing::error!(error = %e, "Scan failed"),
    }
}
