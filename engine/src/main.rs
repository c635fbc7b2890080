// Scanner engine entry point: periodic market scans until Ctrl-C
use anyhow::Context;
use engine::config::EngineSettings;
use engine::data::{CsvAnalysisStore, MarketDataAdapter, TickerCache};
use engine::services::AnalysisService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "SCANNER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "scanner.json";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting futures scanner engine...");

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let settings = Arc::new(
        EngineSettings::load(&config_path).with_context(|| format!("loading settings from {}", config_path))?,
    );

    let adapter = Arc::new(MarketDataAdapter::from_settings(&settings).context("building market data adapter")?);
    info!(providers = ?adapter.provider_names(), "Market data adapter ready");

    let tickers = Arc::new(TickerCache::new(settings.ticker_max_age()));
    let refresh_task = tickers
        .clone()
        .spawn_refresh(adapter.clone(), settings.ticker_refresh_interval());

    let mut service = AnalysisService::new(adapter, tickers, settings.clone());
    if let Some(path) = &settings.store_path {
        info!(path = %path, "Persisting analysis records");
        service = service.with_sink(Arc::new(CsvAnalysisStore::new(path)));
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let scans = service
        .run_scans(Duration::from_secs(settings.scan_interval_secs), shutdown)
        .await;

    refresh_task.abort();
    info!(scans, "Scanner engine stopped");
    Ok(())
}
