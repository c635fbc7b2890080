// Process-wide 24h ticker cache. A single background task refreshes it;
// readers get an immutable snapshot and never observe a partial update.
use super::market_data::MarketDataAdapter;
use crate::error::Result;
use chrono::{DateTime, Utc};
use shared::models::Ticker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

#[derive(Debug, Clone, Default)]
pub struct TickerSnapshot {
    pub tickers: Vec<Ticker>,
    pub refreshed_at: Option<DateTime<Utc>>,
    fetched: Option<Instant>,
}

impl TickerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched.map_or(false, |at| at.elapsed() <= max_age)
    }
}

pub struct TickerCache {
    snapshot: RwLock<Arc<TickerSnapshot>>,
    max_age: Duration,
}

impl TickerCache {
    pub fn new(max_age: Duration) -> Self {
        TickerCache {
            snapshot: RwLock::new(Arc::new(TickerSnapshot::default())),
            max_age,
        }
    }

    pub async fn snapshot(&self) -> Arc<TickerSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// The current snapshot unless it is empty or older than the max age.
    pub async fn fresh_snapshot(&self) -> Option<Arc<TickerSnapshot>> {
        let snapshot = self.snapshot().await;
        (!snapshot.is_empty() && snapshot.is_fresh(self.max_age)).then_some(snapshot)
    }

    pub async fn replace(&self, tickers: Vec<Ticker>) {
        let next = Arc::new(TickerSnapshot {
            tickers,
            refreshed_at: Some(Utc::now()),
            fetched: Some(Instant::now()),
        });
        *self.snapshot.write().await = next;
    }

    pub async fn refresh(&self, adapter: &MarketDataAdapter) -> Result<usize> {
        let tickers = adapter.fetch_tickers().await?;
        let count = tickers.len();
        self.replace(tickers).await;
        tracing::info!(count, "Ticker cache refreshed");
        Ok(count)
    }

    /// Refreshes immediately and then on every `every` tick until the handle is aborted.
    pub fn spawn_refresh(self: Arc<Self>, adapter: Arc<MarketDataAdapter>, every: Duration) -> JoinHandle<()> {
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(every));
            while ticks.next().await.is_some() {
                if let Err(e) = self.refresh(&adapter).await {
                    // Keep serving the previous snapshot until it ages out.
                    tracing::warn!(error = %e, "Ticker cache refresh failed");
                }
            }
        })
    }
}
