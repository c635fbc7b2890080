use crate::error::Result;
use async_trait::async_trait;
use shared::models::{Candle, Ticker, TimeFrame};

/// A source of candles and 24h tickers. Implementations own the mapping from
/// canonical timeframes to their native interval codes.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    fn name(&self) -> &str;

    fn interval_code(&self, timeframe: TimeFrame) -> &'static str;

    /// Raw candles, in whatever order the exchange returns them.
    async fn fetch_klines(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>>;

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;
}
