// Market data access: exchange providers, the fallback adapter, caches and
// the append-only analysis store.
pub mod bitunix;
pub mod bybit;
pub mod csv_store;
pub mod http;
pub mod market_data;
pub mod provider;
pub mod ticker_cache;

pub use bitunix::BitunixProvider;
pub use bybit::BybitProvider;
pub use csv_store::{AnalysisSink, CsvAnalysisStore};
pub use market_data::MarketDataAdapter;
pub use provider::CandleProvider;
pub use ticker_cache::{TickerCache, TickerSnapshot};
