// Per-series analysis: indicator snapshot at the latest candle
pub mod snapshot;

pub use snapshot::build_snapshot;
