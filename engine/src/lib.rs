// Engine library root: indicators, scoring, market data access and the
// multi-timeframe analyzer.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod scoring;
pub mod services;

#[cfg(test)]
mod test_support;
