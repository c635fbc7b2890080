// Technical indicators module
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume_profile;

pub use bollinger::{BollingerBands, BollingerSeries};
pub use ema::Ema;
pub use macd::{Macd, MacdSeries};
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume_profile::{VolumeProfile, VolumeProfileResult};

use serde_json::Value;
use shared::models::Candle;

// Common trait for single-line indicators.
// Output has one entry per input point; None where the indicator is undefined
// (insufficient history or a zero period).
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> Value; // parameters of this instance, e.g. {"period": 14}

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>>;

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        self.compute(&closes)
    }

    /// Value at the most recent point, if defined there.
    fn latest(&self, values: &[f64]) -> Option<f64> {
        self.compute(values).last().copied().flatten()
    }
}
