// Moving Average Convergence Divergence (MACD) implementation
use super::{Ema, IndicatorCalculator};
use shared::models::MacdValues;

/// Per-index MACD output. `histogram[i] == macd[i] - signal[i]` wherever both are defined.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    pub fn latest(&self) -> Option<MacdValues> {
        let macd = self.macd.last().copied().flatten()?;
        let signal = self.signal.last().copied().flatten()?;
        let histogram = self.histogram.last().copied().flatten()?;
        Some(MacdValues { macd, signal, histogram })
    }
}

pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self { fast, slow, signal }
    }

    pub fn compute(&self, values: &[f64]) -> MacdSeries {
        let fast = Ema::new(self.fast).compute(values);
        let slow = Ema::new(self.slow).compute(values);

        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        // Signal line is seeded over the full-length MACD line, undefined points read as 0.
        let seeded: Vec<f64> = macd.iter().map(|v| v.unwrap_or(0.0)).collect();
        let signal = Ema::new(self.signal).compute(&seeded);

        let histogram = macd
            .iter()
            .zip(signal.iter())
            .map(|(m, s)| match (m, s) {
                (Some(m), Some(s)) => Some(m - s),
                _ => None,
            })
            .collect();

        MacdSeries { macd, signal, histogram }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.3).sin()).collect()
    }

    #[test]
    fn test_histogram_is_macd_minus_signal() {
        let series = Macd::default().compute(&trending(120));
        for i in 0..120 {
            if let (Some(m), Some(s), Some(h)) = (series.macd[i], series.signal[i], series.histogram[i]) {
                assert_eq!(h, m - s);
            }
        }
        assert!(series.latest().is_some());
    }

    #[test]
    fn test_macd_undefined_before_slow_period() {
        let series = Macd::default().compute(&trending(40));
        assert_eq!(series.macd.len(), 40);
        for i in 0..25 {
            assert_eq!(series.macd[i], None);
            assert_eq!(series.histogram[i], None);
        }
        assert!(series.macd[25].is_some());
        // signal is defined early because the seed reads undefined MACD points as zero
        assert_eq!(series.signal[8], Some(0.0));
    }

    #[test]
    fn test_macd_short_series_has_no_latest() {
        let series = Macd::default().compute(&trending(20));
        assert!(series.macd.iter().all(Option::is_none));
        assert_eq!(series.latest(), None);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let latest = Macd::default().compute(&[42.0; 60]).latest().unwrap();
        assert!(latest.macd.abs() < 1e-9);
        assert!(latest.signal.abs() < 1e-9);
        assert!(latest.histogram.abs() < 1e-9);
    }
}
