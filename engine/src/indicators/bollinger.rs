// Bollinger Bands: SMA middle band +/- mult * population standard deviation
use shared::models::BollingerBand;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl BollingerSeries {
    pub fn latest(&self) -> Option<BollingerBand> {
        Some(BollingerBand {
            upper: self.upper.last().copied().flatten()?,
            middle: self.middle.last().copied().flatten()?,
            lower: self.lower.last().copied().flatten()?,
        })
    }
}

pub struct BollingerBands {
    period: usize,
    mult: f64,
}

impl BollingerBands {
    pub fn new(period: usize, mult: f64) -> Self {
        Self { period, mult }
    }

    pub fn compute(&self, values: &[f64]) -> BollingerSeries {
        let len = values.len();
        let mut series = BollingerSeries {
            upper: vec![None; len],
            middle: vec![None; len],
            lower: vec![None; len],
        };
        if self.period == 0 || len < self.period {
            return series;
        }

        let period = self.period as f64;
        for end in self.period..=len {
            let window = &values[end - self.period..end];
            let middle = window.iter().sum::<f64>() / period;
            let variance = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / period;
            let offset = self.mult * variance.sqrt();

            let i = end - 1;
            series.middle[i] = Some(middle);
            series.upper[i] = Some(middle + offset);
            series.lower[i] = Some(middle - offset);
        }
        series
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}
