// Exponential Moving Average (EMA) indicator implementation
use super::IndicatorCalculator;
use serde_json::Value;

pub struct Ema {
    name: String,
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("EMA({})", period),
            period,
        }
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        if self.period == 0 || values.len() < self.period {
            return vec![None; values.len()];
        }

        let mut results = vec![None; self.period - 1];
        let k = 2.0 / (self.period as f64 + 1.0);

        // Seeded with the SMA of the first `period` values
        let initial_sum: f64 = values.iter().take(self.period).sum();
        let mut previous_ema = initial_sum / self.period as f64;
        results.push(Some(previous_ema));

        for value in values.iter().skip(self.period) {
            let ema = value * k + previous_ema * (1.0 - k);
            results.push(Some(ema));
            previous_ema = ema;
        }
        results
    }
}
