// Simple Moving Average (SMA) indicator implementation
use super::IndicatorCalculator;
use serde_json::Value;

pub struct Sma {
    name: String,
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("SMA({})", period),
            period,
        }
    }
}

impl IndicatorCalculator for Sma {
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

        let period = self.period as f64;
        let mut results = vec![None; self.period - 1];

        let mut sum: f64 = values.iter().take(self.period).sum();
        results.push(Some(sum / period));

        // Slide the window
        for i in self.period..values.len() {
            sum = sum - values[i - self.period] + values[i];
            results.push(Some(sum / period));
        }
        results
    }
}
