// Relative Strength Index (RSI) indicator implementation, Wilder smoothing
use super::IndicatorCalculator;
use serde_json::Value;

pub struct Rsi {
    name: String,
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            name: format!("RSI({})", period),
            period,
        }
    }

    // No losses in the averaging window reads as 100, flat windows included.
    fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

impl IndicatorCalculator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>> {
        if self.period == 0 || values.len() <= self.period {
            return vec![None; values.len()];
        }

        let period = self.period as f64;
        let mut results = vec![None; self.period]; // RSI needs 'period' initial changes

        let mut gains = 0.0;
        let mut losses = 0.0;
        for i in 1..=self.period {
            let change = values[i] - values[i - 1];
            if change > 0.0 {
                gains += change;
            } else {
                losses -= change; // losses are positive values
            }
        }

        let mut avg_gain = gains / period;
        let mut avg_loss = losses / period;
        results.push(Some(Self::from_averages(avg_gain, avg_loss)));

        for i in (self.period + 1)..values.len() {
            let change = values[i] - values[i - 1];
            let (current_gain, current_loss) = if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            };

            avg_gain = (avg_gain * (period - 1.0) + current_gain) / period;
            avg_loss = (avg_loss * (period - 1.0) + current_loss) / period;
            results.push(Some(Self::from_averages(avg_gain, avg_loss)));
        }
        results
    }
}
