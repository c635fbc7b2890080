// Small numeric and time helpers shared across crates.
use chrono::{DateTime, Utc};

/// Exchange timestamps arrive as epoch milliseconds.
pub fn datetime_from_millis(ts_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_millis)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentage change from `old` to `new`; `0.0` when `old` is zero.
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    (new - old) / old * 100.0
}
