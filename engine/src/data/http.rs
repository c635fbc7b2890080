// Thin reqwest helpers shared by the exchange providers
use crate::error::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// GETs `url` and decodes the JSON body. Transport errors and non-2xx
/// statuses are transient; an undecodable body is malformed data.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .query(query)
        .send()
        .await
        .map_err(|e| EngineError::transient(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EngineError::transient(provider, format!("HTTP {} from {}", status, url)));
    }

    let body = response.text().await.map_err(|e| EngineError::transient(provider, e))?;
    serde_json::from_str(&body)
        .map_err(|e| EngineError::MalformedData(format!("{} returned an undecodable payload: {}", provider, e)))
}

/// Exchanges mix JSON numbers and numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
