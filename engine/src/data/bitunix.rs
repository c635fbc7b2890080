//! Bitunix futures public endpoints, used as the secondary candle source.

use super::http::{get_json, value_as_f64, value_as_i64};
use super::provider::CandleProvider;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{Candle, Ticker, TimeFrame};
use shared::utils::datetime_from_millis;

const PROVIDER: &str = "bitunix";

// {"code": 0, "msg": "...", "data": ...}
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn into_data(self) -> Result<Value> {
        if self.code != 0 {
            let msg = self.msg.unwrap_or_else(|| "Unknown error".to_string());
            return Err(EngineError::transient(PROVIDER, format!("code {}: {}", self.code, msg)));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Clone)]
pub struct BitunixProvider {
    base_url: String,
    client: reqwest::Client,
}

impl BitunixProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

// Rows are [openTime, open, high, low, close, volume, ...].
fn parse_kline_data(data: &Value) -> Result<Vec<Candle>> {
    let rows = data
        .as_array()
        .ok_or_else(|| EngineError::MalformedData("bitunix kline data is not an array".to_string()))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            if row.len() < 6 {
                return None;
            }
            Some(Candle {
                timestamp: datetime_from_millis(value_as_i64(&row[0])?)?,
                open: value_as_f64(&row[1])?,
                high: value_as_f64(&row[2])?,
                low: value_as_f64(&row[3])?,
                close: value_as_f64(&row[4])?,
                volume: value_as_f64(&row[5])?,
            })
        })
        .collect())
}

fn first_f64(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| item.get(*key).and_then(value_as_f64))
}

fn parse_ticker_data(data: &Value) -> Vec<Ticker> {
    let items: &[Value] = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(data),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| {
            Some(Ticker {
                symbol: item.get("symbol")?.as_str()?.to_string(),
                last_price: first_f64(item, &["lastPrice", "last"])?,
                volume_24h: first_f64(item, &["quoteVolume", "quoteVol"]).unwrap_or(0.0),
                price_change_24h_percent: first_f64(item, &["priceChangePercent"]).unwrap_or(0.0),
                // the 24h ticker feed carries no contract status
                tradable: true,
            })
        })
        .collect()
}

#[async_trait]
impl CandleProvider for BitunixProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn interval_code(&self, timeframe: TimeFrame) -> &'static str {
        match timeframe {
            TimeFrame::Minute1 => "1m",
            TimeFrame::Minute3 => "3m",
            TimeFrame::Minute5 => "5m",
            TimeFrame::Minute15 => "15m",
            TimeFrame::Minute30 => "30m",
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
            TimeFrame::Week1 => "1w",
        }
    }

    async fn fetch_klines(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>> {
        let url = format!("{}/klines", self.base_url);
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", self.interval_code(timeframe).to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope: Envelope = get_json(&self.client, PROVIDER, &url, &query).await?;
        let candles = parse_kline_data(&envelope.into_data()?)?;
        if candles.is_empty() {
            return Err(EngineError::MalformedData(format!(
                "bitunix returned no usable klines for {} {}",
                symbol, timeframe
            )));
        }
        Ok(candles)
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = format!("{}/ticker/24hr", self.base_url);
        let envelope: Envelope = get_json(&self.client, PROVIDER, &url, &[]).await?;
        Ok(parse_ticker_data(&envelope.into_data()?))
    }
}
