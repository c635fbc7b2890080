//! Bybit v5 public market endpoints (USDT linear perpetuals).

use super::http::get_json;
use super::provider::CandleProvider;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use shared::models::{Candle, Ticker, TimeFrame};
use shared::utils::datetime_from_millis;
use std::collections::HashSet;

const PROVIDER: &str = "bybit";
const INSTRUMENTS_PAGE_LIMIT: usize = 1000;
const MAX_INSTRUMENT_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TickerResult {
    #[serde(default)]
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    symbol: String,
    #[serde(default)]
    last_price: String,
    #[serde(default, rename = "turnover24h")]
    turnover_24h: String,
    #[serde(default, rename = "price24hPcnt")]
    price_24h_pcnt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentsResult {
    #[serde(default)]
    list: Vec<BybitInstrument>,
    #[serde(default)]
    next_page_cursor: String,
}

#[derive(Debug, Deserialize)]
struct BybitInstrument {
    symbol: String,
    // Trading, PreLaunch, Delivering, Closed, Settling
    #[serde(default)]
    status: String,
}

#[derive(Debug, Clone)]
pub struct BybitProvider {
    base_url: String,
    client: reqwest::Client,
}

impl BybitProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

fn unwrap_result<T>(response: BybitResponse<T>) -> Result<T> {
    if response.ret_code != 0 {
        return Err(EngineError::transient(
            PROVIDER,
            format!("retCode {}: {}", response.ret_code, response.ret_msg),
        ));
    }
    response
        .result
        .ok_or_else(|| EngineError::MalformedData("bybit response has no result".to_string()))
}

// Rows are [startTime, open, high, low, close, volume, turnover], newest first.
fn parse_kline_rows(rows: Vec<Vec<String>>) -> Vec<Candle> {
    rows.into_iter()
        .filter_map(|row| {
            if row.len() < 6 {
                tracing::debug!(?row, "Skipping short bybit kline row");
                return None;
            }
            Some(Candle {
                timestamp: datetime_from_millis(row[0].parse().ok()?)?,
                open: row[1].parse().ok()?,
                high: row[2].parse().ok()?,
                low: row[3].parse().ok()?,
                close: row[4].parse().ok()?,
                volume: row[5].parse().ok()?,
            })
        })
        .collect()
}

fn parse_ticker(ticker: BybitTicker) -> Option<Ticker> {
    Some(Ticker {
        last_price: ticker.last_price.parse().ok()?,
        volume_24h: ticker.turnover_24h.parse().unwrap_or(0.0),
        // Bybit reports the change as a fraction
        price_change_24h_percent: ticker.price_24h_pcnt.parse::<f64>().unwrap_or(0.0) * 100.0,
        symbol: ticker.symbol,
        tradable: true,
    })
}

fn trading_symbols(instruments: &[BybitInstrument]) -> HashSet<&str> {
    instruments
        .iter()
        .filter(|i| i.status.eq_ignore_ascii_case("Trading"))
        .map(|i| i.symbol.as_str())
        .collect()
}

// Tickers for contracts missing from the instrument list count as not tradable.
fn mark_tradable(tickers: &mut [Ticker], instruments: &[BybitInstrument]) {
    let trading = trading_symbols(instruments);
    for ticker in tickers.iter_mut() {
        ticker.tradable = trading.contains(ticker.symbol.as_str());
    }
}

impl BybitProvider {
    async fn fetch_instruments(&self) -> Result<Vec<BybitInstrument>> {
        let url = format!("{}/v5/market/instruments-info", self.base_url);
        let mut instruments = Vec::new();
        let mut cursor = String::new();
        for _ in 0..MAX_INSTRUMENT_PAGES {
            let mut query = vec![
                ("category", "linear".to_string()),
                ("limit", INSTRUMENTS_PAGE_LIMIT.to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let response: BybitResponse<InstrumentsResult> = get_json(&self.client, PROVIDER, &url, &query).await?;
            let page = unwrap_result(response)?;
            instruments.extend(page.list);
            if page.next_page_cursor.is_empty() {
                return Ok(instruments);
            }
            cursor = page.next_page_cursor;
        }
        tracing::warn!(pages = MAX_INSTRUMENT_PAGES, "Bybit instrument list truncated");
        Ok(instruments)
    }
}

#[async_trait]
impl CandleProvider for BybitProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn interval_code(&self, timeframe: TimeFrame) -> &'static str {
        match timeframe {
            TimeFrame::Minute1 => "1",
            TimeFrame::Minute3 => "3",
            TimeFrame::Minute5 => "5",
            TimeFrame::Minute15 => "15",
            TimeFrame::Minute30 => "30",
            TimeFrame::Hour1 => "60",
            TimeFrame::Hour4 => "240",
            TimeFrame::Day1 => "D",
            TimeFrame::Week1 => "W",
        }
    }

    async fn fetch_klines(&self, symbol: &str, timeframe: TimeFrame, limit: usize) -> Result<Vec<Candle>> {
        let url = format!("{}/v5/market/kline", self.base_url);
        let query = [
            ("category", "linear".to_string()),
            ("symbol", symbol.to_string()),
            ("interval", self.interval_code(timeframe).to_string()),
            ("limit", limit.to_string()),
        ];
        let response: BybitResponse<KlineResult> = get_json(&self.client, PROVIDER, &url, &query).await?;
        let candles = parse_kline_rows(unwrap_result(response)?.list);
        if candles.is_empty() {
            return Err(EngineError::MalformedData(format!(
                "bybit returned no usable klines for {} {}",
                symbol, timeframe
            )));
        }
        Ok(candles)
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = format!("{}/v5/market/tickers", self.base_url);
        let query = [("category", "linear".to_string())];
        let response: BybitResponse<TickerResult> = get_json(&self.client, PROVIDER, &url, &query).await?;
        let mut tickers: Vec<Ticker> = unwrap_result(response)?.list.into_iter().filter_map(parse_ticker).collect();

        let instruments = self.fetch_instruments().await?;
        mark_tradable(&mut tickers, &instruments);
        Ok(tickers)
    }
}
