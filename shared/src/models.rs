use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles of one symbol and timeframe, oldest first, one candle per timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Sorts by timestamp and drops duplicate timestamps, keeping the first one seen.
    pub fn from_candles(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "3m")]
    Minute3,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 9] = [
        TimeFrame::Minute1,
        TimeFrame::Minute3,
        TimeFrame::Minute5,
        TimeFrame::Minute15,
        TimeFrame::Minute30,
        TimeFrame::Hour1,
        TimeFrame::Hour4,
        TimeFrame::Day1,
        TimeFrame::Week1,
    ];

    /// Canonical label, e.g. "15m" or "1d".
    pub fn label(&self) -> &'static str {
        match self {
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
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeFrameError(pub String);

impl fmt::Display for ParseTimeFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timeframe label '{}'", self.0)
    }
}

impl std::error::Error for ParseTimeFrameError {}

impl FromStr for TimeFrame {
    type Err = ParseTimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        TimeFrame::ALL
            .iter()
            .copied()
            .find(|tf| tf.label() == label)
            .ok_or_else(|| ParseTimeFrameError(s.to_string()))
    }
}

/// Latest 24h statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    /// Quote-currency turnover over the last 24h.
    pub volume_24h: f64,
    pub price_change_24h_percent: f64,
    /// False when the exchange lists the contract as not open for trading
    /// (settling, delivering, pre-launch) or does not list it at all.
    #[serde(default = "default_tradable")]
    pub tradable: bool,
}

fn default_tradable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Indicator values at the latest point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: MacdValues,
    pub ma: Option<f64>,
    pub ma_signal: i8,
    pub current_price: f64,
    pub price_change_percent: f64,
    pub volume: f64,
    pub volume_ma: f64,
    pub volume_ratio: f64,
    pub bollinger: Option<BollingerBand>,
    pub poc: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub rsi_score: f64,
    pub macd_score: f64,
    pub price_score: f64,
    pub volume_score: f64,
    pub ma_score: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::StrongBuy => "STRONG_BUY",
            Signal::Buy => "BUY",
            Signal::Neutral => "NEUTRAL",
            Signal::Sell => "SELL",
            Signal::StrongSell => "STRONG_SELL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    #[serde(flatten)]
    pub snapshot: IndicatorSnapshot,
    pub score: ScoreBreakdown,
    pub signal: Signal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub volume_24h: f64,
    /// Only timeframes that produced a result are present.
    pub timeframes: BTreeMap<TimeFrame, TimeframeAnalysis>,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub timeframes: Vec<TimeFrame>,
    pub min_volume: f64,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub symbols: Vec<SymbolAnalysis>,
    /// Number of ranked symbols before truncation to the request limit.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSymbolRequest {
    pub symbol: String,
    pub timeframe: TimeFrame,
}

/// Flattened single (symbol, timeframe) analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTimeframeAnalysis {
    pub symbol: String,
    pub timeframe: TimeFrame,
    #[serde(flatten)]
    pub analysis: TimeframeAnalysis,
}

/// One persisted row per (symbol, timeframe, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub run_id: Uuid,
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub price_change: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub ma: Option<f64>,
    pub ma_signal: i8,
    pub volume: f64,
    pub volume_ma: f64,
    pub volume_ratio: f64,
    pub total_score: f64,
    pub signal: Signal,
}

impl AnalysisRecord {
    pub fn new(run_id: Uuid, symbol: &str, timeframe: TimeFrame, analysis: &TimeframeAnalysis) -> Self {
        let snapshot = &analysis.snapshot;
        Self {
            run_id,
            symbol: symbol.to_string(),
            timeframe,
            timestamp: analysis.timestamp,
            current_price: snapshot.current_price,
            price_change: snapshot.price_change_percent,
            rsi: snapshot.rsi,
            macd: snapshot.macd.macd,
            macd_signal: snapshot.macd.signal,
            macd_hist: snapshot.macd.histogram,
            ma: snapshot.ma,
            ma_signal: snapshot.ma_signal,
            volume: snapshot.volume,
            volume_ma: snapshot.volume_ma,
            volume_ratio: snapshot.volume_ratio,
            total_score: analysis.score.total_score,
            signal: analysis.signal,
        }
    }
}
