use crate::config::AnalysisParams;
use crate::error::{EngineError, Result};
use crate::indicators::{BollingerBands, IndicatorCalculator, Macd, Rsi, Sma, VolumeProfile};
use crate::scoring::ma_signal;
use shared::models::{IndicatorSnapshot, Series};
use shared::utils::{mean, percent_change};

const NEUTRAL_RSI: f64 = 50.0;

/// Indicator values at the last candle of `series`.
///
/// Short histories never fail: RSI falls back to 50, MACD to zeros and the
/// MA to `None`. Only an empty series is rejected.
pub fn build_snapshot(series: &Series, params: &AnalysisParams) -> Result<IndicatorSnapshot> {
    let last = series
        .last()
        .ok_or_else(|| EngineError::MalformedData("cannot analyze an empty series".to_string()))?;
    let closes = series.closes();
    let volumes = series.volumes();
    let current_price = last.close;

    let rsi = Rsi::new(params.rsi_period).latest(&closes).unwrap_or(NEUTRAL_RSI);
    let macd = Macd::new(params.macd_fast, params.macd_slow, params.macd_signal)
        .compute(&closes)
        .latest()
        .unwrap_or_default();
    let ma = Sma::new(params.ma_period).latest(&closes);

    let price_change_percent = match closes.len() {
        n if n >= 2 => percent_change(closes[n - 2], current_price),
        _ => 0.0,
    };

    let trailing = &volumes[volumes.len().saturating_sub(params.volume_ma_period)..];
    let volume_ma = mean(trailing).unwrap_or(0.0);
    let volume_ratio = if volume_ma == 0.0 { 1.0 } else { last.volume / volume_ma };

    let bollinger = BollingerBands::new(params.bollinger_period, params.bollinger_mult)
        .compute(&closes)
        .latest();
    let poc = VolumeProfile::new(params.volume_profile_bins)
        .compute(&closes, &volumes)
        .map(|profile| profile.poc);

    Ok(IndicatorSnapshot {
        rsi,
        macd,
        ma,
        ma_signal: ma_signal(current_price, ma),
        current_price,
        price_change_percent,
        volume: last.volume,
        volume_ma,
        volume_ratio,
        bollinger,
        poc,
    })
}
