// Composite score and signal classification for one (symbol, timeframe)
use crate::config::AnalysisParams;
use shared::models::{IndicatorSnapshot, ScoreBreakdown, Signal};

pub struct Scorer {
    rsi_weight: f64,
    macd_weight: f64,
    price_weight: f64,
    volume_weight: f64,
    ma_weight: f64,
}

impl Scorer {
    pub fn new(params: &AnalysisParams) -> Self {
        Scorer {
            rsi_weight: params.rsi_weight,
            macd_weight: params.macd_weight,
            price_weight: params.price_weight,
            volume_weight: params.volume_weight,
            ma_weight: params.ma_weight,
        }
    }

    pub fn score(&self, snapshot: &IndicatorSnapshot) -> ScoreBreakdown {
        let rsi_score = rsi_score(snapshot.rsi);
        let macd_score = snapshot.macd.histogram * 10.0;
        let price_score = snapshot.price_change_percent * 2.0;
        let volume_score = volume_score(snapshot.volume_ratio);
        let ma_score = f64::from(snapshot.ma_signal) * 20.0;

        let total_score = rsi_score * self.rsi_weight
            + macd_score * self.macd_weight
            + price_score * self.price_weight
            + volume_score * self.volume_weight
            + ma_score * self.ma_weight;

        ScoreBreakdown {
            rsi_score,
            macd_score,
            price_score,
            volume_score,
            ma_score,
            total_score,
        }
    }

    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> (ScoreBreakdown, Signal) {
        let score = self.score(snapshot);
        (score, classify(score.total_score))
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(&AnalysisParams::default())
    }
}

// Oversold below 30 scores up to +50, overbought above 70 down to -50.
fn rsi_score(rsi: f64) -> f64 {
    if rsi < 30.0 {
        ((30.0 - rsi) / 30.0) * 50.0
    } else if rsi > 70.0 {
        -((rsi - 70.0) / 30.0) * 50.0
    } else {
        0.0
    }
}

fn volume_score(volume_ratio: f64) -> f64 {
    if volume_ratio > 1.5 {
        30.0
    } else if volume_ratio > 1.0 {
        15.0
    } else if volume_ratio > 0.5 {
        0.0
    } else {
        -15.0
    }
}

/// First match wins. Note the boundaries: exactly 20 is BUY, exactly -20 is STRONG_SELL.
pub fn classify(total_score: f64) -> Signal {
    if total_score > 20.0 {
        Signal::StrongBuy
    } else if total_score > 10.0 {
        Signal::Buy
    } else if total_score <= -20.0 {
        Signal::StrongSell
    } else if total_score < -10.0 {
        Signal::Sell
    } else {
        Signal::Neutral
    }
}

/// +1 more than 2% above the MA, -1 more than 2% below, 0 otherwise or without an MA.
pub fn ma_signal(price: f64, ma: Option<f64>) -> i8 {
    match ma {
        Some(ma) if price > ma * 1.02 => 1,
        Some(ma) if price < ma * 0.98 => -1,
        _ => 0,
    }
}
