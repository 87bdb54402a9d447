use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::patterns::{CandlePattern, PatternDirection};

/// One OHLCV sample for a symbol at a point in time.
///
/// OHLCV fields are immutable once produced; the optional derived fields
/// (candlestick pattern, moving averages) are attached by later analysis
/// passes without touching the raw sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<CandlePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_direction: Option<PatternDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema: Option<f64>,
}

impl Bar {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            pattern: None,
            pattern_direction: None,
            sma: None,
            ema: None,
        }
    }

    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-to-low range of the candle.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Distance from the top of the body to the high.
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the low to the bottom of the body.
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}
