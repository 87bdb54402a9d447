use serde::{Deserialize, Serialize};

use crate::constants::indicators::*;
use crate::data::bar::Bar;

/// MACD line position relative to its signal line on the latest bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RsiReading {
    pub value: f64,
    pub overbought: bool,
    pub oversold: bool,
}

impl RsiReading {
    /// Warm-up default: neutral midpoint, neither flag set.
    fn neutral() -> Self {
        Self {
            value: NEUTRAL_OSCILLATOR,
            overbought: false,
            oversold: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub crossover: Crossover,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBandsReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub bandwidth: f64,
    pub percent_b: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
    pub overbought: bool,
    pub oversold: bool,
}

impl StochasticReading {
    fn neutral() -> Self {
        Self {
            k: NEUTRAL_OSCILLATOR,
            d: NEUTRAL_OSCILLATOR,
            overbought: false,
            oversold: false,
        }
    }
}

/// Simple moving average of the trailing `period` closes.
///
/// Warm-up: returns 0.0 with fewer than `period` bars. Callers must tolerate
/// the degraded value rather than treating it as a price level.
pub fn sma(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return 0.0;
    }
    let window = &bars[bars.len() - period..];
    window.iter().map(|b| b.close).sum::<f64>() / period as f64
}

/// Exponential moving average over the trailing `period` closes, seeded with
/// the oldest close in the window.
///
/// Warm-up: returns 0.0 with fewer than `period` bars.
pub fn ema(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return 0.0;
    }
    let window = &bars[bars.len() - period..];
    let k = 2.0 / (period as f64 + 1.0);
    let mut value = window[0].close;
    for bar in &window[1..] {
        value = bar.close * k + value * (1.0 - k);
    }
    value
}

/// RSI with Wilder's smoothing: initial average gain/loss over the first
/// `period` deltas, then `avg = (avg * (period - 1) + delta) / period`.
///
/// Warm-up: neutral 50 with both flags false below `period + 1` bars.
pub fn rsi(bars: &[Bar], period: usize) -> RsiReading {
    if period == 0 || bars.len() < period + 1 {
        return RsiReading::neutral();
    }

    let deltas: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();

    let mut avg_gain = deltas[..period]
        .iter()
        .filter(|&&d| d > 0.0)
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = deltas[..period]
        .iter()
        .filter(|&&d| d < 0.0)
        .map(|d| d.abs())
        .sum::<f64>()
        / period as f64;

    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    let value = if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    RsiReading {
        value,
        overbought: value > RSI_OVERBOUGHT,
        oversold: value < RSI_OVERSOLD,
    }
}

/// MACD(12,26,9): line = EMA12 - EMA26, signal = EMA9 of the trailing 9-bar
/// MACD series, histogram = line - signal. Crossover reads the histogram
/// sign; an exact tie is `None`.
pub fn macd(bars: &[Bar]) -> MacdReading {
    let line = macd_line(bars);

    // MACD value at each of the trailing MACD_SIGNAL window ends.
    let series: Vec<f64> = (0..MACD_SIGNAL)
        .rev()
        .map(|back| {
            let end = bars.len().saturating_sub(back);
            macd_line(&bars[..end])
        })
        .collect();
    let signal = ema_values(&series, MACD_SIGNAL);

    let histogram = line - signal;
    let crossover = if histogram > 0.0 {
        Crossover::Bullish
    } else if histogram < 0.0 {
        Crossover::Bearish
    } else {
        Crossover::None
    };

    MacdReading {
        line,
        signal,
        histogram,
        crossover,
    }
}

fn macd_line(bars: &[Bar]) -> f64 {
    ema(bars, MACD_FAST) - ema(bars, MACD_SLOW)
}

/// EMA over a plain value series, same seeding as [`ema`].
fn ema_values(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return 0.0;
    }
    let window = &values[values.len() - period..];
    let k = 2.0 / (period as f64 + 1.0);
    let mut value = window[0];
    for &v in &window[1..] {
        value = v * k + value * (1.0 - k);
    }
    value
}

/// Average true range: mean of max(high-low, |high-prev_close|,
/// |low-prev_close|) over the trailing `period` ranges.
///
/// Warm-up: returns 0.0 below `period + 1` bars (the first true range needs a
/// previous close).
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period + 1 {
        return 0.0;
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let bar = &w[1];
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect();

    let window = &true_ranges[true_ranges.len() - period..];
    window.iter().sum::<f64>() / period as f64
}

/// Bollinger bands: SMA middle, `width` standard deviations either side,
/// plus bandwidth ((upper-lower)/middle) and %B ((close-lower)/(upper-lower)).
///
/// Warm-up: the all-zero band below `period` bars.
pub fn bollinger(bars: &[Bar], period: usize, width: f64) -> BollingerBandsReading {
    if period == 0 || bars.len() < period {
        return BollingerBandsReading::default();
    }

    let middle = sma(bars, period);
    let window = &bars[bars.len() - period..];
    let variance = window
        .iter()
        .map(|b| (b.close - middle).powi(2))
        .sum::<f64>()
        / period as f64;
    let sigma = variance.sqrt();

    let upper = middle + width * sigma;
    let lower = middle - width * sigma;

    let bandwidth = if middle != 0.0 {
        (upper - lower) / middle
    } else {
        0.0
    };
    let close = bars[bars.len() - 1].close;
    let percent_b = if upper != lower {
        (close - lower) / (upper - lower)
    } else {
        0.0
    };

    BollingerBandsReading {
        upper,
        middle,
        lower,
        bandwidth,
        percent_b,
    }
}

/// Stochastic oscillator: %K = (close - lowest_low) / (highest_high -
/// lowest_low) * 100 over the period window, %D = `smoothing`-bar SMA of %K.
///
/// Warm-up: 50/50 with both flags false below `period` bars.
pub fn stochastic(bars: &[Bar], period: usize, smoothing: usize) -> StochasticReading {
    if period == 0 || bars.len() < period {
        return StochasticReading::neutral();
    }

    let k = percent_k(bars, period);

    // %D averages %K at the trailing `smoothing` window ends, or as many as
    // the history allows.
    let samples = smoothing.min(bars.len() - period + 1).max(1);
    let d = (0..samples)
        .map(|back| percent_k(&bars[..bars.len() - back], period))
        .sum::<f64>()
        / samples as f64;

    StochasticReading {
        k,
        d,
        overbought: k > STOCHASTIC_OVERBOUGHT,
        oversold: k < STOCHASTIC_OVERSOLD,
    }
}

fn percent_k(bars: &[Bar], period: usize) -> f64 {
    let window = &bars[bars.len() - period..];
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let highest = window
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);

    if highest == lowest {
        return NEUTRAL_OSCILLATOR;
    }
    (window[window.len() - 1].close - lowest) / (highest - lowest) * 100.0
}

/// The full indicator set computed over one bar window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBundle {
    pub sma_9: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub sma_100: f64,
    pub sma_200: f64,
    pub ema_9: f64,
    pub ema_20: f64,
    pub ema_50: f64,
    pub rsi: RsiReading,
    pub macd: MacdReading,
    pub atr: f64,
    pub bollinger: BollingerBandsReading,
    pub stochastic: StochasticReading,
}

impl IndicatorBundle {
    pub fn compute(bars: &[Bar]) -> Self {
        Self {
            sma_9: sma(bars, 9),
            sma_20: sma(bars, 20),
            sma_50: sma(bars, 50),
            sma_100: sma(bars, 100),
            sma_200: sma(bars, 200),
            ema_9: ema(bars, 9),
            ema_20: ema(bars, 20),
            ema_50: ema(bars, 50),
            rsi: rsi(bars, RSI_PERIOD),
            macd: macd(bars),
            atr: atr(bars, ATR_PERIOD),
            bollinger: bollinger(bars, BOLLINGER_PERIOD, BOLLINGER_WIDTH),
            stochastic: stochastic(bars, STOCHASTIC_PERIOD, STOCHASTIC_SMOOTHING),
        }
    }

    /// Every SMA in the bundle, in ascending period order.
    pub fn smas(&self) -> [f64; 5] {
        [
            self.sma_9,
            self.sma_20,
            self.sma_50,
            self.sma_100,
            self.sma_200,
        ]
    }
}

/// Attaches SMA / EMA values of the given period to each bar, walking the
/// series so each bar sees only its own history. OHLCV fields are untouched.
pub fn attach_moving_averages(bars: &[Bar], period: usize) -> Vec<Bar> {
    let mut out: Vec<Bar> = bars.to_vec();
    for i in 0..out.len() {
        let history = &bars[..=i];
        if history.len() >= period {
            out[i].sma = Some(sma(history, period));
            out[i].ema = Some(ema(history, period));
        }
    }
    out
}
