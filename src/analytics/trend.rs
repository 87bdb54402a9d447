use serde::{Deserialize, Serialize};

use crate::constants::trend::*;
use crate::data::bar::Bar;

use super::indicators::{Crossover, IndicatorBundle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeRegime {
    Increasing,
    Decreasing,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub direction: TrendDirection,
    /// Bounded [0,1]; 0.5 is neutral, above favors the bulls.
    pub strength: f64,
}

/// Classifies the primary trend from the latest close and the indicator
/// bundle.
///
/// Bullish requires price above every SMA, a bullish MACD crossover and RSI
/// not overbought; bearish is the mirror. Anything else is neutral.
/// Strength starts at 0.5 and moves 0.1 per corroborating signal (price vs
/// each SMA, RSI side of the midline, MACD crossover), clamped to [0,1].
pub fn classify_trend(bars: &[Bar], indicators: &IndicatorBundle) -> TrendAssessment {
    let Some(last) = bars.last() else {
        return TrendAssessment {
            direction: TrendDirection::Neutral,
            strength: STRENGTH_SEED,
        };
    };
    let price = last.close;
    let smas = indicators.smas();

    let above_all = smas.iter().all(|&s| price > s);
    let below_all = smas.iter().all(|&s| price < s);

    let direction = if above_all
        && indicators.macd.crossover == Crossover::Bullish
        && !indicators.rsi.overbought
    {
        TrendDirection::Bullish
    } else if below_all
        && indicators.macd.crossover == Crossover::Bearish
        && !indicators.rsi.oversold
    {
        TrendDirection::Bearish
    } else {
        TrendDirection::Neutral
    };

    let mut strength = STRENGTH_SEED;
    for &s in &smas {
        if price > s {
            strength += STRENGTH_STEP;
        } else if price < s {
            strength -= STRENGTH_STEP;
        }
    }
    match indicators.macd.crossover {
        Crossover::Bullish => strength += STRENGTH_STEP,
        Crossover::Bearish => strength -= STRENGTH_STEP,
        Crossover::None => {}
    }
    if indicators.rsi.value > 50.0 {
        strength += STRENGTH_STEP;
    } else if indicators.rsi.value < 50.0 {
        strength -= STRENGTH_STEP;
    }

    TrendAssessment {
        direction,
        strength: strength.clamp(0.0, 1.0),
    }
}

/// Support levels: strict local minima of the low series over a 5-point
/// window (the pivot must be strictly below its two neighbors on each side).
/// Deduplicated and ascending.
pub fn support_levels(bars: &[Bar]) -> Vec<f64> {
    pivot_levels(bars, |b| b.low, |pivot, other| pivot < other)
}

/// Resistance levels: strict local maxima of the high series over a 5-point
/// window. Deduplicated and ascending.
pub fn resistance_levels(bars: &[Bar]) -> Vec<f64> {
    pivot_levels(bars, |b| b.high, |pivot, other| pivot > other)
}

fn pivot_levels(
    bars: &[Bar],
    value: impl Fn(&Bar) -> f64,
    dominates: impl Fn(f64, f64) -> bool,
) -> Vec<f64> {
    let wings = PIVOT_WINGS;
    if bars.len() < 2 * wings + 1 {
        return Vec::new();
    }

    let mut levels: Vec<f64> = (wings..bars.len() - wings)
        .filter(|&i| {
            let pivot = value(&bars[i]);
            (1..=wings).all(|w| dominates(pivot, value(&bars[i - w])))
                && (1..=wings).all(|w| dominates(pivot, value(&bars[i + w])))
        })
        .map(|i| value(&bars[i]))
        .collect();

    levels.sort_by(f64::total_cmp);
    levels.dedup();
    levels
}

/// Volume regime: mean of the latest 5 volumes vs the mean of the 15 before
/// them. A shift beyond 10% in either direction sets the regime; anything
/// inside that band stays neutral.
pub fn volume_regime(bars: &[Bar]) -> VolumeRegime {
    if bars.len() < VOLUME_RECENT + VOLUME_BASELINE {
        return VolumeRegime::Neutral;
    }

    let recent = &bars[bars.len() - VOLUME_RECENT..];
    let baseline = &bars[bars.len() - VOLUME_RECENT - VOLUME_BASELINE..bars.len() - VOLUME_RECENT];

    let recent_mean = recent.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_RECENT as f64;
    let baseline_mean =
        baseline.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_BASELINE as f64;

    if baseline_mean == 0.0 {
        return VolumeRegime::Neutral;
    }

    let shift = (recent_mean - baseline_mean) / baseline_mean;
    if shift > VOLUME_SHIFT_THRESHOLD {
        VolumeRegime::Increasing
    } else if shift < -VOLUME_SHIFT_THRESHOLD {
        VolumeRegime::Decreasing
    } else {
        VolumeRegime::Neutral
    }
}
