use serde::{Deserialize, Serialize};

use crate::constants::patterns::{
    DOJI_BODY_MAX_FRACTION, SHADOW_DOMINANCE, SHADOW_MINOR_LIMIT, TWO_BAR_START,
};
use crate::data::bar::Bar;

/// Recognized candlestick patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandlePattern {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl CandlePattern {
    pub fn direction(&self) -> PatternDirection {
        match self {
            CandlePattern::Doji => PatternDirection::Neutral,
            CandlePattern::Hammer
            | CandlePattern::BullishEngulfing
            | CandlePattern::BullishHarami => PatternDirection::Bullish,
            CandlePattern::ShootingStar
            | CandlePattern::BearishEngulfing
            | CandlePattern::BearishHarami => PatternDirection::Bearish,
        }
    }
}

/// Evaluation order. The first matching pattern wins and a bar carries at
/// most one label, so this ordering is part of the detector's contract.
const PRIORITY: [CandlePattern; 7] = [
    CandlePattern::Doji,
    CandlePattern::Hammer,
    CandlePattern::ShootingStar,
    CandlePattern::BullishEngulfing,
    CandlePattern::BearishEngulfing,
    CandlePattern::BullishHarami,
    CandlePattern::BearishHarami,
];

/// Annotates an ordered bar sequence with candlestick patterns.
///
/// Returns a same-length vector; OHLCV fields are untouched. Bars that
/// already carry a label keep it, so running the detector over its own
/// output changes nothing.
pub fn annotate(bars: &[Bar]) -> Vec<Bar> {
    let mut out: Vec<Bar> = bars.to_vec();

    for i in 0..out.len() {
        if out[i].pattern.is_some() {
            continue;
        }

        let prev = if i >= TWO_BAR_START {
            Some(&bars[i - 1])
        } else {
            None
        };

        if let Some(pattern) = detect(&bars[i], prev) {
            out[i].pattern = Some(pattern);
            out[i].pattern_direction = Some(pattern.direction());
        }
    }

    out
}

/// First matching pattern for one bar, in priority order. `prev` is None for
/// indices without a stable two-bar lookback.
fn detect(bar: &Bar, prev: Option<&Bar>) -> Option<CandlePattern> {
    PRIORITY.iter().copied().find(|pattern| match pattern {
        CandlePattern::Doji => is_doji(bar),
        CandlePattern::Hammer => is_hammer(bar),
        CandlePattern::ShootingStar => is_shooting_star(bar),
        CandlePattern::BullishEngulfing => prev.is_some_and(|p| is_bullish_engulfing(bar, p)),
        CandlePattern::BearishEngulfing => prev.is_some_and(|p| is_bearish_engulfing(bar, p)),
        CandlePattern::BullishHarami => prev.is_some_and(|p| is_bullish_harami(bar, p)),
        CandlePattern::BearishHarami => prev.is_some_and(|p| is_bearish_harami(bar, p)),
    })
}

fn is_doji(bar: &Bar) -> bool {
    bar.range() > 0.0 && bar.body() < DOJI_BODY_MAX_FRACTION * bar.range()
}

fn is_hammer(bar: &Bar) -> bool {
    bar.lower_shadow() > SHADOW_DOMINANCE * bar.body()
        && bar.upper_shadow() < SHADOW_MINOR_LIMIT * bar.body()
}

fn is_shooting_star(bar: &Bar) -> bool {
    bar.upper_shadow() > SHADOW_DOMINANCE * bar.body()
        && bar.lower_shadow() < SHADOW_MINOR_LIMIT * bar.body()
}

fn is_bullish_engulfing(bar: &Bar, prev: &Bar) -> bool {
    prev.is_bearish()
        && bar.is_bullish()
        && bar.open <= prev.close
        && bar.close >= prev.open
        && bar.body() > prev.body()
}

fn is_bearish_engulfing(bar: &Bar, prev: &Bar) -> bool {
    prev.is_bullish()
        && bar.is_bearish()
        && bar.open >= prev.close
        && bar.close <= prev.open
        && bar.body() > prev.body()
}

fn is_bullish_harami(bar: &Bar, prev: &Bar) -> bool {
    prev.is_bearish()
        && bar.is_bullish()
        && bar.open >= prev.close
        && bar.close <= prev.open
}

fn is_bearish_harami(bar: &Bar, prev: &Bar) -> bool {
    prev.is_bullish()
        && bar.is_bearish()
        && bar.open <= prev.close
        && bar.close >= prev.open
}
