//! Unit tests for the candlestick pattern detector.

use chrono::{Duration, TimeZone, Utc};

use crate::data::bar::Bar;

use super::patterns::{annotate, CandlePattern, PatternDirection};

fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    let t0 = Utc.with_ymd_and_hms(2025, 4, 7, 9, 30, 0).unwrap();
    Bar::new(
        "TEST",
        t0 + Duration::minutes(i as i64),
        open,
        high,
        low,
        close,
        5_000,
    )
}

/// An unremarkable trending candle that matches no pattern.
fn plain(i: usize) -> Bar {
    candle(i, 100.0, 102.5, 99.8, 102.0)
}

#[test]
fn output_is_same_length_and_keeps_ohlcv() {
    let bars = vec![plain(0), plain(1), plain(2)];
    let annotated = annotate(&bars);
    assert_eq!(annotated.len(), 3);
    for (a, b) in annotated.iter().zip(&bars) {
        assert_eq!(a.open, b.open);
        assert_eq!(a.high, b.high);
        assert_eq!(a.low, b.low);
        assert_eq!(a.close, b.close);
    }
}

#[test]
fn plain_candle_stays_unlabeled() {
    let annotated = annotate(&[plain(0)]);
    assert!(annotated[0].pattern.is_none());
    assert!(annotated[0].pattern_direction.is_none());
}

#[test]
fn detects_doji() {
    // body 0.5 on a 20-point range
    let annotated = annotate(&[candle(0, 100.0, 110.0, 90.0, 100.5)]);
    assert_eq!(annotated[0].pattern, Some(CandlePattern::Doji));
    assert_eq!(
        annotated[0].pattern_direction,
        Some(PatternDirection::Neutral)
    );
}

#[test]
fn detects_hammer() {
    // long lower shadow, tiny upper shadow, solid body
    let annotated = annotate(&[candle(0, 100.0, 103.5, 93.0, 103.0)]);
    assert_eq!(annotated[0].pattern, Some(CandlePattern::Hammer));
    assert_eq!(
        annotated[0].pattern_direction,
        Some(PatternDirection::Bullish)
    );
}

#[test]
fn detects_shooting_star() {
    // mirror of the hammer: long upper shadow
    let annotated = annotate(&[candle(0, 103.0, 110.0, 99.5, 100.0)]);
    assert_eq!(annotated[0].pattern, Some(CandlePattern::ShootingStar));
    assert_eq!(
        annotated[0].pattern_direction,
        Some(PatternDirection::Bearish)
    );
}

#[test]
fn detects_bullish_engulfing() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 101.0, 101.2, 99.9, 100.0), // bearish
        candle(3, 99.5, 102.2, 99.4, 102.0),  // engulfs it
    ];
    let annotated = annotate(&bars);
    assert_eq!(annotated[3].pattern, Some(CandlePattern::BullishEngulfing));
    assert_eq!(
        annotated[3].pattern_direction,
        Some(PatternDirection::Bullish)
    );
}

#[test]
fn detects_bearish_engulfing() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 100.0, 101.1, 99.9, 101.0), // bullish
        candle(3, 101.5, 101.6, 98.9, 99.0),  // engulfs it downward
    ];
    let annotated = annotate(&bars);
    assert_eq!(annotated[3].pattern, Some(CandlePattern::BearishEngulfing));
}

#[test]
fn detects_bullish_harami() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 100.0, 100.2, 93.8, 94.0), // big bearish body
        candle(3, 95.0, 96.5, 94.8, 96.0),   // small bullish body inside it
    ];
    let annotated = annotate(&bars);
    assert_eq!(annotated[3].pattern, Some(CandlePattern::BullishHarami));
}

#[test]
fn detects_bearish_harami() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 94.0, 100.2, 93.8, 100.0), // big bullish body
        candle(3, 99.0, 99.3, 97.8, 98.0),   // small bearish body inside it
    ];
    let annotated = annotate(&bars);
    assert_eq!(annotated[3].pattern, Some(CandlePattern::BearishHarami));
}

#[test]
fn two_bar_patterns_need_a_stable_lookback() {
    // the same engulfing shape at indices 0/1 must stay unlabeled
    let bars = vec![
        candle(0, 101.0, 101.2, 99.9, 100.0),
        candle(1, 99.5, 102.2, 99.4, 102.0),
    ];
    let annotated = annotate(&bars);
    assert!(annotated[1].pattern.is_none());
}

#[test]
fn doji_outranks_two_bar_patterns() {
    // bar 3 qualifies as both a doji and a bullish harami; doji wins
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 101.0, 101.2, 94.8, 95.0),  // bearish
        candle(3, 96.0, 99.0, 94.0, 96.2),    // tiny body, wide range, inside prev
    ];
    let annotated = annotate(&bars);
    assert_eq!(annotated[3].pattern, Some(CandlePattern::Doji));
}

#[test]
fn at_most_one_label_per_bar() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 101.0, 101.2, 99.4, 99.5),
        candle(3, 99.5, 102.2, 99.4, 102.0),
        candle(4, 100.0, 110.0, 90.0, 100.5),
    ];
    let annotated = annotate(&bars);
    let labeled = annotated.iter().filter(|b| b.pattern.is_some()).count();
    assert_eq!(labeled, 2); // the engulfing and the doji
}

#[test]
fn annotate_is_idempotent() {
    let bars = vec![
        plain(0),
        plain(1),
        candle(2, 101.0, 101.2, 99.4, 99.5),
        candle(3, 99.5, 102.2, 99.4, 102.0),
        candle(4, 100.0, 110.0, 90.0, 100.5),
    ];
    let once = annotate(&bars);
    let twice = annotate(&once);
    assert_eq!(once, twice);
}

#[test]
fn zero_range_bar_is_never_a_doji() {
    let annotated = annotate(&[candle(0, 100.0, 100.0, 100.0, 100.0)]);
    assert!(annotated[0].pattern.is_none());
}
