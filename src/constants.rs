//! Engine-wide constants and tuning values.
//!
//! Candlestick thresholds, indicator warm-up defaults, risk weights and
//! worker cadences live here as named values rather than inline literals, so
//! the decision rules are auditable in one place.

use std::time::Duration;

/// Technical indicator constants.
pub mod indicators {
    /// Warm-up default for RSI and stochastic readings.
    pub const NEUTRAL_OSCILLATOR: f64 = 50.0;

    pub const RSI_PERIOD: usize = 14;
    pub const RSI_OVERBOUGHT: f64 = 70.0;
    pub const RSI_OVERSOLD: f64 = 30.0;

    pub const MACD_FAST: usize = 12;
    pub const MACD_SLOW: usize = 26;
    pub const MACD_SIGNAL: usize = 9;

    pub const ATR_PERIOD: usize = 14;

    pub const BOLLINGER_PERIOD: usize = 20;
    pub const BOLLINGER_WIDTH: f64 = 2.0;

    pub const STOCHASTIC_PERIOD: usize = 14;
    pub const STOCHASTIC_SMOOTHING: usize = 3;
    pub const STOCHASTIC_OVERBOUGHT: f64 = 80.0;
    pub const STOCHASTIC_OVERSOLD: f64 = 20.0;
}

/// Candlestick pattern thresholds.
pub mod patterns {
    /// A body under this fraction of the full range reads as a doji.
    pub const DOJI_BODY_MAX_FRACTION: f64 = 0.10;

    /// The dominant shadow of a hammer / shooting star vs the body.
    pub const SHADOW_DOMINANCE: f64 = 2.0;

    /// The opposite shadow of a hammer / shooting star vs the body.
    pub const SHADOW_MINOR_LIMIT: f64 = 0.5;

    /// Two-bar patterns need a stable lookback; evaluation starts here.
    pub const TWO_BAR_START: usize = 2;
}

/// Trend and volume classification constants.
pub mod trend {
    /// Trend strength starts here and is nudged per corroborating signal.
    pub const STRENGTH_SEED: f64 = 0.5;
    pub const STRENGTH_STEP: f64 = 0.1;

    /// Bars on each side of a pivot when detecting support/resistance.
    pub const PIVOT_WINGS: usize = 2;

    /// Recent window vs the baseline before it, for the volume regime.
    pub const VOLUME_RECENT: usize = 5;
    pub const VOLUME_BASELINE: usize = 15;
    /// Relative change that flips the regime away from neutral.
    pub const VOLUME_SHIFT_THRESHOLD: f64 = 0.10;
}

/// Risk engine constants.
pub mod risk {
    /// Kelly fraction is clamped to [0, this] of the account balance.
    pub const KELLY_CAP: f64 = 0.25;

    pub const LEVERAGE_BASE: f64 = 3.0;
    pub const LEVERAGE_FLOOR: f64 = 1.0;

    /// Window for the high/low swing measure.
    pub const SWING_WINDOW: usize = 20;

    /// ATR multiples for derived stop / target when a signal carries none.
    pub const STOP_ATR_MULTIPLE: f64 = 2.0;
    pub const TARGET_ATR_MULTIPLE: f64 = 3.0;

    /// Per-bar return standard deviation treated as maximum volatility risk.
    pub const VOLATILITY_NORM: f64 = 0.05;

    /// Composite score weights.
    pub const WEIGHT_VOLATILITY: f64 = 0.25;
    pub const WEIGHT_TREND: f64 = 0.20;
    pub const WEIGHT_VOLUME: f64 = 0.15;
    pub const WEIGHT_POSITION: f64 = 0.25;
    pub const WEIGHT_RISK_REWARD: f64 = 0.15;

    /// Score cut-offs for the four risk levels.
    pub const LEVEL_LOW_BELOW: f64 = 0.3;
    pub const LEVEL_MEDIUM_BELOW: f64 = 0.6;
    pub const LEVEL_HIGH_BELOW: f64 = 0.8;
}

/// Worker scheduling constants.
pub mod agents {
    use super::Duration;

    /// News polling never runs more often than this.
    pub const NEWS_MIN_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

    /// An analysis cycle firing earlier than (interval - this) after the
    /// previous one is timer jitter, not a real tick, and is skipped.
    pub const CYCLE_JITTER_GRACE: Duration = Duration::from_millis(1000);

    /// Bars kept per symbol in the store.
    pub const DEFAULT_HISTORY_LIMIT: usize = 200;

    /// Analysis looks at roughly this many recent bars per symbol.
    pub const ANALYSIS_BAR_WINDOW: usize = 30;
    /// ... and skips symbols with fewer than this many.
    pub const ANALYSIS_MIN_BARS: usize = 10;

    /// External broadcast bus capacity.
    pub const EVENT_BUS_CAPACITY: usize = 256;
    /// Per-worker outbox channel capacity.
    pub const OUTBOX_CAPACITY: usize = 128;
}
