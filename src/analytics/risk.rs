use serde::{Deserialize, Serialize};

use crate::constants::indicators::ATR_PERIOD;
use crate::constants::risk::*;
use crate::data::bar::Bar;

use super::indicators::{self, IndicatorBundle};
use super::trend::{self, TrendAssessment, VolumeRegime};

/// Inputs for a risk assessment.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeParameters {
    pub entry_price: f64,
    /// Share count of the proposed position.
    pub position_size: f64,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub account_balance: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilityMetrics {
    /// Standard deviation of close-to-close returns over the window.
    pub std_dev: f64,
    pub atr: f64,
    /// High-to-low swing over the last 20 bars, in percent of the low.
    pub swing_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalContext {
    pub trend: TrendAssessment,
    pub supports: Vec<f64>,
    pub resistances: Vec<f64>,
    pub volume: VolumeRegime,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRisk {
    /// Largest position value the capped Kelly fraction allows.
    pub max_position_size: f64,
    /// Loss if the stop is hit: (entry - stop) * size.
    pub risk_per_trade: f64,
    /// 3x scaled down by realized volatility, never below 1.
    pub suggested_leverage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < LEVEL_LOW_BELOW {
            RiskLevel::Low
        } else if score < LEVEL_MEDIUM_BELOW {
            RiskLevel::Medium
        } else if score < LEVEL_HIGH_BELOW {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub volatility: VolatilityMetrics,
    pub technical: TechnicalContext,
    pub position: PositionRisk,
    /// Weighted composite of the individual risk factors, in [0,1].
    pub score: f64,
    pub level: RiskLevel,
}

/// Assesses a proposed trade over a bar window.
///
/// Missing stop/target fall back to [`derive_exits`]; a missing account
/// balance falls back to the proposed position's notional value.
pub fn assess(bars: &[Bar], params: &TradeParameters) -> RiskAssessment {
    let bundle = IndicatorBundle::compute(bars);

    let volatility = volatility_metrics(bars, &bundle);
    let technical = TechnicalContext {
        trend: trend::classify_trend(bars, &bundle),
        supports: trend::support_levels(bars),
        resistances: trend::resistance_levels(bars),
        volume: trend::volume_regime(bars),
    };

    let (derived_stop, derived_target) = derive_exits(bars, params.entry_price);
    let stop = params.stop_loss.unwrap_or(derived_stop);
    let target = params.target.unwrap_or(derived_target);

    let notional = params.entry_price * params.position_size;
    let balance = params.account_balance.unwrap_or(notional);

    let kelly = kelly_fraction(bars).clamp(0.0, KELLY_CAP);
    let max_position_size = kelly * balance;
    let risk_per_trade = (params.entry_price - stop) * params.position_size;
    let suggested_leverage =
        (LEVERAGE_BASE * (1.0 - volatility.std_dev).max(0.0)).max(LEVERAGE_FLOOR);

    let position = PositionRisk {
        max_position_size,
        risk_per_trade,
        suggested_leverage,
    };

    let score = composite_score(
        &volatility,
        &technical,
        notional,
        max_position_size,
        params.entry_price,
        stop,
        target,
    );

    RiskAssessment {
        volatility,
        technical,
        position,
        score,
        level: RiskLevel::from_score(score),
    }
}

/// Stop/target for an entry when the signal supplies none: the nearest
/// support below entry (else entry - 2 ATR) and the nearest resistance above
/// entry (else entry + 3 ATR).
pub fn derive_exits(bars: &[Bar], entry: f64) -> (f64, f64) {
    let atr = indicators::atr(bars, ATR_PERIOD);

    let stop = trend::support_levels(bars)
        .into_iter()
        .filter(|&s| s < entry)
        .fold(None::<f64>, |best, s| Some(best.map_or(s, |b| b.max(s))))
        .unwrap_or(entry - STOP_ATR_MULTIPLE * atr);

    let target = trend::resistance_levels(bars)
        .into_iter()
        .find(|&r| r > entry)
        .unwrap_or(entry + TARGET_ATR_MULTIPLE * atr);

    (stop, target)
}

fn volatility_metrics(bars: &[Bar], bundle: &IndicatorBundle) -> VolatilityMetrics {
    VolatilityMetrics {
        std_dev: return_std_dev(bars),
        atr: bundle.atr,
        swing_pct: swing_pct(bars),
    }
}

fn return_std_dev(bars: &[Bar]) -> f64 {
    let returns = close_returns(bars);
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    variance.sqrt()
}

fn swing_pct(bars: &[Bar]) -> f64 {
    let window = if bars.len() > SWING_WINDOW {
        &bars[bars.len() - SWING_WINDOW..]
    } else {
        bars
    };
    if window.is_empty() {
        return 0.0;
    }
    let highest = window
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if lowest <= 0.0 {
        return 0.0;
    }
    (highest - lowest) / lowest * 100.0
}

fn close_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect()
}

/// Kelly fraction from the window's close-to-close returns:
/// win_rate / avg_loss - (1 - win_rate) / avg_win. Degenerate windows (no
/// wins or no losses) saturate rather than divide by zero.
fn kelly_fraction(bars: &[Bar]) -> f64 {
    let returns = close_returns(bars);
    if returns.is_empty() {
        return 0.0;
    }

    let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();

    if losses.is_empty() {
        return KELLY_CAP;
    }
    if wins.is_empty() {
        return 0.0;
    }

    let win_rate = wins.len() as f64 / returns.len() as f64;
    let avg_win = wins.iter().sum::<f64>() / wins.len() as f64;
    let avg_loss = losses.iter().map(|l| l.abs()).sum::<f64>() / losses.len() as f64;

    win_rate / avg_loss - (1.0 - win_rate) / avg_win
}

#[allow(clippy::too_many_arguments)]
fn composite_score(
    volatility: &VolatilityMetrics,
    technical: &TechnicalContext,
    notional: f64,
    max_position_size: f64,
    entry: f64,
    stop: f64,
    target: f64,
) -> f64 {
    let volatility_factor = (volatility.std_dev / VOLATILITY_NORM).min(1.0);

    // Weak or ambiguous trends carry more risk than strong ones.
    let trend_factor = 1.0 - technical.trend.strength;

    let volume_factor = match technical.volume {
        VolumeRegime::Increasing => 0.3,
        VolumeRegime::Neutral => 0.5,
        VolumeRegime::Decreasing => 0.7,
    };

    let position_factor = if max_position_size > 0.0 {
        (notional / max_position_size).min(1.0)
    } else {
        1.0
    };

    let risk = entry - stop;
    let reward = target - entry;
    let risk_reward_factor = if risk <= 0.0 || reward <= 0.0 {
        0.9
    } else {
        let ratio = reward / risk;
        if ratio >= 2.0 {
            0.2
        } else if ratio >= 1.5 {
            0.4
        } else if ratio >= 1.0 {
            0.6
        } else {
            0.9
        }
    };

    (volatility_factor * WEIGHT_VOLATILITY
        + trend_factor * WEIGHT_TREND
        + volume_factor * WEIGHT_VOLUME
        + position_factor * WEIGHT_POSITION
        + risk_reward_factor * WEIGHT_RISK_REWARD)
        .clamp(0.0, 1.0)
}
