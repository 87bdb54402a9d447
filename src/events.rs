use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::bar::Bar;
use crate::error::ProviderError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Which worker produced a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Analysis,
    News,
    Ticker,
    Trading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactDirection {
    Up,
    Down,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactTimeframe {
    Immediate,
    ShortTerm,
    LongTerm,
}

/// Parsed market-impact estimate, as delivered by the news provider in the
/// form `"<up|down|stable> (<magnitude>%) <immediate|short-term|long-term>"`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketImpact {
    pub direction: ImpactDirection,
    pub magnitude_pct: f64,
    pub timeframe: ImpactTimeframe,
}

impl FromStr for MarketImpact {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProviderError::Malformed(format!("market impact {s:?}"));

        let mut parts = s.split_whitespace();
        let direction = match parts.next().ok_or_else(malformed)? {
            "up" => ImpactDirection::Up,
            "down" => ImpactDirection::Down,
            "stable" => ImpactDirection::Stable,
            _ => return Err(malformed()),
        };

        let magnitude = parts.next().ok_or_else(malformed)?;
        let magnitude_pct = magnitude
            .strip_prefix('(')
            .and_then(|m| m.strip_suffix("%)"))
            .ok_or_else(malformed)?
            .parse::<f64>()
            .map_err(|_| malformed())?;

        let timeframe = match parts.next().ok_or_else(malformed)? {
            "immediate" => ImpactTimeframe::Immediate,
            "short-term" => ImpactTimeframe::ShortTerm,
            "long-term" => ImpactTimeframe::LongTerm,
            _ => return Err(malformed()),
        };

        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            direction,
            magnitude_pct,
            timeframe,
        })
    }
}

impl fmt::Display for MarketImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            ImpactDirection::Up => "up",
            ImpactDirection::Down => "down",
            ImpactDirection::Stable => "stable",
        };
        let timeframe = match self.timeframe {
            ImpactTimeframe::Immediate => "immediate",
            ImpactTimeframe::ShortTerm => "short-term",
            ImpactTimeframe::LongTerm => "long-term",
        };
        write!(f, "{direction} ({}%) {timeframe}", self.magnitude_pct)
    }
}

/// Optional analysis detail riding along with a signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalDetail {
    pub sentiment: String,
    pub key_events: Vec<String>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<MarketImpact>,
}

/// A proposed trade, produced by the analysis or news worker and consumed
/// exactly once by the trading worker. Not persisted by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub action: TradeAction,
    pub price: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub source: SignalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<SignalDetail>,
}

/// Emitted by the trading worker after a completed trade.
///
/// `quantity` is the position quantity AFTER the trade (0 when a sell just
/// liquidated), not the number of shares traded. Downstream consumers depend
/// on that reading; see DESIGN.md before changing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeExecution {
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: u64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// A worker failure surfaced on the event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentFault {
    pub agent: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything that flows between workers and out to external listeners.
#[derive(Clone, Debug)]
pub enum Event {
    Price(Bar),
    Signal(TradeSignal),
    Execution(TradeExecution),
    Error(AgentFault),
}
