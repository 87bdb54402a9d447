//! Simulated collaborators for the demo binary and tests: a random-walk
//! price feed, a momentum classifier driven by the real analytics, and a
//! news feed that never has anything to say.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;

use crate::analytics::indicators::IndicatorBundle;
use crate::analytics::trend::{self, TrendDirection};
use crate::data::bar::Bar;
use crate::events::TradeAction;

use super::{
    ClassifierVerdict, NewsDigest, NewsFeed, PriceFeed, ProviderResult, SignalClassifier,
};

/// Random-walk OHLCV generator, one independent walk per symbol.
pub struct RandomWalkFeed {
    last_close: DashMap<String, f64>,
    start_price: f64,
    /// Per-step move, as a fraction of price.
    volatility: f64,
}

impl RandomWalkFeed {
    pub fn new(start_price: f64, volatility: f64) -> Self {
        Self {
            last_close: DashMap::new(),
            start_price,
            volatility,
        }
    }
}

impl Default for RandomWalkFeed {
    fn default() -> Self {
        Self::new(100.0, 0.01)
    }
}

#[async_trait]
impl PriceFeed for RandomWalkFeed {
    async fn fetch_price(&self, symbol: &str) -> ProviderResult<Bar> {
        let mut rng = rand::thread_rng();

        let prev = *self
            .last_close
            .entry(symbol.to_string())
            .or_insert(self.start_price);

        let drift = prev * self.volatility;
        let open = prev;
        let close = (prev + rng.gen_range(-drift..=drift)).max(0.01);
        let high = open.max(close) + rng.gen_range(0.0..=drift / 2.0);
        let low = (open.min(close) - rng.gen_range(0.0..=drift / 2.0)).max(0.01);
        let volume = rng.gen_range(10_000..=500_000);

        self.last_close.insert(symbol.to_string(), close);

        Ok(Bar::new(symbol, Utc::now(), open, high, low, close, volume))
    }
}

/// Classifier that trades the engine's own trend assessment: a clear
/// bullish trend buys, a clear bearish one sells, anything else abstains.
pub struct MomentumClassifier {
    /// Trend strength must clear this distance from neutral to act.
    pub min_conviction: f64,
}

impl Default for MomentumClassifier {
    fn default() -> Self {
        Self {
            min_conviction: 0.2,
        }
    }
}

#[async_trait]
impl SignalClassifier for MomentumClassifier {
    async fn classify(
        &self,
        symbol: &str,
        bars: &[Bar],
        indicators: &IndicatorBundle,
    ) -> ProviderResult<Option<ClassifierVerdict>> {
        let assessment = trend::classify_trend(bars, indicators);
        let conviction = (assessment.strength - 0.5).abs();

        let action = match assessment.direction {
            TrendDirection::Bullish => TradeAction::Buy,
            TrendDirection::Bearish => TradeAction::Sell,
            TrendDirection::Neutral => return Ok(None),
        };
        if conviction < self.min_conviction {
            return Ok(None);
        }

        let price = bars.last().map(|b| b.close).unwrap_or_default();
        Ok(Some(ClassifierVerdict {
            action,
            price,
            confidence: (0.5 + conviction).min(1.0),
            reasoning: format!(
                "{symbol}: {:?} trend, strength {:.2}, rsi {:.1}",
                assessment.direction, assessment.strength, indicators.rsi.value
            ),
            timestamp: Utc::now(),
        }))
    }
}

/// News feed with no news. Keeps the news worker's machinery running in the
/// demo without inventing headlines.
#[derive(Debug, Default)]
pub struct QuietNewsFeed;

#[async_trait]
impl NewsFeed for QuietNewsFeed {
    async fn fetch_news(&self, _symbol: &str) -> ProviderResult<NewsDigest> {
        Ok(NewsDigest::default())
    }
}
