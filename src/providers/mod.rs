//! Narrow interfaces to the external collaborators: price data, AI
//! classification, news, and the persisted running-flag store.
//!
//! The engine never talks HTTP itself; implementations of these traits are
//! injected at construction time. Simulated implementations for the demo
//! binary and tests live in [`sim`].

pub mod sim;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::bar::Bar;
use crate::error::ProviderError;
use crate::events::TradeAction;
use crate::analytics::indicators::IndicatorBundle;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// One price sample per call; the ticker worker polls this per symbol.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> ProviderResult<Bar>;
}

/// External classification over a recent bar window. `None` means "no
/// opinion" and produces no signal.
#[async_trait]
pub trait SignalClassifier: Send + Sync {
    async fn classify(
        &self,
        symbol: &str,
        bars: &[Bar],
        indicators: &IndicatorBundle,
    ) -> ProviderResult<Option<ClassifierVerdict>>;
}

/// News retrieval with per-article analysis.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn fetch_news(&self, symbol: &str) -> ProviderResult<NewsDigest>;
}

/// Persisted "engine is running" flag, injected before orchestrator
/// start/stop.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    async fn is_running(&self) -> ProviderResult<bool>;
    async fn set_running(&self, running: bool) -> ProviderResult<()>;
}

/// A classification result for one symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierVerdict {
    pub action: TradeAction,
    pub price: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the news provider returns for one symbol.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewsDigest {
    /// Raw article payloads, passed through untouched.
    pub articles: Vec<Value>,
    pub analyses: Vec<NewsAnalysis>,
}

/// Per-article analysis. `market_impact` is the provider's
/// `"<up|down|stable> (<magnitude>%) <immediate|short-term|long-term>"`
/// string, parsed lazily by the news worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub key_topics: Vec<String>,
    pub market_impact: String,
    pub trading_signals: Vec<Value>,
    pub confidence: f64,
}

/// In-memory run-state store; the default when no external persistence is
/// wired in.
#[derive(Debug, Default)]
pub struct MemoryRunStateStore {
    running: AtomicBool,
}

impl MemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStateStore for MemoryRunStateStore {
    async fn is_running(&self) -> ProviderResult<bool> {
        Ok(self.running.load(Ordering::SeqCst))
    }

    async fn set_running(&self, running: bool) -> ProviderResult<()> {
        self.running.store(running, Ordering::SeqCst);
        Ok(())
    }
}
