use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::constants::agents::NEWS_MIN_POLL_INTERVAL;
use crate::data::store::BarStore;
use crate::error::AgentError;
use crate::events::{
    Event, ImpactDirection, MarketImpact, SignalDetail, SignalSource, TradeAction, TradeSignal,
};
use crate::providers::{NewsAnalysis, NewsFeed};

use super::{emit, spawn_cycle_loop, AgentKind, AgentReport, AgentState, AgentStatus};

#[derive(Debug, Default)]
struct SymbolWatch {
    in_flight: bool,
    last_checked: Option<DateTime<Utc>>,
}

/// Per-symbol in-flight guard for news fetches.
///
/// `begin` hands out at most one [`MonitorGuard`] per symbol at a time; the
/// guard clears the flag and stamps the last-checked time on drop, so the
/// slot is released on every path out of a fetch, success or not.
#[derive(Clone, Debug, Default)]
pub struct MonitoringState {
    entries: Arc<DashMap<String, SymbolWatch>>,
}

impl MonitoringState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the symbol for a fetch. Returns `None` when a fetch for it is
    /// already in flight.
    pub fn begin(&self, symbol: &str) -> Option<MonitorGuard> {
        let mut entry = self.entries.entry(symbol.to_string()).or_default();
        if entry.in_flight {
            return None;
        }
        entry.in_flight = true;
        drop(entry);

        Some(MonitorGuard {
            state: self.clone(),
            symbol: symbol.to_string(),
        })
    }

    pub fn is_monitoring(&self, symbol: &str) -> bool {
        self.entries
            .get(symbol)
            .map(|e| e.in_flight)
            .unwrap_or(false)
    }

    pub fn last_checked(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.entries.get(symbol).and_then(|e| e.last_checked)
    }
}

/// RAII release of a symbol's monitoring slot.
pub struct MonitorGuard {
    state: MonitoringState,
    symbol: String,
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        let mut entry = self.state.entries.entry(self.symbol.clone()).or_default();
        entry.in_flight = false;
        entry.last_checked = Some(Utc::now());
    }
}

#[derive(Clone, Debug)]
pub struct NewsSettings {
    pub symbols: Vec<String>,
    /// Requested cadence; floored at 15 minutes when the timer is armed.
    pub interval: Duration,
    /// Analyses below this confidence never become signals.
    pub min_confidence: f64,
}

/// Polls the news provider per symbol and derives at most one trade signal
/// per symbol per cycle from the strongest qualifying analysis.
pub struct NewsAgent {
    state: AgentState,
    settings: Arc<Mutex<NewsSettings>>,
    feed: Arc<dyn NewsFeed>,
    store: BarStore,
    monitoring: MonitoringState,
    outbox: mpsc::Sender<Event>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl NewsAgent {
    pub fn new(
        settings: NewsSettings,
        feed: Arc<dyn NewsFeed>,
        store: BarStore,
        outbox: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: AgentState::new("news", AgentKind::News),
            settings: Arc::new(Mutex::new(settings)),
            feed,
            store,
            monitoring: MonitoringState::new(),
            outbox,
            stop_tx: Mutex::new(None),
        }
    }

    pub fn start(&self) -> Result<(), AgentError> {
        let mut stop_slot = self.stop_tx.lock().unwrap();
        if stop_slot.is_some() {
            warn!("news already running, start ignored");
            return Ok(());
        }

        let interval = self
            .settings
            .lock()
            .unwrap()
            .interval
            .max(NEWS_MIN_POLL_INTERVAL);
        let (stop_tx, stop_rx) = watch::channel(false);
        *stop_slot = Some(stop_tx);

        self.state.set_status(AgentStatus::Active);
        info!("news started (interval {interval:?})");

        let state = self.state.clone();
        let settings = self.settings.clone();
        let feed = self.feed.clone();
        let store = self.store.clone();
        let monitoring = self.monitoring.clone();
        let outbox = self.outbox.clone();

        spawn_cycle_loop(interval, stop_rx, move || {
            let state = state.clone();
            let settings = settings.clone();
            let feed = feed.clone();
            let store = store.clone();
            let monitoring = monitoring.clone();
            let outbox = outbox.clone();
            async move {
                Self::run_cycle(&state, &settings, feed.as_ref(), &store, &monitoring, &outbox)
                    .await;
                state.set_status(AgentStatus::Active);
            }
        });

        Ok(())
    }

    pub fn stop(&self) -> Result<(), AgentError> {
        if let Some(stop_tx) = self.stop_tx.lock().unwrap().take() {
            let _ = stop_tx.send(true);
        }
        self.state.set_status(AgentStatus::Inactive);
        info!("news stopped");
        Ok(())
    }

    pub fn report(&self) -> AgentReport {
        self.state.report()
    }

    pub fn monitoring(&self) -> &MonitoringState {
        &self.monitoring
    }

    pub fn set_symbols(&self, symbols: Vec<String>) {
        self.settings.lock().unwrap().symbols = symbols;
    }

    pub fn set_interval(&self, interval: Duration) {
        self.settings.lock().unwrap().interval = interval;
    }

    pub fn set_min_confidence(&self, min_confidence: f64) {
        self.settings.lock().unwrap().min_confidence = min_confidence;
    }

    async fn run_cycle(
        state: &AgentState,
        settings: &Mutex<NewsSettings>,
        feed: &dyn NewsFeed,
        store: &BarStore,
        monitoring: &MonitoringState,
        outbox: &mpsc::Sender<Event>,
    ) {
        let (symbols, min_confidence) = {
            let s = settings.lock().unwrap();
            (s.symbols.clone(), s.min_confidence)
        };

        let checks = symbols.iter().map(|symbol| {
            Self::monitor_symbol(state, symbol, min_confidence, feed, store, monitoring, outbox)
        });
        join_all(checks).await;
    }

    /// Fetches and evaluates news for one symbol. Skips symbols whose
    /// previous fetch is still in flight; swallows per-symbol fetch errors.
    pub(crate) async fn monitor_symbol(
        state: &AgentState,
        symbol: &str,
        min_confidence: f64,
        feed: &dyn NewsFeed,
        store: &BarStore,
        monitoring: &MonitoringState,
        outbox: &mpsc::Sender<Event>,
    ) {
        let Some(_guard) = monitoring.begin(symbol) else {
            debug!("news: {symbol} fetch already in flight, skipping");
            return;
        };

        let digest = match feed.fetch_news(symbol).await {
            Ok(digest) => digest,
            Err(e) => {
                warn!("news: fetch failed for {symbol}: {e}");
                return;
            }
        };

        let Some((analysis, impact)) = strongest_analysis(&digest.analyses, min_confidence) else {
            return;
        };

        // News analyses carry no price; the signal is priced from the most
        // recent stored bar.
        let Some(price) = store.latest_close(symbol) else {
            debug!("news: no stored price for {symbol}, dropping signal");
            return;
        };

        let action = match impact.direction {
            ImpactDirection::Up => TradeAction::Buy,
            ImpactDirection::Down => TradeAction::Sell,
            ImpactDirection::Stable => return,
        };

        let signal = TradeSignal {
            symbol: symbol.to_string(),
            action,
            price,
            confidence: analysis.confidence,
            timestamp: Utc::now(),
            source: SignalSource::News,
            detail: Some(SignalDetail {
                sentiment: match impact.direction {
                    ImpactDirection::Up => "bullish".to_string(),
                    _ => "bearish".to_string(),
                },
                key_events: analysis.key_topics.clone(),
                reasoning: format!("news impact: {impact}"),
                impact: Some(impact),
            }),
        };

        info!(
            "news: {symbol} {:?} @ {:.2} (confidence {:.2})",
            signal.action, signal.price, signal.confidence
        );
        emit(state.name(), outbox, Event::Signal(signal)).await;
    }
}

/// The highest-confidence analysis with a parseable, non-stable market
/// impact at or above the confidence floor. Unparseable impact strings are
/// logged and ignored rather than failing the cycle.
fn strongest_analysis(
    analyses: &[NewsAnalysis],
    min_confidence: f64,
) -> Option<(&NewsAnalysis, MarketImpact)> {
    analyses
        .iter()
        .filter_map(|a| match a.market_impact.parse::<MarketImpact>() {
            Ok(impact) => Some((a, impact)),
            Err(e) => {
                debug!("news: skipping analysis: {e}");
                None
            }
        })
        .filter(|(a, impact)| {
            impact.direction != ImpactDirection::Stable && a.confidence >= min_confidence
        })
        .max_by(|(a, _), (b, _)| a.confidence.total_cmp(&b.confidence))
}
