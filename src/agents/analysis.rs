use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::analytics::indicators::{self, IndicatorBundle};
use crate::analytics::patterns;
use crate::constants::agents::CYCLE_JITTER_GRACE;
use crate::constants::indicators::BOLLINGER_PERIOD;
use crate::data::store::BarStore;
use crate::error::AgentError;
use crate::events::{Event, SignalDetail, SignalSource, TradeAction, TradeSignal};
use crate::providers::SignalClassifier;

use super::{emit, spawn_cycle_loop, AgentKind, AgentReport, AgentState, AgentStatus};

#[derive(Clone, Debug)]
pub struct AnalysisSettings {
    pub symbols: Vec<String>,
    pub interval: Duration,
    /// Recent bars handed to the classifier per symbol.
    pub bar_window: usize,
    /// Symbols with fewer bars than this are skipped.
    pub min_bars: usize,
}

/// Re-analyzes every configured symbol on a timer: annotates the recent bar
/// window with candlestick patterns and moving averages, computes the
/// indicator bundle, and asks the external classifier for a verdict.
pub struct AnalysisAgent {
    state: AgentState,
    settings: Arc<Mutex<AnalysisSettings>>,
    classifier: Arc<dyn SignalClassifier>,
    store: BarStore,
    outbox: mpsc::Sender<Event>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    last_cycle: Arc<Mutex<Option<Instant>>>,
}

impl AnalysisAgent {
    pub fn new(
        settings: AnalysisSettings,
        classifier: Arc<dyn SignalClassifier>,
        store: BarStore,
        outbox: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: AgentState::new("analysis", AgentKind::Analysis),
            settings: Arc::new(Mutex::new(settings)),
            classifier,
            store,
            outbox,
            stop_tx: Mutex::new(None),
            last_cycle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn start(&self) -> Result<(), AgentError> {
        let mut stop_slot = self.stop_tx.lock().unwrap();
        if stop_slot.is_some() {
            warn!("analysis already running, start ignored");
            return Ok(());
        }

        let interval = self.settings.lock().unwrap().interval;
        let (stop_tx, stop_rx) = watch::channel(false);
        *stop_slot = Some(stop_tx);

        *self.last_cycle.lock().unwrap() = None;
        self.state.set_status(AgentStatus::Active);
        info!("analysis started (interval {interval:?})");

        let state = self.state.clone();
        let settings = self.settings.clone();
        let classifier = self.classifier.clone();
        let store = self.store.clone();
        let outbox = self.outbox.clone();
        let last_cycle = self.last_cycle.clone();

        spawn_cycle_loop(interval, stop_rx, move || {
            let state = state.clone();
            let settings = settings.clone();
            let classifier = classifier.clone();
            let store = store.clone();
            let outbox = outbox.clone();
            let last_cycle = last_cycle.clone();
            async move {
                if !Self::should_run(&last_cycle, &settings) {
                    return;
                }
                match Self::run_cycle(&settings, classifier.as_ref(), &store, &state, &outbox)
                    .await
                {
                    Ok(()) => state.set_status(AgentStatus::Active),
                    Err(e) => state.fail(&outbox, e.to_string()).await,
                }
            }
        });

        Ok(())
    }

    pub fn stop(&self) -> Result<(), AgentError> {
        if let Some(stop_tx) = self.stop_tx.lock().unwrap().take() {
            let _ = stop_tx.send(true);
        }
        self.state.set_status(AgentStatus::Inactive);
        info!("analysis stopped");
        Ok(())
    }

    pub fn report(&self) -> AgentReport {
        self.state.report()
    }

    pub fn set_symbols(&self, symbols: Vec<String>) {
        self.settings.lock().unwrap().symbols = symbols;
    }

    pub fn set_interval(&self, interval: Duration) {
        self.settings.lock().unwrap().interval = interval;
    }

    /// Absorbs timer jitter: a cycle firing earlier than
    /// (interval - grace) after the previous one is not a real tick. The
    /// first cycle always runs.
    pub(crate) fn should_run(
        last_cycle: &Mutex<Option<Instant>>,
        settings: &Mutex<AnalysisSettings>,
    ) -> bool {
        let interval = settings.lock().unwrap().interval;
        let min_gap = interval.saturating_sub(CYCLE_JITTER_GRACE);

        let mut last = last_cycle.lock().unwrap();
        if let Some(prev) = *last {
            if prev.elapsed() < min_gap {
                debug!("analysis: tick arrived early, skipping cycle");
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }

    /// One analysis pass over all symbols. A classifier failure aborts the
    /// cycle (worker goes to error state); thin histories are just skipped.
    async fn run_cycle(
        settings: &Mutex<AnalysisSettings>,
        classifier: &dyn SignalClassifier,
        store: &BarStore,
        state: &AgentState,
        outbox: &mpsc::Sender<Event>,
    ) -> Result<(), AgentError> {
        let (symbols, bar_window, min_bars) = {
            let s = settings.lock().unwrap();
            (s.symbols.clone(), s.bar_window, s.min_bars)
        };

        for symbol in &symbols {
            let bars = store.recent(symbol, bar_window);
            if bars.len() < min_bars {
                debug!(
                    "analysis: {symbol} has {} bars, need {min_bars}, skipping",
                    bars.len()
                );
                continue;
            }

            let annotated = indicators::attach_moving_averages(
                &patterns::annotate(&bars),
                BOLLINGER_PERIOD,
            );
            let bundle = IndicatorBundle::compute(&annotated);

            let Some(verdict) = classifier.classify(symbol, &annotated, &bundle).await? else {
                continue;
            };

            let sentiment = match verdict.action {
                TradeAction::Buy => "bullish",
                TradeAction::Sell => "bearish",
            };
            let signal = TradeSignal {
                symbol: symbol.clone(),
                action: verdict.action,
                price: verdict.price,
                confidence: verdict.confidence,
                timestamp: verdict.timestamp,
                source: SignalSource::Analysis,
                detail: Some(SignalDetail {
                    sentiment: sentiment.to_string(),
                    key_events: Vec::new(),
                    reasoning: verdict.reasoning,
                    impact: None,
                }),
            };

            info!(
                "analysis: {symbol} {:?} @ {:.2} (confidence {:.2})",
                signal.action, signal.price, signal.confidence
            );
            emit(state.name(), outbox, Event::Signal(signal)).await;
        }

        Ok(())
    }
}
