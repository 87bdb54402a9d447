use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::data::store::BarStore;
use crate::error::AgentError;
use crate::events::Event;
use crate::providers::PriceFeed;

use super::{emit, spawn_cycle_loop, AgentKind, AgentReport, AgentState, AgentStatus};

#[derive(Clone, Debug)]
pub struct TickerSettings {
    pub symbols: Vec<String>,
    pub interval: Duration,
}

/// Polls the price feed for every configured symbol and turns samples into
/// stored bars plus price-update events.
pub struct TickerAgent {
    state: AgentState,
    settings: Arc<Mutex<TickerSettings>>,
    feed: Arc<dyn PriceFeed>,
    store: BarStore,
    outbox: mpsc::Sender<Event>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl TickerAgent {
    pub fn new(
        settings: TickerSettings,
        feed: Arc<dyn PriceFeed>,
        store: BarStore,
        outbox: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: AgentState::new("ticker", AgentKind::Ticker),
            settings: Arc::new(Mutex::new(settings)),
            feed,
            store,
            outbox,
            stop_tx: Mutex::new(None),
        }
    }

    pub fn start(&self) -> Result<(), AgentError> {
        let mut stop_slot = self.stop_tx.lock().unwrap();
        if stop_slot.is_some() {
            warn!("ticker already running, start ignored");
            return Ok(());
        }

        let interval = self.settings.lock().unwrap().interval;
        let (stop_tx, stop_rx) = watch::channel(false);
        *stop_slot = Some(stop_tx);

        self.state.set_status(AgentStatus::Active);
        info!("ticker started (interval {interval:?})");

        let state = self.state.clone();
        let settings = self.settings.clone();
        let feed = self.feed.clone();
        let store = self.store.clone();
        let outbox = self.outbox.clone();

        spawn_cycle_loop(interval, stop_rx, move || {
            let state = state.clone();
            let settings = settings.clone();
            let feed = feed.clone();
            let store = store.clone();
            let outbox = outbox.clone();
            async move {
                Self::run_cycle(&state, &settings, feed.as_ref(), &store, &outbox).await;
            }
        });

        Ok(())
    }

    pub fn stop(&self) -> Result<(), AgentError> {
        if let Some(stop_tx) = self.stop_tx.lock().unwrap().take() {
            // A closed receiver means the loop is already gone.
            let _ = stop_tx.send(true);
        }
        self.state.set_status(AgentStatus::Inactive);
        info!("ticker stopped");
        Ok(())
    }

    pub fn report(&self) -> AgentReport {
        self.state.report()
    }

    pub fn set_symbols(&self, symbols: Vec<String>) {
        self.settings.lock().unwrap().symbols = symbols;
    }

    /// Applies from the next `start()`; a running timer keeps its cadence.
    pub fn set_interval(&self, interval: Duration) {
        self.settings.lock().unwrap().interval = interval;
    }

    /// One polling pass: fetch every symbol concurrently, store and emit the
    /// successes. A failed symbol is logged and skipped, never fatal to the
    /// cycle or its siblings.
    async fn run_cycle(
        state: &AgentState,
        settings: &Mutex<TickerSettings>,
        feed: &dyn PriceFeed,
        store: &BarStore,
        outbox: &mpsc::Sender<Event>,
    ) {
        let symbols = settings.lock().unwrap().symbols.clone();

        let fetches = symbols.iter().map(|symbol| feed.fetch_price(symbol));
        let results = join_all(fetches).await;

        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(bar) => {
                    store.push_bar(bar.clone());
                    emit(state.name(), outbox, Event::Price(bar)).await;
                }
                Err(e) => {
                    warn!("ticker: price fetch failed for {symbol}: {e}");
                }
            }
        }

        state.set_status(AgentStatus::Active);
    }
}
