use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::agents::analysis::{AnalysisAgent, AnalysisSettings};
use crate::agents::news::{NewsAgent, NewsSettings};
use crate::agents::ticker::{TickerAgent, TickerSettings};
use crate::agents::trading::{Position, PositionLedger, TradingAgent, TradingSettings};
use crate::agents::AgentReport;
use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::constants::agents::{EVENT_BUS_CAPACITY, OUTBOX_CAPACITY};
use crate::data::store::BarStore;
use crate::error::OrchestratorError;
use crate::events::Event;
use crate::providers::{NewsFeed, PriceFeed, RunStateStore, SignalClassifier};

/// The injected collaborators, bundled once at construction. No globals:
/// every seam the engine needs is handed in here.
pub struct ProviderSet {
    pub price: Arc<dyn PriceFeed>,
    pub classifier: Arc<dyn SignalClassifier>,
    pub news: Arc<dyn NewsFeed>,
}

/// Partial settings update, applied live to the owned workers. `None`
/// fields are left alone. Interval changes take effect when a worker is
/// next started.
#[derive(Debug, Default)]
pub struct ConfigPatch {
    pub symbols: Option<Vec<String>>,
    pub ticker_interval: Option<Duration>,
    pub analysis_interval: Option<Duration>,
    pub news_interval: Option<Duration>,
    pub news_min_confidence: Option<f64>,
    pub max_position_size: Option<f64>,
    pub trading_min_confidence: Option<f64>,
}

/// Owns the four workers, routes their events, and guards lifecycle state.
///
/// Every worker writes to its own outbox channel; a router task per worker
/// forwards those events (in emission order) into the trading worker where
/// the data flow demands it, and re-publishes everything on the external
/// broadcast bus.
pub struct AgentOrchestrator {
    bus: EventBus,
    store: BarStore,
    ticker: Arc<TickerAgent>,
    analysis: Arc<AnalysisAgent>,
    news: Arc<NewsAgent>,
    trading: Arc<TradingAgent>,
    state_store: Mutex<Option<Arc<dyn RunStateStore>>>,
    running: AtomicBool,
    _routers: Vec<JoinHandle<()>>,
}

impl AgentOrchestrator {
    pub fn new(config: &AppConfig, providers: ProviderSet) -> Self {
        let bus = EventBus::new(EVENT_BUS_CAPACITY);
        let store = BarStore::new(config.history_limit);
        let ledger = PositionLedger::new(config.trading.initial_cash);

        let (ticker_tx, ticker_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (analysis_tx, analysis_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (news_tx, news_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (trading_tx, trading_rx) = mpsc::channel(OUTBOX_CAPACITY);

        let ticker = Arc::new(TickerAgent::new(
            TickerSettings {
                symbols: config.symbols.clone(),
                interval: Duration::from_secs(config.ticker.interval_secs),
            },
            providers.price,
            store.clone(),
            ticker_tx,
        ));
        let analysis = Arc::new(AnalysisAgent::new(
            AnalysisSettings {
                symbols: config.symbols.clone(),
                interval: Duration::from_secs(config.analysis.interval_secs),
                bar_window: config.analysis.bar_window,
                min_bars: config.analysis.min_bars,
            },
            providers.classifier,
            store.clone(),
            analysis_tx,
        ));
        let news = Arc::new(NewsAgent::new(
            NewsSettings {
                symbols: config.symbols.clone(),
                interval: Duration::from_secs(config.news.interval_secs),
                min_confidence: config.news.min_confidence,
            },
            providers.news,
            store.clone(),
            news_tx,
        ));
        let trading = Arc::new(TradingAgent::new(
            TradingSettings {
                max_position_size: config.trading.max_position_size,
                min_confidence: config.trading.min_confidence,
            },
            ledger,
            trading_tx,
        ));

        // One router per worker channel keeps per-worker emission order.
        let routers = vec![
            Self::spawn_router("ticker", ticker_rx, trading.clone(), bus.clone()),
            Self::spawn_router("analysis", analysis_rx, trading.clone(), bus.clone()),
            Self::spawn_router("news", news_rx, trading.clone(), bus.clone()),
            Self::spawn_router("trading", trading_rx, trading.clone(), bus.clone()),
        ];

        Self {
            bus,
            store,
            ticker,
            analysis,
            news,
            trading,
            state_store: Mutex::new(None),
            running: AtomicBool::new(false),
            _routers: routers,
        }
    }

    /// Routes one worker's events: price updates re-mark the book, signals
    /// go through the trading worker, and everything is re-published for
    /// external listeners.
    fn spawn_router(
        name: &'static str,
        mut rx: mpsc::Receiver<Event>,
        trading: Arc<TradingAgent>,
        bus: EventBus,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match &event {
                    Event::Price(bar) => {
                        trading.ledger().refresh(&bar.symbol, bar.close);
                    }
                    Event::Signal(signal) => {
                        trading.handle_signal(signal.clone()).await;
                    }
                    Event::Execution(_) | Event::Error(_) => {}
                }
                bus.publish_lossy(event);
            }
            info!("{name} router drained");
        })
    }

    /// Injects the persisted running-flag store. Required before
    /// `start`/`stop`.
    pub fn set_state_store(&self, store: Arc<dyn RunStateStore>) {
        *self.state_store.lock().unwrap() = Some(store);
    }

    fn state_store(&self) -> Result<Arc<dyn RunStateStore>, OrchestratorError> {
        self.state_store
            .lock()
            .unwrap()
            .clone()
            .ok_or(OrchestratorError::MissingStateStore)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts all four workers in the fixed order ticker, news, analysis,
    /// trading. A second start without an intervening stop is a no-op, as
    /// is starting when the persisted flag already reads running. On any
    /// worker failing to start, the orchestrator persists the stopped
    /// state, best-effort stops whatever came up, and returns the failure.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        let store = self.state_store()?;

        if self.running.load(Ordering::SeqCst) {
            info!("orchestrator already running, start ignored");
            return Ok(());
        }
        if store.is_running().await.map_err(OrchestratorError::Store)? {
            info!("persisted state says running, start ignored");
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);

        if let Err(source) = self.ticker.start() {
            return self.abort_start(&store, "ticker", source).await;
        }
        if let Err(source) = self.news.start() {
            return self.abort_start(&store, "news", source).await;
        }
        if let Err(source) = self.analysis.start() {
            return self.abort_start(&store, "analysis", source).await;
        }
        if let Err(source) = self.trading.start() {
            return self.abort_start(&store, "trading", source).await;
        }

        store
            .set_running(true)
            .await
            .map_err(OrchestratorError::Store)?;
        info!("orchestrator started");
        Ok(())
    }

    /// Failure path out of `start`: persist the stopped state, tear down
    /// whatever came up, and surface the original failure.
    async fn abort_start(
        &self,
        store: &Arc<dyn RunStateStore>,
        agent: &'static str,
        source: crate::error::AgentError,
    ) -> Result<(), OrchestratorError> {
        error!("orchestrator start failed at {agent}: {source}");
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = store.set_running(false).await {
            warn!("failed to persist stopped state: {e}");
        }
        if let Err(e) = self.stop_workers() {
            warn!("cleanup stop failed: {e}");
        }
        Err(OrchestratorError::StartFailed { agent, source })
    }

    /// Stops the workers in reverse start order. The stopped state is
    /// persisted even when an individual worker's stop fails, so a later
    /// retry is not blocked by a stale running flag; the first failure is
    /// still returned.
    pub async fn stop(&self) -> Result<(), OrchestratorError> {
        let store = self.state_store()?;

        let stop_result = self.stop_workers();
        self.running.store(false, Ordering::SeqCst);

        store
            .set_running(false)
            .await
            .map_err(OrchestratorError::Store)?;

        stop_result?;
        info!("orchestrator stopped");
        Ok(())
    }

    fn stop_workers(&self) -> Result<(), OrchestratorError> {
        let sequence: [(&'static str, Result<(), _>); 4] = [
            ("trading", self.trading.stop()),
            ("analysis", self.analysis.stop()),
            ("news", self.news.stop()),
            ("ticker", self.ticker.stop()),
        ];

        let mut first_failure = None;
        for (agent, result) in sequence {
            if let Err(source) = result {
                error!("failed to stop {agent}: {source}");
                first_failure.get_or_insert(OrchestratorError::StopFailed { agent, source });
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Applies a partial settings update to the owned workers.
    pub fn update_config(&self, patch: ConfigPatch) {
        if let Some(symbols) = patch.symbols {
            self.ticker.set_symbols(symbols.clone());
            self.analysis.set_symbols(symbols.clone());
            self.news.set_symbols(symbols);
        }
        if let Some(interval) = patch.ticker_interval {
            self.ticker.set_interval(interval);
        }
        if let Some(interval) = patch.analysis_interval {
            self.analysis.set_interval(interval);
        }
        if let Some(interval) = patch.news_interval {
            self.news.set_interval(interval);
        }
        if let Some(min_confidence) = patch.news_min_confidence {
            self.news.set_min_confidence(min_confidence);
        }
        if let Some(max_position_size) = patch.max_position_size {
            self.trading.set_max_position_size(max_position_size);
        }
        if let Some(min_confidence) = patch.trading_min_confidence {
            self.trading.set_min_confidence(min_confidence);
        }
    }

    /// Status snapshot of every worker, in start order.
    pub fn reports(&self) -> Vec<AgentReport> {
        vec![
            self.ticker.report(),
            self.news.report(),
            self.analysis.report(),
            self.trading.report(),
        ]
    }

    pub fn positions(&self) -> Vec<Position> {
        self.trading.ledger().positions()
    }

    pub fn portfolio_value(&self) -> f64 {
        self.trading.ledger().portfolio_value()
    }

    /// External event stream: price updates, signals, executions and worker
    /// faults, in routing order.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn bar_store(&self) -> &BarStore {
        &self.store
    }
}
