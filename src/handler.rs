use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use crate::agents::trading::{Position, PositionLedger, TradingAgent, TradingSettings};
use crate::agents::AgentReport;
use crate::config::AppConfig;
use crate::constants::agents::OUTBOX_CAPACITY;
use crate::data::bar::Bar;
use crate::error::AgentError;
use crate::events::{Event, TradeSignal};

/// Thin façade for call sites that want a single trading worker and direct
/// ledger access without standing up the full orchestrator.
pub struct AgentHandler {
    trading: TradingAgent,
    events_rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl AgentHandler {
    pub fn new(config: &AppConfig) -> Self {
        let (outbox, events_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let trading = TradingAgent::new(
            TradingSettings {
                max_position_size: config.trading.max_position_size,
                min_confidence: config.trading.min_confidence,
            },
            PositionLedger::new(config.trading.initial_cash),
            outbox,
        );
        Self {
            trading,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    pub fn start_trading(&self) -> Result<(), AgentError> {
        info!("handler: starting standalone trading worker");
        self.trading.start()
    }

    pub fn stop_trading(&self) -> Result<(), AgentError> {
        self.trading.stop()
    }

    pub async fn submit_signal(&self, signal: TradeSignal) {
        self.trading.handle_signal(signal).await;
    }

    pub fn positions(&self) -> Vec<Position> {
        self.trading.ledger().positions()
    }

    pub fn cash(&self) -> f64 {
        self.trading.ledger().cash()
    }

    pub fn portfolio_value(&self) -> f64 {
        self.trading.ledger().portfolio_value()
    }

    pub fn update_portfolio_value(&self, bars: &[Bar]) -> f64 {
        self.trading.update_portfolio_value(bars)
    }

    pub fn report(&self) -> AgentReport {
        self.trading.report()
    }

    /// Hands out the execution/error event stream once; later calls return
    /// `None`.
    pub fn take_events(&self) -> Option<mpsc::Receiver<Event>> {
        self.events_rx.lock().unwrap().take()
    }
}
