use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::data::bar::Bar;
use crate::error::AgentError;
use crate::events::{Event, TradeAction, TradeExecution, TradeSignal};

use super::{emit, AgentKind, AgentReport, AgentState, AgentStatus};

/// Current holding for one symbol. At most one position exists per symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    pub average_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug)]
struct LedgerInner {
    cash: f64,
    positions: HashMap<String, Position>,
}

/// Simulated cash-and-positions book.
///
/// Cash and positions live behind one mutex so every trade is a single
/// atomic mutation: there is no observable state where cash moved but the
/// position did not. The trading worker is the only writer; readers get
/// snapshots.
#[derive(Clone, Debug)]
pub struct PositionLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl PositionLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                cash: initial_cash,
                positions: HashMap::new(),
            })),
        }
    }

    pub fn cash(&self) -> f64 {
        self.inner.lock().unwrap().cash
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.inner.lock().unwrap().positions.get(symbol).cloned()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.inner.lock().unwrap().positions.values().cloned().collect()
    }

    /// Cash plus the market value of every position.
    pub fn portfolio_value(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        inner.cash
            + inner
                .positions
                .values()
                .map(|p| p.quantity as f64 * p.current_price)
                .sum::<f64>()
    }

    /// Buys as many whole shares as remaining capacity and cash allow.
    /// Returns the post-trade quantity, or `None` when capacity or cash
    /// floor the share count to zero (nothing is mutated in that case).
    fn buy(&self, symbol: &str, price: f64, max_position_size: f64) -> Option<u64> {
        let mut inner = self.inner.lock().unwrap();

        let exposure = inner
            .positions
            .get(symbol)
            .map(|p| p.quantity as f64 * p.average_price)
            .unwrap_or(0.0);
        let capacity = max_position_size - exposure;
        if capacity <= 0.0 {
            return None;
        }

        let budget = inner.cash.min(capacity);
        let shares = (budget / price).floor() as u64;
        if shares == 0 {
            return None;
        }

        let cost = shares as f64 * price;
        inner.cash -= cost;

        let position = inner
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                quantity: 0,
                average_price: 0.0,
                current_price: price,
                unrealized_pnl: 0.0,
            });

        let old_basis = position.quantity as f64 * position.average_price;
        position.quantity += shares;
        position.average_price = (old_basis + cost) / position.quantity as f64;
        position.current_price = price;
        position.unrealized_pnl =
            (price - position.average_price) * position.quantity as f64;

        Some(position.quantity)
    }

    /// Fully liquidates the position, crediting quantity x price. Returns
    /// the shares sold, or `None` when there is nothing to sell. Partial
    /// sells are not modeled.
    fn sell(&self, symbol: &str, price: f64) -> Option<u64> {
        let mut inner = self.inner.lock().unwrap();

        let quantity = match inner.positions.get(symbol) {
            Some(p) if p.quantity > 0 => p.quantity,
            _ => return None,
        };

        inner.positions.remove(symbol);
        inner.cash += quantity as f64 * price;
        Some(quantity)
    }

    /// Refreshes one symbol's mark price and unrealized P&L.
    pub fn refresh(&self, symbol: &str, price: f64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(position) = inner.positions.get_mut(symbol) {
            position.current_price = price;
            position.unrealized_pnl =
                (price - position.average_price) * position.quantity as f64;
        }
    }
}

#[derive(Clone, Debug)]
pub struct TradingSettings {
    /// Maximum exposure per symbol, in account currency.
    pub max_position_size: f64,
    /// Signals below this confidence are discarded silently.
    pub min_confidence: f64,
}

/// Applies inbound trade signals to the ledger. Does not poll; it only
/// reacts to signals handed to it.
pub struct TradingAgent {
    state: AgentState,
    settings: Arc<Mutex<TradingSettings>>,
    ledger: PositionLedger,
    outbox: mpsc::Sender<Event>,
}

impl TradingAgent {
    pub fn new(
        settings: TradingSettings,
        ledger: PositionLedger,
        outbox: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: AgentState::new("trading", AgentKind::Trading),
            settings: Arc::new(Mutex::new(settings)),
            ledger,
            outbox,
        }
    }

    pub fn start(&self) -> Result<(), AgentError> {
        self.state.set_status(AgentStatus::Active);
        info!("trading started");
        Ok(())
    }

    pub fn stop(&self) -> Result<(), AgentError> {
        self.state.set_status(AgentStatus::Inactive);
        info!("trading stopped");
        Ok(())
    }

    pub fn report(&self) -> AgentReport {
        self.state.report()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn set_max_position_size(&self, max_position_size: f64) {
        self.settings.lock().unwrap().max_position_size = max_position_size;
    }

    pub fn set_min_confidence(&self, min_confidence: f64) {
        self.settings.lock().unwrap().min_confidence = min_confidence;
    }

    /// Applies one signal: BUY up to remaining capacity, SELL liquidates.
    /// Low-confidence signals are dropped without a trace; aborted trades
    /// (no capacity, no cash, nothing to sell) emit nothing.
    pub async fn handle_signal(&self, signal: TradeSignal) {
        let (max_position_size, min_confidence) = {
            let s = self.settings.lock().unwrap();
            (s.max_position_size, s.min_confidence)
        };

        if signal.confidence < min_confidence {
            debug!(
                "trading: {} signal below confidence floor ({:.2} < {min_confidence:.2})",
                signal.symbol, signal.confidence
            );
            return;
        }

        if !signal.price.is_finite() || signal.price <= 0.0 {
            self.state
                .fail(
                    &self.outbox,
                    AgentError::InvalidPrice {
                        symbol: signal.symbol.clone(),
                        price: signal.price,
                    }
                    .to_string(),
                )
                .await;
            return;
        }

        let quantity_after = match signal.action {
            TradeAction::Buy => {
                self.ledger
                    .buy(&signal.symbol, signal.price, max_position_size)
            }
            // A sell leaves no position behind, so the post-trade quantity
            // is always 0.
            TradeAction::Sell => self.ledger.sell(&signal.symbol, signal.price).map(|_| 0),
        };

        let Some(quantity) = quantity_after else {
            debug!(
                "trading: {:?} {} not applied (no capacity or no position)",
                signal.action, signal.symbol
            );
            return;
        };

        self.state.touch();

        // Execution reports carry the position quantity after the trade,
        // not the traded share count. Consumers rely on that reading.
        let execution = TradeExecution {
            symbol: signal.symbol.clone(),
            action: signal.action,
            quantity,
            price: signal.price,
            timestamp: Utc::now(),
        };
        info!(
            "trading: {:?} {} @ {:.2}, position now {} shares, cash {:.2}",
            execution.action,
            execution.symbol,
            execution.price,
            execution.quantity,
            self.ledger.cash()
        );
        emit(self.state.name(), &self.outbox, Event::Execution(execution)).await;
    }

    /// Passive portfolio refresh from a bar batch: re-marks every position
    /// present in the batch and returns the resulting portfolio value.
    /// Never makes a trading decision.
    pub fn update_portfolio_value(&self, bars: &[Bar]) -> f64 {
        for bar in bars {
            self.ledger.refresh(&bar.symbol, bar.close);
        }
        self.ledger.portfolio_value()
    }
}
