//! The four monitoring/decision workers and their shared scaffolding.
//!
//! Each worker runs on its own timer (no global scheduler): `start()` flips
//! it to active, runs one immediate cycle and arms the timer; `stop()`
//! disarms the timer at the next tick boundary and flips it to inactive. A
//! failing cycle marks the worker errored and surfaces an error event but
//! leaves the timer armed, so the next tick doubles as a self-heal attempt;
//! an errored worker is not a stopped worker.

pub mod analysis;
pub mod news;
pub mod ticker;
pub mod trading;

#[cfg(test)]
mod analysis_tests;
#[cfg(test)]
mod ticker_tests;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::events::{AgentFault, Event};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Inactive,
    Active,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Ticker,
    Analysis,
    News,
    Trading,
}

/// Point-in-time snapshot of one worker, for status aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug)]
struct StateInner {
    status: AgentStatus,
    last_updated: DateTime<Utc>,
}

/// Shared status/last-updated cell for one worker. Cheap to clone into the
/// worker's background task.
#[derive(Clone, Debug)]
pub struct AgentState {
    name: Arc<str>,
    kind: AgentKind,
    inner: Arc<Mutex<StateInner>>,
}

impl AgentState {
    pub fn new(name: &str, kind: AgentKind) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            inner: Arc::new(Mutex::new(StateInner {
                status: AgentStatus::Inactive,
                last_updated: Utc::now(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AgentStatus {
        self.inner.lock().unwrap().status
    }

    /// Sets the status and stamps `last_updated`.
    pub fn set_status(&self, status: AgentStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = status;
        inner.last_updated = Utc::now();
    }

    /// Stamps `last_updated` without changing status.
    pub fn touch(&self) {
        self.inner.lock().unwrap().last_updated = Utc::now();
    }

    pub fn report(&self) -> AgentReport {
        let inner = self.inner.lock().unwrap();
        AgentReport {
            name: self.name.to_string(),
            kind: self.kind,
            status: inner.status,
            last_updated: inner.last_updated,
        }
    }

    /// Marks the worker errored and pushes the fault onto its outbox.
    pub(crate) async fn fail(&self, outbox: &mpsc::Sender<Event>, message: String) {
        error!("{} cycle failed: {message}", self.name);
        self.set_status(AgentStatus::Error);
        let fault = AgentFault {
            agent: self.name.to_string(),
            message,
            timestamp: Utc::now(),
        };
        if outbox.send(Event::Error(fault)).await.is_err() {
            debug!("{}: outbox closed, fault not delivered", self.name);
        }
    }
}

/// Spawns the periodic cycle loop for a worker: one immediate cycle, then
/// one per interval tick. The stop flag is only observed between cycles; a
/// cycle in flight always runs to completion and its effects are simply
/// never used after a stop.
pub(crate) fn spawn_cycle_loop<F, Fut>(
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    mut cycle: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        cycle().await;

        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        timer.tick().await; // the zero-delay first tick

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = timer.tick() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                    cycle().await;
                }
            }
        }
    })
}

/// Sends an event on a worker outbox, logging instead of failing when the
/// orchestrator side is gone.
pub(crate) async fn emit(name: &str, outbox: &mpsc::Sender<Event>, event: Event) {
    if outbox.send(event).await.is_err() {
        debug!("{name}: outbox closed, event dropped");
    }
}
