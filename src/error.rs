//! Typed errors for the monitoring and decision engine.

use thiserror::Error;

/// Failures surfaced by the injected collaborators (price feed, classifier,
/// news feed, run-state store).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

/// Worker-level failures.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid signal price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("{agent} is already running")]
    AlreadyActive { agent: String },
}

/// Orchestrator lifecycle failures.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("no run-state store injected")]
    MissingStateStore,

    #[error("run-state store failure: {0}")]
    Store(#[source] ProviderError),

    #[error("failed to start {agent}: {source}")]
    StartFailed {
        agent: &'static str,
        #[source]
        source: AgentError,
    },

    #[error("failed to stop {agent}: {source}")]
    StopFailed {
        agent: &'static str,
        #[source]
        source: AgentError,
    },
}
