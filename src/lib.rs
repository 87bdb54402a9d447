//! Market Sentinel - multi-agent market monitoring and decision engine
//!
//! Four cooperating workers (ticker, analysis, news, trading) run on
//! independent timers under one orchestrator, feeding a technical-indicator
//! engine, a candlestick pattern detector and a risk engine, and applying the
//! resulting signals to a simulated position ledger.

pub mod agents;
pub mod analytics;
pub mod bus;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod events;
pub mod handler;
pub mod orchestrator;
pub mod providers;

// Re-export commonly used types
pub use bus::EventBus;
pub use config::AppConfig;
pub use data::bar::Bar;
pub use events::{Event, TradeAction, TradeExecution, TradeSignal};
pub use orchestrator::{AgentOrchestrator, ConfigPatch, ProviderSet};
