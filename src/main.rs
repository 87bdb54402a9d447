use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use market_sentinel::events::Event;
use market_sentinel::orchestrator::{AgentOrchestrator, ProviderSet};
use market_sentinel::providers::sim::{MomentumClassifier, QuietNewsFeed, RandomWalkFeed};
use market_sentinel::providers::MemoryRunStateStore;
use market_sentinel::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Market Sentinel...");

    let config = AppConfig::load();
    info!("Loaded configuration: {config:?}");

    // Simulated collaborators; the real deployment injects HTTP-backed ones
    // from the service layer.
    let providers = ProviderSet {
        price: Arc::new(RandomWalkFeed::default()),
        classifier: Arc::new(MomentumClassifier::default()),
        news: Arc::new(QuietNewsFeed),
    };

    let orchestrator = Arc::new(AgentOrchestrator::new(&config, providers));
    orchestrator.set_state_store(Arc::new(MemoryRunStateStore::new()));

    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Price(bar) => {
                    info!("price {} {:.2} vol {}", bar.symbol, bar.close, bar.volume)
                }
                Event::Signal(signal) => info!(
                    "signal {} {:?} @ {:.2} ({:?}, confidence {:.2})",
                    signal.symbol, signal.action, signal.price, signal.source, signal.confidence
                ),
                Event::Execution(exec) => info!(
                    "executed {:?} {} @ {:.2}, position now {}",
                    exec.action, exec.symbol, exec.price, exec.quantity
                ),
                Event::Error(fault) => error!("{} fault: {}", fault.agent, fault.message),
            }
        }
    });

    orchestrator.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    orchestrator.stop().await?;

    info!(
        "final portfolio value: {:.2} ({} open positions)",
        orchestrator.portfolio_value(),
        orchestrator.positions().len()
    );
    Ok(())
}
