//! Integration tests: the orchestrated pipeline from price samples to
//! executed trades, and the standalone handler facade.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use market_sentinel::agents::AgentStatus;
use market_sentinel::analytics::indicators::IndicatorBundle;
use market_sentinel::data::bar::Bar;
use market_sentinel::events::{Event, SignalSource, TradeAction, TradeSignal};
use market_sentinel::handler::AgentHandler;
use market_sentinel::orchestrator::{AgentOrchestrator, ProviderSet};
use market_sentinel::providers::sim::QuietNewsFeed;
use market_sentinel::providers::{
    ClassifierVerdict, MemoryRunStateStore, PriceFeed, ProviderResult, SignalClassifier,
};
use market_sentinel::AppConfig;

/// Deterministic upward price drift.
struct DriftingFeed;

#[async_trait]
impl PriceFeed for DriftingFeed {
    async fn fetch_price(&self, symbol: &str) -> ProviderResult<Bar> {
        let close = 100.0;
        Ok(Bar::new(
            symbol,
            Utc::now(),
            close,
            close + 1.0,
            close - 1.0,
            close,
            25_000,
        ))
    }
}

/// Always finds a confident buy once any bars exist.
struct EagerClassifier;

#[async_trait]
impl SignalClassifier for EagerClassifier {
    async fn classify(
        &self,
        _symbol: &str,
        bars: &[Bar],
        _indicators: &IndicatorBundle,
    ) -> ProviderResult<Option<ClassifierVerdict>> {
        let Some(last) = bars.last() else {
            return Ok(None);
        };
        Ok(Some(ClassifierVerdict {
            action: TradeAction::Buy,
            price: last.close,
            confidence: 0.9,
            reasoning: "test classifier".to_string(),
            timestamp: Utc::now(),
        }))
    }
}

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.symbols = vec!["AAPL".to_string()];
    config.ticker.interval_secs = 1;
    config.analysis.interval_secs = 1;
    config.analysis.min_bars = 1;
    config.analysis.bar_window = 10;
    config.news.interval_secs = 3600;
    config
}

#[tokio::test]
async fn price_samples_flow_through_to_an_executed_trade() {
    let orchestrator = AgentOrchestrator::new(
        &fast_config(),
        ProviderSet {
            price: Arc::new(DriftingFeed),
            classifier: Arc::new(EagerClassifier),
            news: Arc::new(QuietNewsFeed),
        },
    );
    orchestrator.set_state_store(Arc::new(MemoryRunStateStore::new()));

    let mut events = orchestrator.subscribe();
    orchestrator.start().await.unwrap();

    // scan the stream until the trade lands
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    let mut executed = None;
    while executed.is_none() {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .expect("no execution within deadline")
            .unwrap();
        if let Event::Execution(exec) = event {
            executed = Some(exec);
        }
    }

    let exec = executed.unwrap();
    assert_eq!(exec.symbol, "AAPL");
    assert_eq!(exec.action, TradeAction::Buy);
    assert!(exec.quantity > 0);

    let positions = orchestrator.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol, "AAPL");
    assert_eq!(positions[0].quantity, exec.quantity);

    orchestrator.stop().await.unwrap();
    assert!(orchestrator
        .reports()
        .iter()
        .all(|r| r.status == AgentStatus::Inactive));
}

#[tokio::test]
async fn handler_runs_a_standalone_trading_worker() {
    let handler = AgentHandler::new(&AppConfig::default());
    let mut events = handler.take_events().unwrap();
    handler.start_trading().unwrap();
    assert_eq!(handler.report().status, AgentStatus::Active);

    // defaults: 100k cash, 5k per-symbol cap
    handler
        .submit_signal(TradeSignal {
            symbol: "MSFT".to_string(),
            action: TradeAction::Buy,
            price: 100.0,
            confidence: 0.9,
            timestamp: Utc::now(),
            source: SignalSource::Analysis,
            detail: None,
        })
        .await;

    let positions = handler.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, 50);
    assert_eq!(handler.cash(), 95_000.0);
    assert_eq!(handler.portfolio_value(), 100_000.0);

    match events.recv().await.unwrap() {
        Event::Execution(exec) => assert_eq!(exec.quantity, 50),
        other => panic!("expected execution, got {other:?}"),
    }

    // liquidate at a profit
    handler
        .submit_signal(TradeSignal {
            symbol: "MSFT".to_string(),
            action: TradeAction::Sell,
            price: 120.0,
            confidence: 0.9,
            timestamp: Utc::now(),
            source: SignalSource::News,
            detail: None,
        })
        .await;

    assert!(handler.positions().is_empty());
    assert_eq!(handler.cash(), 101_000.0);

    match events.recv().await.unwrap() {
        Event::Execution(exec) => {
            assert_eq!(exec.action, TradeAction::Sell);
            // post-trade quantity after a full liquidation
            assert_eq!(exec.quantity, 0);
        }
        other => panic!("expected execution, got {other:?}"),
    }

    handler.stop_trading().unwrap();
    assert_eq!(handler.report().status, AgentStatus::Inactive);
}

#[tokio::test]
async fn portfolio_refresh_through_the_handler() {
    let handler = AgentHandler::new(&AppConfig::default());
    handler.start_trading().unwrap();

    handler
        .submit_signal(TradeSignal {
            symbol: "NVDA".to_string(),
            action: TradeAction::Buy,
            price: 50.0,
            confidence: 0.9,
            timestamp: Utc::now(),
            source: SignalSource::Analysis,
            detail: None,
        })
        .await;
    // 5k cap at 50/share -> 100 shares
    assert_eq!(handler.positions()[0].quantity, 100);

    let bar = Bar::new("NVDA", Utc::now(), 54.0, 56.0, 53.0, 55.0, 10_000);
    let value = handler.update_portfolio_value(&[bar]);

    let position = &handler.positions()[0];
    assert_eq!(position.current_price, 55.0);
    assert_eq!(position.unrealized_pnl, 500.0);
    // 95k cash + 100 shares at 55
    assert_eq!(value, 100_500.0);
}
