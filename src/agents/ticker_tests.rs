//! Unit tests for the ticker worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::agents::ticker::{TickerAgent, TickerSettings};
use crate::agents::AgentStatus;
use crate::data::bar::Bar;
use crate::data::store::BarStore;
use crate::error::ProviderError;
use crate::events::Event;
use crate::providers::{PriceFeed, ProviderResult};

/// Succeeds for every symbol except those named "BAD*".
struct FlakyFeed {
    calls: AtomicUsize,
}

impl FlakyFeed {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for FlakyFeed {
    async fn fetch_price(&self, symbol: &str) -> ProviderResult<Bar> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if symbol.starts_with("BAD") {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(Bar::new(symbol, Utc::now(), 100.0, 101.0, 99.0, 100.5, 42_000))
    }
}

fn ticker(
    symbols: &[&str],
    feed: Arc<FlakyFeed>,
    store: BarStore,
) -> (TickerAgent, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(32);
    let agent = TickerAgent::new(
        TickerSettings {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            interval: Duration::from_secs(3600),
        },
        feed,
        store,
        tx,
    );
    (agent, rx)
}

#[tokio::test]
async fn immediate_cycle_stores_and_emits_bars() {
    let feed = Arc::new(FlakyFeed::new());
    let store = BarStore::new(16);
    let (agent, mut rx) = ticker(&["AAPL", "MSFT"], feed.clone(), store.clone());

    agent.start().unwrap();

    // the immediate cycle emits one price event per symbol
    let mut seen = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            Event::Price(bar) => seen.push(bar.symbol),
            other => panic!("expected price event, got {other:?}"),
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["AAPL", "MSFT"]);
    assert_eq!(store.len("AAPL"), 1);
    assert_eq!(store.len("MSFT"), 1);
    assert_eq!(agent.report().status, AgentStatus::Active);

    agent.stop().unwrap();
    assert_eq!(agent.report().status, AgentStatus::Inactive);
}

#[tokio::test]
async fn failing_symbol_does_not_abort_its_siblings() {
    let feed = Arc::new(FlakyFeed::new());
    let store = BarStore::new(16);
    let (agent, mut rx) = ticker(&["BAD1", "AAPL", "BAD2"], feed.clone(), store.clone());

    agent.start().unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        Event::Price(bar) => assert_eq!(bar.symbol, "AAPL"),
        other => panic!("expected price event, got {other:?}"),
    }

    // all three symbols were attempted; the failures were swallowed
    assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    assert!(store.is_empty("BAD1"));
    assert!(store.is_empty("BAD2"));
    // per-symbol failures never fault the worker
    assert_eq!(agent.report().status, AgentStatus::Active);

    agent.stop().unwrap();
}

#[tokio::test]
async fn double_start_does_not_arm_a_second_timer() {
    let feed = Arc::new(FlakyFeed::new());
    let store = BarStore::new(16);
    let (agent, mut rx) = ticker(&["AAPL"], feed.clone(), store.clone());

    agent.start().unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    let calls_after_first = feed.calls.load(Ordering::SeqCst);

    // second start is ignored: no extra immediate cycle fires
    agent.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(feed.calls.load(Ordering::SeqCst), calls_after_first);

    agent.stop().unwrap();
}

#[tokio::test]
async fn stop_disarms_future_ticks() {
    let feed = Arc::new(FlakyFeed::new());
    let store = BarStore::new(16);
    let (tx, mut rx) = mpsc::channel(32);
    let agent = TickerAgent::new(
        TickerSettings {
            symbols: vec!["AAPL".to_string()],
            interval: Duration::from_millis(100),
        },
        feed.clone(),
        store,
        tx,
    );

    agent.start().unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    agent.stop().unwrap();

    let calls_at_stop = feed.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    // at most one tick that was already in flight may have landed
    assert!(feed.calls.load(Ordering::SeqCst) <= calls_at_stop + 1);
}

#[tokio::test]
async fn symbols_can_change_between_cycles() {
    let feed = Arc::new(FlakyFeed::new());
    let store = BarStore::new(16);
    let (agent, _rx) = ticker(&["AAPL"], feed.clone(), store.clone());

    agent.set_symbols(vec!["NVDA".to_string()]);
    agent.start().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.len("NVDA"), 1);
    assert!(store.is_empty("AAPL"));

    agent.stop().unwrap();
}
