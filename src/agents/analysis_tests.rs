//! Unit tests for the analysis worker: warm-up skips, verdict-to-signal
//! mapping, error handling and the jitter guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::mpsc;

use crate::agents::analysis::{AnalysisAgent, AnalysisSettings};
use crate::agents::AgentStatus;
use crate::analytics::indicators::IndicatorBundle;
use crate::data::bar::Bar;
use crate::data::store::BarStore;
use crate::error::ProviderError;
use crate::events::{Event, SignalSource, TradeAction};
use crate::providers::{ClassifierVerdict, ProviderResult, SignalClassifier};

struct ScriptedClassifier {
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptedClassifier {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl SignalClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _symbol: &str,
        bars: &[Bar],
        _indicators: &IndicatorBundle,
    ) -> ProviderResult<Option<ClassifierVerdict>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Unavailable("classifier down".to_string()));
        }
        Ok(Some(ClassifierVerdict {
            action: TradeAction::Buy,
            price: bars.last().map(|b| b.close).unwrap_or_default(),
            confidence: 0.85,
            reasoning: "test verdict".to_string(),
            timestamp: Utc::now(),
        }))
    }
}

fn store_with_bars(symbol: &str, count: usize) -> BarStore {
    let store = BarStore::new(64);
    let t0 = Utc::now() - ChronoDuration::minutes(count as i64);
    for i in 0..count {
        store.push_bar(Bar::new(
            symbol,
            t0 + ChronoDuration::minutes(i as i64),
            100.0 + i as f64,
            101.0 + i as f64,
            99.0 + i as f64,
            100.5 + i as f64,
            10_000,
        ));
    }
    store
}

fn settings(symbols: &[&str]) -> AnalysisSettings {
    AnalysisSettings {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        interval: Duration::from_secs(3600),
        bar_window: 30,
        min_bars: 10,
    }
}

#[tokio::test]
async fn immediate_cycle_turns_verdicts_into_signals() {
    let classifier = Arc::new(ScriptedClassifier::new(false));
    let store = store_with_bars("AAPL", 20);
    let (tx, mut rx) = mpsc::channel(16);
    let agent = AnalysisAgent::new(settings(&["AAPL"]), classifier.clone(), store, tx);

    agent.start().unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        Event::Signal(signal) => {
            assert_eq!(signal.symbol, "AAPL");
            assert_eq!(signal.action, TradeAction::Buy);
            assert_eq!(signal.source, SignalSource::Analysis);
            assert_eq!(signal.confidence, 0.85);
            let detail = signal.detail.expect("analysis signals carry detail");
            assert_eq!(detail.sentiment, "bullish");
            assert_eq!(detail.reasoning, "test verdict");
        }
        other => panic!("expected signal, got {other:?}"),
    }

    assert_eq!(agent.report().status, AgentStatus::Active);
    agent.stop().unwrap();
}

#[tokio::test]
async fn thin_history_is_skipped_without_a_classifier_call() {
    let classifier = Arc::new(ScriptedClassifier::new(false));
    let store = store_with_bars("AAPL", 9); // below the 10-bar floor
    let (tx, mut rx) = mpsc::channel(16);
    let agent = AnalysisAgent::new(settings(&["AAPL"]), classifier.clone(), store, tx);

    agent.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(agent.report().status, AgentStatus::Active);
    agent.stop().unwrap();
}

#[tokio::test]
async fn classifier_failure_faults_the_worker_but_keeps_the_timer() {
    let classifier = Arc::new(ScriptedClassifier::new(true));
    let store = store_with_bars("AAPL", 20);
    let (tx, mut rx) = mpsc::channel(16);

    let agent = AnalysisAgent::new(
        AnalysisSettings {
            symbols: vec!["AAPL".to_string()],
            interval: Duration::from_secs(1),
            bar_window: 30,
            min_bars: 10,
        },
        classifier.clone(),
        store,
        tx,
    );

    agent.start().unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        Event::Error(fault) => assert_eq!(fault.agent, "analysis"),
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(agent.report().status, AgentStatus::Error);

    // the timer stays armed: the next tick tries again
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(classifier.calls.load(Ordering::SeqCst) >= 2);

    agent.stop().unwrap();
    assert_eq!(agent.report().status, AgentStatus::Inactive);
}

#[test]
fn jitter_guard_skips_early_ticks_but_not_the_first() {
    let last_cycle = Mutex::new(None);
    let settings = Mutex::new(AnalysisSettings {
        symbols: Vec::new(),
        interval: Duration::from_secs(10),
        bar_window: 30,
        min_bars: 10,
    });

    // first call always runs
    assert!(AnalysisAgent::should_run(&last_cycle, &settings));

    // a tick right after the previous cycle is jitter
    assert!(!AnalysisAgent::should_run(&last_cycle, &settings));

    // a tick a full interval later is real
    *last_cycle.lock().unwrap() = Some(Instant::now() - Duration::from_secs(11));
    assert!(AnalysisAgent::should_run(&last_cycle, &settings));

    // within (interval - 1s) of the previous: still jitter
    *last_cycle.lock().unwrap() = Some(Instant::now() - Duration::from_secs(5));
    assert!(!AnalysisAgent::should_run(&last_cycle, &settings));
}
