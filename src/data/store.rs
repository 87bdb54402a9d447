use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::bar::Bar;

/// Bounded in-memory bar history, one ring per symbol.
///
/// Written by the ticker worker, read by the analysis and news workers and by
/// portfolio refresh. Readers get snapshots; the store never hands out live
/// references into the rings.
#[derive(Clone, Debug)]
pub struct BarStore {
    bars: Arc<Mutex<HashMap<String, VecDeque<Bar>>>>,
    limit: usize,
}

impl BarStore {
    pub fn new(limit: usize) -> Self {
        Self {
            bars: Arc::new(Mutex::new(HashMap::new())),
            limit: limit.max(1),
        }
    }

    /// Appends a bar, evicting the oldest once the ring is full. A bar whose
    /// timestamp does not advance past the newest stored bar is dropped,
    /// keeping each series strictly ascending with no duplicate timestamps.
    pub fn push_bar(&self, bar: Bar) {
        let mut map = self.bars.lock().unwrap();
        let queue = map.entry(bar.symbol.clone()).or_default();

        if let Some(last) = queue.back() {
            if bar.timestamp <= last.timestamp {
                return;
            }
        }
        if queue.len() >= self.limit {
            queue.pop_front();
        }
        queue.push_back(bar);
    }

    pub fn latest_bar(&self, symbol: &str) -> Option<Bar> {
        let map = self.bars.lock().unwrap();
        map.get(symbol).and_then(|q| q.back()).cloned()
    }

    pub fn latest_close(&self, symbol: &str) -> Option<f64> {
        self.latest_bar(symbol).map(|b| b.close)
    }

    pub fn bar_history(&self, symbol: &str) -> Vec<Bar> {
        let map = self.bars.lock().unwrap();
        map.get(symbol)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent `n` bars for a symbol, oldest first.
    pub fn recent(&self, symbol: &str, n: usize) -> Vec<Bar> {
        let map = self.bars.lock().unwrap();
        map.get(symbol)
            .map(|q| q.iter().rev().take(n).rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        let map = self.bars.lock().unwrap();
        map.get(symbol).map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }
}
