// =============================================================================
// Market Data - bars, the rolling analysis window, and the data boundary
// =============================================================================
//
// The engine analyses a bounded rolling window of the most recent closed
// bars. Older bars are discarded as new ones arrive, so memory stays flat
// no matter how long the engine runs.
//
// Fetching bars is a collaborator concern behind the [`MarketData`] trait;
// the engine itself never talks to a transport directly.
// =============================================================================

pub mod bridge;

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

/// A single OHLCV bar for a fixed time interval, immutable once closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// ---------------------------------------------------------------------------
// Data boundary
// ---------------------------------------------------------------------------

/// Errors from the market-data boundary.
///
/// Either kind aborts the current cycle; the engine retries on the next
/// bar interval.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("market data unavailable: {0}")]
    Unavailable(String),

    #[error("malformed market data: {0}")]
    Malformed(String),
}

/// Collaborator that supplies closed OHLCV history for a symbol.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch the most recent `count` closed bars, oldest first.
    async fn fetch_window(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, DataError>;
}

// ---------------------------------------------------------------------------
// BarWindow - bounded rolling window
// ---------------------------------------------------------------------------

/// Bounded rolling window of the most recent closed bars (oldest first).
///
/// Pushing beyond `capacity` evicts the oldest bar.
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarWindow {
    /// Create an empty window retaining at most `capacity` bars.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a window from a fetched history, keeping only the newest
    /// `capacity` bars when the input is longer.
    pub fn from_bars(capacity: usize, bars: Vec<Bar>) -> Self {
        let mut window = Self::new(capacity);
        for bar in bars {
            window.push(bar);
        }
        window
    }

    /// Append a closed bar, evicting the oldest when full.
    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The most recent bar, if any.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Iterate bars oldest first.
    pub fn bars(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// High prices, oldest first.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// Low prices, oldest first.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Volumes, oldest first.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(i: i64, close: f64) -> Bar {
        Bar {
            open_time: DateTime::from_timestamp(i * 900, 0).unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn window_is_bounded() {
        let mut window = BarWindow::new(3);
        for i in 0..10 {
            window.push(bar(i, 100.0 + i as f64));
        }
        assert_eq!(window.len(), 3);
        // Oldest bars were evicted; only the newest three remain.
        assert_eq!(window.closes(), vec![107.0, 108.0, 109.0]);
    }

    #[test]
    fn from_bars_keeps_newest() {
        let bars: Vec<Bar> = (0..10).map(|i| bar(i, i as f64)).collect();
        let window = BarWindow::from_bars(4, bars);
        assert_eq!(window.closes(), vec![6.0, 7.0, 8.0, 9.0]);
        assert!((window.last().unwrap().close - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_window() {
        let window = BarWindow::new(5);
        assert!(window.is_empty());
        assert!(window.last().is_none());
        assert!(window.closes().is_empty());
    }

    #[test]
    fn series_accessors_preserve_order() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(i, 10.0 * i as f64)).collect();
        let window = BarWindow::from_bars(10, bars);
        assert_eq!(window.closes(), vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(window.highs().len(), 5);
        assert_eq!(window.lows().len(), 5);
        assert_eq!(window.volumes(), vec![100.0; 5]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = BarWindow::new(0);
        window.push(bar(0, 1.0));
        window.push(bar(1, 2.0));
        assert_eq!(window.len(), 1);
        assert_eq!(window.closes(), vec![2.0]);
    }
}
