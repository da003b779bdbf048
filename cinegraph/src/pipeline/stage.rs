//! Stage boundaries: bounded channels with a monitor on each side.
//!
//! ```text
//!            Outlet (one clone per upstream worker)
//!   worker ─┐
//!   worker ─┼──► [ bounded channel, capacity C ] ──► Inlet (clone per worker)
//!   worker ─┘            ▲
//!                  BoundaryMonitor: state, high-water mark, stalls
//! ```
//!
//! A boundary leaves `Producing` only when the last [`Outlet`] clone is
//! dropped, so downstream workers keep draining until every upstream worker
//! has finished. It becomes `Closed` once a consumer sees the channel empty
//! and disconnected.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::datasets::Dataset;
use crate::report::BoundaryReport;

// =============================================================================
// Stage
// =============================================================================

/// A stage of a dataset pipeline, used to name failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Source,
    Filter,
    Parse,
    Merge,
    /// The thread driving a whole dataset pipeline.
    Coordinator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Filter => "filter",
            Self::Parse => "parse",
            Self::Merge => "merge",
            Self::Coordinator => "coordinator",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Boundary State
// =============================================================================

/// Lifecycle of one boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryState {
    /// At least one upstream worker may still send.
    Producing,
    /// All upstream workers finished; queued items remain.
    Draining,
    /// Empty and disconnected.
    Closed,
}

impl BoundaryState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Producing,
            1 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

// =============================================================================
// Boundary Monitor
// =============================================================================

/// Observes one channel between two stages.
#[derive(Debug)]
pub struct BoundaryMonitor {
    dataset: Dataset,
    name: &'static str,
    capacity: usize,
    producers: AtomicUsize,
    state: AtomicU8,
    high_water: AtomicUsize,
    sent: AtomicU64,
    stalls: AtomicU64,
}

impl BoundaryMonitor {
    pub fn new(dataset: Dataset, name: &'static str, capacity: usize) -> Self {
        Self {
            dataset,
            name,
            capacity,
            producers: AtomicUsize::new(0),
            state: AtomicU8::new(BoundaryState::Producing as u8),
            high_water: AtomicUsize::new(0),
            sent: AtomicU64::new(0),
            stalls: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> BoundaryState {
        BoundaryState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Deepest queue length observed right after a send.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }

    /// Open the channel behind this monitor.
    pub fn channel<T>(&self) -> (Outlet<'_, T>, Inlet<'_, T>) {
        let (tx, rx) = bounded(self.capacity);
        self.producers.fetch_add(1, Ordering::AcqRel);
        (
            Outlet { tx, monitor: self },
            Inlet { rx, monitor: self },
        )
    }

    pub fn snapshot(&self) -> BoundaryReport {
        BoundaryReport {
            name: self.name.to_string(),
            capacity: self.capacity,
            high_water: self.high_water(),
            sent: self.sent.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            state: self.state(),
        }
    }

    fn record_send(&self, depth: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.high_water.fetch_max(depth, Ordering::Relaxed);
    }

    fn producer_done(&self) {
        if self.producers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.store(BoundaryState::Draining as u8, Ordering::Release);
            debug!(dataset = %self.dataset, boundary = self.name, "boundary draining");
        }
    }

    fn consumer_saw_end(&self) {
        let previous = self.state.swap(BoundaryState::Closed as u8, Ordering::AcqRel);
        if previous != BoundaryState::Closed as u8 {
            debug!(dataset = %self.dataset, boundary = self.name, "boundary closed");
        }
    }
}

// =============================================================================
// Outlet / Inlet
// =============================================================================

/// Sending half of a boundary. Clone one per upstream worker.
pub struct Outlet<'m, T> {
    tx: Sender<T>,
    monitor: &'m BoundaryMonitor,
}

impl<T> Outlet<'_, T> {
    /// Send one item, blocking while the channel is full.
    ///
    /// Returns `false` when every consumer is gone; the caller should stop.
    pub fn send(&self, item: T) -> bool {
        let item = match self.tx.try_send(item) {
            Ok(()) => {
                self.monitor.record_send(self.tx.len());
                return true;
            }
            Err(TrySendError::Full(item)) => {
                self.monitor.stalls.fetch_add(1, Ordering::Relaxed);
                item
            }
            Err(TrySendError::Disconnected(_)) => return false,
        };

        match self.tx.send(item) {
            Ok(()) => {
                self.monitor.record_send(self.tx.len());
                true
            }
            Err(_) => false,
        }
    }
}

impl<T> Clone for Outlet<'_, T> {
    fn clone(&self) -> Self {
        self.monitor.producers.fetch_add(1, Ordering::AcqRel);
        Self {
            tx: self.tx.clone(),
            monitor: self.monitor,
        }
    }
}

impl<T> Drop for Outlet<'_, T> {
    fn drop(&mut self) {
        self.monitor.producer_done();
    }
}

/// Receiving half of a boundary. Clone one per downstream worker.
pub struct Inlet<'m, T> {
    rx: Receiver<T>,
    monitor: &'m BoundaryMonitor,
}

impl<T> Inlet<'_, T> {
    /// Next item, or `None` once the boundary is drained and closed.
    pub fn recv(&self) -> Option<T> {
        match self.rx.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                self.monitor.consumer_saw_end();
                None
            }
        }
    }
}

impl<T> Clone for Inlet<'_, T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            monitor: self.monitor,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_boundary_lifecycle() {
        let monitor = BoundaryMonitor::new(Dataset::Movies, "lines", 4);
        let (outlet, inlet) = monitor.channel::<u32>();
        let second = outlet.clone();

        assert!(outlet.send(1));
        drop(outlet);
        assert_eq!(monitor.state(), BoundaryState::Producing);

        assert!(second.send(2));
        drop(second);
        assert_eq!(monitor.state(), BoundaryState::Draining);

        assert_eq!(inlet.recv(), Some(1));
        assert_eq!(inlet.recv(), Some(2));
        assert_eq!(inlet.recv(), None);
        assert_eq!(monitor.state(), BoundaryState::Closed);
    }

    #[test]
    fn test_high_water_never_exceeds_capacity() {
        let monitor = BoundaryMonitor::new(Dataset::Ratings, "parsed", 8);
        let (outlet, inlet) = monitor.channel::<usize>();

        thread::scope(|s| {
            for worker in 0..4 {
                let outlet = outlet.clone();
                s.spawn(move || {
                    for i in 0..500 {
                        outlet.send(worker * 1000 + i);
                    }
                });
            }
            drop(outlet);

            let mut received = 0;
            while inlet.recv().is_some() {
                received += 1;
            }
            assert_eq!(received, 2000);
        });

        let report = monitor.snapshot();
        assert!(report.high_water <= 8);
        assert!(report.high_water >= 1);
        assert_eq!(report.sent, 2000);
        assert_eq!(report.state, BoundaryState::Closed);
    }

    #[test]
    fn test_send_fails_without_consumers() {
        let monitor = BoundaryMonitor::new(Dataset::TagScores, "accepted", 2);
        let (outlet, inlet) = monitor.channel::<&str>();
        drop(inlet);
        assert!(!outlet.send("orphan"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Merge.to_string(), "merge");
        assert_eq!(Stage::Coordinator.to_string(), "coordinator");
    }
}
