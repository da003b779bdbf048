//! Load progress reporting.
//!
//! The loader never prints. It emits [`LoadEvent`]s to a [`LoadObserver`]:
//!
//! - [`TracingObserver`] forwards events to `tracing` (the default)
//! - [`EventLog`] keeps them in memory, for tests and for the JSON report
//!
//! Observers are shared by every worker thread, so they must be `Sync`.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::datasets::{Dataset, Phase};
use crate::report::DatasetReport;

// =============================================================================
// Events
// =============================================================================

/// Severity of an event, for consumers that do not use `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
}

/// Something that happened during a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoadEvent {
    PhaseStarted {
        phase: Phase,
        datasets: Vec<Dataset>,
    },
    DatasetStarted {
        dataset: Dataset,
        path: PathBuf,
        workers: usize,
        capacity: usize,
    },
    /// One of the first few malformed lines of a dataset.
    RecordSkipped {
        dataset: Dataset,
        line: usize,
        message: String,
    },
    DatasetFinished {
        report: DatasetReport,
    },
    PhaseFinished {
        phase: Phase,
        elapsed_ms: u64,
    },
}

impl LoadEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            Self::RecordSkipped { .. } => EventLevel::Warning,
            Self::DatasetFinished { report } if report.counts.skipped > 0 => EventLevel::Warning,
            _ => EventLevel::Info,
        }
    }
}

// =============================================================================
// Observers
// =============================================================================

/// Receives load events from any thread.
pub trait LoadObserver: Send + Sync {
    fn on_event(&self, event: &LoadEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_event(&self, event: &LoadEvent) {
        match event {
            LoadEvent::PhaseStarted { phase, datasets } => {
                let names: Vec<&str> = datasets.iter().map(|d| d.name()).collect();
                info!(%phase, datasets = ?names, "phase started");
            }
            LoadEvent::DatasetStarted { dataset, path, workers, capacity } => {
                info!(%dataset, path = %path.display(), workers, capacity, "loading");
            }
            LoadEvent::RecordSkipped { dataset, line, message } => {
                warn!(%dataset, line, "skipped record: {message}");
            }
            LoadEvent::DatasetFinished { report } => {
                let c = &report.counts;
                info!(
                    dataset = %report.dataset,
                    read = c.read,
                    rejected = c.rejected,
                    accepted = c.accepted,
                    parsed = c.parsed,
                    skipped = c.skipped,
                    merged = c.merged(),
                    duplicates = c.duplicates,
                    join_misses = c.join_misses,
                    peak_queue = report.peak_queue_depth(),
                    elapsed_ms = report.elapsed_ms,
                    "dataset loaded"
                );
                if c.skipped > 0 {
                    warn!(dataset = %report.dataset, skipped = c.skipped, "malformed lines were skipped");
                }
            }
            LoadEvent::PhaseFinished { phase, elapsed_ms } => {
                info!(%phase, elapsed_ms, "phase finished");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {
    fn on_event(&self, _event: &LoadEvent) {}
}

/// Default number of events an [`EventLog`] keeps.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_000;

/// Records events in memory, keeping the first `capacity` of them.
#[derive(Debug)]
pub struct EventLog {
    events: Mutex<Vec<LoadEvent>>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub fn events(&self) -> Vec<LoadEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reported skipped records of one dataset, as (line, message).
    pub fn skipped(&self, dataset: Dataset) -> Vec<(usize, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                LoadEvent::RecordSkipped { dataset: d, line, message } if *d == dataset => {
                    Some((*line, message.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadObserver for EventLog {
    fn on_event(&self, event: &LoadEvent) {
        let mut events = self.events.lock();
        if events.len() < self.capacity {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(line: usize) -> LoadEvent {
        LoadEvent::RecordSkipped {
            dataset: Dataset::Ratings,
            line,
            message: format!("Line {line}: not a number"),
        }
    }

    #[test]
    fn test_event_log_is_bounded() {
        let log = EventLog::with_capacity(2);
        for line in 2..6 {
            log.on_event(&skipped(line));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.skipped(Dataset::Ratings)[1].0, 3);
        assert!(log.skipped(Dataset::Movies).is_empty());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(skipped(7)).unwrap();
        assert_eq!(json["event"], "record_skipped");
        assert_eq!(json["dataset"], "ratings");
        assert_eq!(json["line"], 7);
    }

    #[test]
    fn test_event_levels() {
        assert_eq!(skipped(2).level(), EventLevel::Warning);
        let started = LoadEvent::PhaseStarted {
            phase: Phase::Entities,
            datasets: Phase::Entities.datasets(),
        };
        assert_eq!(started.level(), EventLevel::Info);
    }
}
