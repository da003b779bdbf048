//! Load accounting: per-stage counters and the reports built from them.
//!
//! Workers bump [`StageCounters`] with relaxed atomics; once a pipeline is
//! joined the counters are snapshotted into a [`DatasetReport`]. A full load
//! produces a [`LoadReport`] that serializes to JSON.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datasets::{Dataset, Phase};
use crate::graph::{GraphStats, MergeOutcome};
use crate::pipeline::BoundaryState;

// =============================================================================
// Live Counters
// =============================================================================

/// Counters shared by every worker of one dataset pipeline.
#[derive(Debug, Default)]
pub struct StageCounters {
    pub read: AtomicU64,
    pub rejected: AtomicU64,
    pub accepted: AtomicU64,
    pub parsed: AtomicU64,
    pub skipped: AtomicU64,
    pub inserted: AtomicU64,
    pub updated: AtomicU64,
    pub linked: AtomicU64,
    pub duplicates: AtomicU64,
    pub join_misses: AtomicU64,
}

impl StageCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: MergeOutcome) {
        let counter = match outcome {
            MergeOutcome::Inserted => &self.inserted,
            MergeOutcome::Updated => &self.updated,
            MergeOutcome::Linked => &self.linked,
            MergeOutcome::Duplicate => &self.duplicates,
            MergeOutcome::JoinMiss => &self.join_misses,
        };
        Self::bump(counter);
    }

    /// Snapshot the counters. With no filter stage every read line counts
    /// as accepted.
    pub fn snapshot(&self, filtered: bool) -> RecordCounts {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let read = load(&self.read);
        RecordCounts {
            read,
            rejected: load(&self.rejected),
            accepted: if filtered { load(&self.accepted) } else { read },
            parsed: load(&self.parsed),
            skipped: load(&self.skipped),
            inserted: load(&self.inserted),
            updated: load(&self.updated),
            linked: load(&self.linked),
            duplicates: load(&self.duplicates),
            join_misses: load(&self.join_misses),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Record counts of one dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    /// Data lines read, blank lines included.
    pub read: u64,
    /// Lines dropped by the filter.
    pub rejected: u64,
    /// Lines that passed the filter.
    pub accepted: u64,
    /// Lines turned into typed records.
    pub parsed: u64,
    /// Malformed lines.
    pub skipped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub linked: u64,
    /// Merges that changed nothing because the entity or edge existed.
    pub duplicates: u64,
    /// Relations whose endpoint is not in the graph.
    pub join_misses: u64,
}

impl RecordCounts {
    /// Records that changed the graph.
    pub fn merged(&self) -> u64 {
        self.inserted + self.updated + self.linked
    }
}

/// Snapshot of one stage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryReport {
    pub name: String,
    pub capacity: usize,
    pub high_water: usize,
    pub sent: u64,
    /// Sends that found the channel full and had to block.
    pub stalls: u64,
    pub state: BoundaryState,
}

/// Outcome of one dataset pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub dataset: Dataset,
    pub path: PathBuf,
    pub workers: usize,
    pub counts: RecordCounts,
    pub boundaries: Vec<BoundaryReport>,
    pub elapsed_ms: u64,
}

impl DatasetReport {
    /// Peak queue depth over all boundaries.
    pub fn peak_queue_depth(&self) -> usize {
        self.boundaries.iter().map(|b| b.high_water).max().unwrap_or(0)
    }

    pub fn boundary(&self, name: &str) -> Option<&BoundaryReport> {
        self.boundaries.iter().find(|b| b.name == name)
    }
}

/// Wall time of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub datasets: Vec<Dataset>,
    pub elapsed_ms: u64,
}

/// Outcome of a complete load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workers: usize,
    pub phases: Vec<PhaseReport>,
    pub datasets: Vec<DatasetReport>,
    pub stats: GraphStats,
}

impl LoadReport {
    pub fn dataset(&self, dataset: Dataset) -> Option<&DatasetReport> {
        self.datasets.iter().find(|r| r.dataset == dataset)
    }

    pub fn total_skipped(&self) -> u64 {
        self.datasets.iter().map(|r| r.counts.skipped).sum()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_without_filter_accepts_everything_read() {
        let counters = StageCounters::default();
        for _ in 0..3 {
            StageCounters::bump(&counters.read);
        }
        StageCounters::bump(&counters.skipped);

        let counts = counters.snapshot(false);
        assert_eq!(counts.read, 3);
        assert_eq!(counts.accepted, 3);
        assert_eq!(counts.skipped, 1);

        let filtered = counters.snapshot(true);
        assert_eq!(filtered.accepted, 0);
    }

    #[test]
    fn test_record_outcomes() {
        let counters = StageCounters::default();
        counters.record(MergeOutcome::Inserted);
        counters.record(MergeOutcome::Linked);
        counters.record(MergeOutcome::Linked);
        counters.record(MergeOutcome::JoinMiss);
        counters.record(MergeOutcome::Duplicate);

        let counts = counters.snapshot(false);
        assert_eq!(counts.merged(), 3);
        assert_eq!(counts.join_misses, 1);
        assert_eq!(counts.duplicates, 1);
    }

    #[test]
    fn test_peak_queue_depth() {
        let boundary = |name: &str, high_water| BoundaryReport {
            name: name.to_string(),
            capacity: 16,
            high_water,
            sent: 10,
            stalls: 0,
            state: BoundaryState::Closed,
        };
        let report = DatasetReport {
            dataset: Dataset::Movies,
            path: PathBuf::from("MovieCodes_IMDB.tsv"),
            workers: 2,
            counts: RecordCounts::default(),
            boundaries: vec![boundary("lines", 3), boundary("parsed", 11)],
            elapsed_ms: 5,
        };
        assert_eq!(report.peak_queue_depth(), 11);
        assert_eq!(report.boundary("lines").map(|b| b.high_water), Some(3));
    }
}
