//! Lifetime counters for a queue instance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot returned by [`CancellableQueue::stats`](crate::CancellableQueue::stats).
///
/// Counters accumulate across every run of the instance; `started_at` and
/// `buffered` describe the current run only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub buffered: usize,
    pub runs_started: u64,
    pub accepted: u64,
    pub rejected_full: u64,
    pub rejected_idle: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    runs_started: AtomicU64,
    accepted: AtomicU64,
    rejected_full: AtomicU64,
    rejected_idle: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    pub(crate) fn run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected_full(&self) {
        self.rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected_idle(&self) {
        self.rejected_idle.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        running: bool,
        started_at: Option<DateTime<Utc>>,
        buffered: usize,
    ) -> QueueStats {
        QueueStats {
            running,
            started_at,
            buffered,
            runs_started: self.runs_started.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_full: self.rejected_full.load(Ordering::Relaxed),
            rejected_idle: self.rejected_idle.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counts() {
        let counters = Counters::default();
        counters.run_started();
        counters.accepted();
        counters.accepted();
        counters.rejected_full();
        counters.completed();
        counters.failed();

        let stats = counters.snapshot(true, None, 1);
        assert!(stats.running);
        assert_eq!(stats.buffered, 1);
        assert_eq!(stats.runs_started, 1);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected_full, 1);
        assert_eq!(stats.rejected_idle, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn serializes_to_json() {
        let stats = Counters::default().snapshot(false, None, 0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["running"], false);
        assert_eq!(json["started_at"], serde_json::Value::Null);
        assert_eq!(json["accepted"], 0);
    }
}
