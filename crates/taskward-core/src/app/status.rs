//! Status views: health and metrics snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::registry::TaskCounts;

/// Liveness summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    /// Registry size at the instant of the call.
    pub tasks_count: usize,
}

impl Health {
    pub fn healthy(tasks_count: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            tasks_count,
        }
    }
}

/// Point-in-time metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Records currently in the registry, per status.
    pub counts: TaskCounts,
    /// Tasks that ever reached Completed (survives eviction).
    pub completed_total: u64,
    /// Tasks that ever reached Failed (survives eviction).
    pub failed_total: u64,
    /// Gate permits currently held.
    pub in_flight: usize,
    pub max_concurrent_tasks: usize,
    pub uptime_secs: f64,
}

/// Cumulative outcome counters.
#[derive(Debug, Default)]
pub struct TaskStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl TaskStats {
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_outcomes() {
        let stats = TaskStats::default();
        stats.record_completed();
        stats.record_completed();
        stats.record_failed();
        assert_eq!(stats.completed(), 2);
        assert_eq!(stats.failed(), 1);
    }

    #[test]
    fn health_serializes_status_and_count() {
        let json = serde_json::to_value(Health::healthy(3)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "healthy", "tasks_count": 3}));
    }
}
