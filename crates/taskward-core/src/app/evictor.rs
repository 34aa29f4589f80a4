//! Evictor - 古い / 上限超過の終端レコードの回収
//!
//! # フロー
//! 1. 保持期間が設定されていれば、`completed_at` が期間より古い終端レコードを削除
//! 2. まだ `max_tasks` を超えていれば、古い終端レコードから削除
//!    （`created_at` 順、同時刻は挿入順）。収まるか終端レコードが尽きるまで
//!
//! Pending / Running は対象外。逼迫時は実行中の仕事を捨てずに上限を超過する。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ManagerConfig;
use crate::domain::TaskId;
use crate::ports::Clock;
use crate::registry::{RecordMap, TaskRegistry};

/// What to evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// `None` disables time-based eviction.
    pub retention: Option<TimeDelta>,
    pub max_tasks: usize,
}

impl EvictionPolicy {
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            retention: config.retention(),
            max_tasks: config.max_tasks_count,
        }
    }
}

/// Records removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Removed because their retention window elapsed.
    pub expired: usize,
    /// Removed to bring the registry under `max_tasks`.
    pub overflow: usize,
}

impl EvictionReport {
    pub fn total(&self) -> usize {
        self.expired + self.overflow
    }
}

/// Apply `policy` to `records` in place.
pub fn sweep_records(
    records: &mut RecordMap,
    policy: &EvictionPolicy,
    now: DateTime<Utc>,
) -> EvictionReport {
    let mut report = EvictionReport::default();

    if let Some(retention) = policy.retention {
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now, retention));
        report.expired = before - records.len();
    }

    if records.len() > policy.max_tasks {
        let excess = records.len() - policy.max_tasks;

        // Stable sort keeps insertion order among equal `created_at`.
        let mut candidates: Vec<(DateTime<Utc>, TaskId)> = records
            .values()
            .filter(|r| r.is_terminal())
            .map(|r| (r.created_at, r.id))
            .collect();
        candidates.sort_by_key(|(created_at, _)| *created_at);

        let doomed: HashSet<TaskId> = candidates
            .into_iter()
            .take(excess)
            .map(|(_, id)| id)
            .collect();
        if !doomed.is_empty() {
            records.retain(|id, _| !doomed.contains(id));
            report.overflow = doomed.len();
        }
    }

    report
}

/// Sweeps one registry with a fixed policy.
pub struct Evictor {
    registry: Arc<TaskRegistry>,
    policy: EvictionPolicy,
    clock: Arc<dyn Clock>,
}

impl Evictor {
    pub fn new(registry: Arc<TaskRegistry>, policy: EvictionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// One sweep, atomic with respect to record transitions.
    pub async fn sweep(&self) -> EvictionReport {
        let now = self.clock.now();
        let policy = self.policy;
        let report = self
            .registry
            .with_records(|records| sweep_records(records, &policy, now))
            .await;

        if report.total() > 0 {
            tracing::info!(
                expired = report.expired,
                overflow = report.overflow,
                "evicted terminal tasks"
            );
        } else {
            tracing::trace!("eviction sweep found nothing to remove");
        }
        report
    }
}

/// Cleanup loop handle.
/// - `request_shutdown()` で実行中の sweep の後にループが止まる
/// - `shutdown_and_join()` で終了まで待てる
pub struct CleanupHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl CleanupHandle {
    /// Spawn a loop that sweeps every `period`, starting one period from now.
    pub fn spawn(evictor: Arc<Evictor>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(cleanup_loop(evictor, period, shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            tracing::warn!(error = %err, "cleanup loop ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

async fn cleanup_loop(
    evictor: Arc<Evictor>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(period_secs = period.as_secs(), "cleanup loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped: nobody can stop us any more, so stop now
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                evictor.sweep().await;
            }
        }
    }
    tracing::debug!("cleanup loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskFailure, TaskOptions, TaskRecord, TaskStatus, Transition};
    use crate::ports::{FixedClock, SystemClock, UlidGenerator};
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn id_gen() -> UlidGenerator<SystemClock> {
        UlidGenerator::new(SystemClock)
    }

    fn insert(
        records: &mut RecordMap,
        created_at: DateTime<Utc>,
        status: TaskStatus,
        finished_at: DateTime<Utc>,
    ) -> TaskId {
        use crate::ports::IdGenerator;
        let id = id_gen().generate_task_id();
        let mut record = TaskRecord::new(id, "in".into(), TaskOptions::new(), created_at);
        if status != TaskStatus::Pending {
            record.apply(Transition::Start, created_at).unwrap();
        }
        match status {
            TaskStatus::Completed => record.apply(Transition::Complete(json!(1)), finished_at).unwrap(),
            TaskStatus::Failed => record
                .apply(Transition::Fail(TaskFailure::execution("x")), finished_at)
                .unwrap(),
            _ => {}
        }
        records.insert(id, record);
        id
    }

    fn policy(retention_hours: Option<i64>, max_tasks: usize) -> EvictionPolicy {
        EvictionPolicy {
            retention: retention_hours.map(TimeDelta::hours),
            max_tasks,
        }
    }

    #[test]
    fn expired_terminal_records_are_removed() {
        let mut records = RecordMap::new();
        let old = insert(&mut records, t0(), TaskStatus::Completed, t0());
        let fresh = insert(
            &mut records,
            t0(),
            TaskStatus::Failed,
            t0() + TimeDelta::minutes(90),
        );

        let now = t0() + TimeDelta::hours(2);
        let report = sweep_records(&mut records, &policy(Some(1), 100), now);

        assert_eq!(report, EvictionReport { expired: 1, overflow: 0 });
        assert!(!records.contains_key(&old));
        assert!(records.contains_key(&fresh));
    }

    #[test]
    fn in_flight_records_never_expire() {
        let mut records = RecordMap::new();
        let pending = insert(&mut records, t0(), TaskStatus::Pending, t0());
        let running = insert(&mut records, t0(), TaskStatus::Running, t0());

        let now = t0() + TimeDelta::days(30);
        let report = sweep_records(&mut records, &policy(Some(1), 100), now);

        assert_eq!(report.total(), 0);
        assert!(records.contains_key(&pending));
        assert!(records.contains_key(&running));
    }

    #[test]
    fn zero_retention_disables_expiry() {
        let mut records = RecordMap::new();
        insert(&mut records, t0(), TaskStatus::Completed, t0());

        let now = t0() + TimeDelta::days(365);
        let report = sweep_records(&mut records, &policy(None, 100), now);

        assert_eq!(report.total(), 0);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn overflow_keeps_most_recently_created() {
        let mut records = RecordMap::new();
        let ids: Vec<TaskId> = (0..5)
            .map(|i| {
                let created = t0() + TimeDelta::seconds(i);
                insert(&mut records, created, TaskStatus::Completed, created)
            })
            .collect();

        let report = sweep_records(&mut records, &policy(None, 3), t0());

        assert_eq!(report, EvictionReport { expired: 0, overflow: 2 });
        let kept: Vec<TaskId> = records.keys().copied().collect();
        assert_eq!(kept, ids[2..].to_vec());
    }

    #[test]
    fn overflow_ties_broken_by_insertion_order() {
        let mut records = RecordMap::new();
        let ids: Vec<TaskId> = (0..4)
            .map(|_| insert(&mut records, t0(), TaskStatus::Failed, t0()))
            .collect();

        sweep_records(&mut records, &policy(None, 2), t0());

        let kept: Vec<TaskId> = records.keys().copied().collect();
        assert_eq!(kept, ids[2..].to_vec());
    }

    #[test]
    fn overflow_never_evicts_in_flight_records() {
        let mut records = RecordMap::new();
        let p1 = insert(&mut records, t0(), TaskStatus::Pending, t0());
        let r1 = insert(&mut records, t0(), TaskStatus::Running, t0());
        let done = insert(
            &mut records,
            t0() + TimeDelta::seconds(1),
            TaskStatus::Completed,
            t0(),
        );
        let p2 = insert(&mut records, t0(), TaskStatus::Pending, t0());

        let report = sweep_records(&mut records, &policy(None, 1), t0());

        // only one terminal candidate; the cap stays exceeded
        assert_eq!(report.overflow, 1);
        assert!(!records.contains_key(&done));
        assert_eq!(records.len(), 3);
        for id in [p1, r1, p2] {
            assert!(records.contains_key(&id));
        }
    }

    #[test]
    fn expiry_runs_before_overflow() {
        let mut records = RecordMap::new();
        let expired = insert(&mut records, t0(), TaskStatus::Completed, t0());
        let a = insert(
            &mut records,
            t0() + TimeDelta::hours(3),
            TaskStatus::Completed,
            t0() + TimeDelta::hours(3),
        );
        let b = insert(
            &mut records,
            t0() + TimeDelta::hours(3),
            TaskStatus::Completed,
            t0() + TimeDelta::hours(3),
        );

        let now = t0() + TimeDelta::hours(3);
        let report = sweep_records(&mut records, &policy(Some(1), 2), now);

        assert_eq!(report, EvictionReport { expired: 1, overflow: 0 });
        assert!(!records.contains_key(&expired));
        assert!(records.contains_key(&a));
        assert!(records.contains_key(&b));
    }

    #[tokio::test]
    async fn evictor_sweeps_registry_with_clock() {
        let clock = Arc::new(FixedClock::new(t0()));
        let registry = Arc::new(TaskRegistry::new(Arc::new(id_gen())));
        let id = registry.create("x".into(), TaskOptions::new(), t0()).await;
        registry.update(id, Transition::Start, t0()).await.unwrap();
        registry
            .update(id, Transition::Complete(json!(1)), t0())
            .await
            .unwrap();

        let evictor = Evictor::new(
            Arc::clone(&registry),
            policy(Some(1), 100),
            clock.clone() as Arc<dyn Clock>,
        );

        assert_eq!(evictor.sweep().await.total(), 0);
        clock.advance(TimeDelta::hours(2));
        assert_eq!(evictor.sweep().await.expired, 1);
        assert_eq!(registry.size().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_loop_sweeps_on_interval_and_stops() {
        let clock = Arc::new(FixedClock::new(t0()));
        let registry = Arc::new(TaskRegistry::new(Arc::new(id_gen())));
        let id = registry.create("x".into(), TaskOptions::new(), t0()).await;
        registry.update(id, Transition::Start, t0()).await.unwrap();
        registry
            .update(id, Transition::Complete(json!(1)), t0())
            .await
            .unwrap();
        clock.advance(TimeDelta::hours(2));

        let evictor = Arc::new(Evictor::new(
            Arc::clone(&registry),
            policy(Some(1), 100),
            clock.clone() as Arc<dyn Clock>,
        ));
        let handle = CleanupHandle::spawn(evictor, Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(registry.size().await, 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(registry.size().await, 0);

        handle.shutdown_and_join().await;
    }
}
