//! IdGenerator port - ID 生成の抽象化
//!
//! `UlidGenerator` はタイムスタンプを [`Clock`] から取る。`FixedClock` の下では
//! 時刻部分が決定的になり、ランダム部で一意性を保つ。

use ulid::Ulid;

use crate::domain::TaskId;
use crate::ports::Clock;

/// Generates task ids. Must be usable from many tasks at once.
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// ULID-based generator.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        TaskId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
