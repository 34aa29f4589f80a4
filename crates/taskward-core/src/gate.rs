//! ConcurrencyGate - 同時実行数の制限
//!
//! tokio の [`Semaphore`] を使う（permit は FIFO で払い出される）。
//!
//! # 解放
//! - [`GatePermit`] の drop が解放
//! - 保持側がどの経路で抜けても permit はちょうど 1 回返る

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The gate was closed while waiting; no permit was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("concurrency gate closed")]
pub struct GateClosed;

/// Counting limiter shared by all dispatches of one manager.
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Scoped permit. Dropping it is the release.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    /// Stop granting permits; current and future waiters get [`GateClosed`].
    /// Permits already held stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}
