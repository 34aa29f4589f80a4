//! Simulated inference: waits a fixed latency, then echoes the input.
//!
//! Stands in for a model backend in development and tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::{ExecutionError, TaskOptions};
use crate::ports::Executor;

const DEFAULT_LATENCY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    latency: Duration,
}

impl SimulatedExecutor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn run(&self, input: &str, _options: &TaskOptions) -> Result<Value, ExecutionError> {
        tokio::time::sleep(self.latency).await;
        Ok(json!({ "output": format!("Processed input: {input}") }))
    }
}
