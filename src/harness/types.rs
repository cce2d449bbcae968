use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recognized harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of concurrent workers. Must be positive.
    pub worker_count: usize,
    /// Operations each worker issues. Zero is a valid smoke run.
    pub operations_per_worker: usize,
    /// Split threshold handed to the collection.
    pub move_cap: u64,
    /// Soft ceiling on partition count; `None` means unbounded.
    pub hard_cap: Option<usize>,
    /// Cycle budget per partition, restored every epoch.
    pub partition_cycles: u64,
    /// Payload size of generated values, in bytes.
    pub value_size: usize,
    /// Length of one budget replenishment epoch.
    pub epoch: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            operations_per_worker: 10_000,
            move_cap: 500_000,
            hard_cap: Some(1_000),
            partition_cycles: 300_000_000_000,
            value_size: 60,
            epoch: Duration::from_millis(100),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be positive");
        }
        if self.move_cap == 0 {
            anyhow::bail!("move_cap must be positive");
        }
        if self.partition_cycles == 0 {
            anyhow::bail!("partition_cycles must be positive");
        }
        if self.hard_cap == Some(0) {
            anyhow::bail!("hard_cap must be positive when set");
        }
        Ok(())
    }
}

/// What one worker does during a run.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Operations to issue.
    pub operations: usize,
    /// Payload size of each written value.
    pub value_size: usize,
    /// Re-read every Nth written key as a consistency probe; 0 disables.
    pub read_check_every: usize,
    /// Wall-clock bound; the worker stops cleanly once elapsed.
    pub deadline: Option<Duration>,
}

impl Workload {
    pub fn puts(operations: usize, value_size: usize) -> Self {
        Self {
            operations,
            value_size,
            read_check_every: 16,
            deadline: None,
        }
    }
}

/// Terminal status of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Success,
    Error,
}

/// The one terminal message a worker delivers to the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub status: WorkerStatus,
    /// Human-readable outcome detail (error text for failed workers).
    pub detail: String,
    /// Operations that completed successfully.
    pub ops_ok: usize,
    /// Errors the worker absorbed or died on.
    pub errors: Vec<String>,
    /// Times the worker waited out a budget epoch before retrying.
    pub budget_stalls: usize,
    /// Hard-cap advisories observed alongside successful writes.
    pub hard_cap_warnings: usize,
    /// Splits this worker's own writes triggered.
    pub splits_triggered: usize,
}

/// Aggregate outcome of a run, after all workers drained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<WorkerReport>,
    pub total_ops: usize,
    pub total_errors: usize,
    pub budget_stalls: usize,
    pub hard_cap_warnings: usize,
    pub splits_observed: usize,
    pub final_partition_count: usize,
    pub final_record_count: usize,
}

impl RunSummary {
    pub fn failed_workers(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == WorkerStatus::Error)
            .count()
    }
}
