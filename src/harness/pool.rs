//! Worker Pool Implementation
//!
//! Spawns the configured number of independent workers, each driving its own
//! `StoreClient` against the shared collection, and aggregates one terminal
//! report per worker into a run summary.
//!
//! ## Responsibilities
//! - **Spawning**: one tokio task per worker, each with its own client handle.
//! - **Replenishment**: runs the manager's budget replenisher for the
//!   duration of the run and aborts it afterwards.
//! - **Draining**: a failed (or panicked) worker never takes the harness
//!   down; every worker is joined and reported exactly once.

use super::types::*;
use crate::client::store_client::StoreClient;
use crate::client::transport::LocalTransport;
use crate::store::manager::CapacityManager;
use crate::store::types::{CollectionConfig, StoreError};

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Epoch waits per operation before budget exhaustion is considered fatal.
const MAX_BUDGET_RETRIES: usize = 3;

/// The engine that drives a stress run.
pub struct WorkerPool {
    config: HarnessConfig,
    manager: Arc<CapacityManager>,
}

impl WorkerPool {
    pub fn new(config: HarnessConfig) -> Self {
        let manager = CapacityManager::new(CollectionConfig {
            move_cap: config.move_cap,
            hard_cap: config.hard_cap,
            partition_cycles: config.partition_cycles,
        });
        Self { config, manager }
    }

    /// The collection under test, for post-run verification.
    pub fn manager(&self) -> Arc<CapacityManager> {
        self.manager.clone()
    }

    /// Runs all workers to termination and returns the aggregate outcome.
    ///
    /// Returns only once every worker has terminated; worker failures are
    /// recorded, never propagated as harness failures.
    pub async fn run(&self) -> RunSummary {
        tracing::info!(
            "starting {} workers x {} ops (move_cap={}, hard_cap={:?})",
            self.config.worker_count,
            self.config.operations_per_worker,
            self.config.move_cap,
            self.config.hard_cap
        );

        let replenisher = self.manager.clone().spawn_replenisher(self.config.epoch);

        let workload = Workload::puts(self.config.operations_per_worker, self.config.value_size);
        let mut handles = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            let client = StoreClient::new(Arc::new(LocalTransport::new(self.manager.clone())));
            let workload = workload.clone();
            let epoch = self.config.epoch;
            handles.push(tokio::spawn(async move {
                run_worker(worker_id, client, workload, epoch).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (worker_id, handle) in handles.into_iter().enumerate() {
            let report = match handle.await {
                Ok(report) => report,
                // A panicked worker still gets its one report.
                Err(join_err) => {
                    tracing::error!("worker {} panicked: {}", worker_id, join_err);
                    WorkerReport {
                        worker_id,
                        status: WorkerStatus::Error,
                        detail: format!("worker panicked: {}", join_err),
                        ops_ok: 0,
                        errors: vec![join_err.to_string()],
                        budget_stalls: 0,
                        hard_cap_warnings: 0,
                        splits_triggered: 0,
                    }
                }
            };
            match report.status {
                WorkerStatus::Success => {
                    tracing::info!("worker {} finished: {}", report.worker_id, report.detail)
                }
                WorkerStatus::Error => {
                    tracing::error!("worker {} failed: {}", report.worker_id, report.detail)
                }
            }
            reports.push(report);
        }

        replenisher.abort();

        let summary = RunSummary {
            total_ops: reports.iter().map(|r| r.ops_ok).sum(),
            total_errors: reports.iter().map(|r| r.errors.len()).sum(),
            budget_stalls: reports.iter().map(|r| r.budget_stalls).sum(),
            hard_cap_warnings: reports.iter().map(|r| r.hard_cap_warnings).sum(),
            splits_observed: reports.iter().map(|r| r.splits_triggered).sum(),
            final_partition_count: self.manager.partition_count(),
            final_record_count: self.manager.total_records(),
            reports,
        };

        tracing::info!(
            "run complete: {} ops, {} errors, {} splits, {} partitions, {} records",
            summary.total_ops,
            summary.total_errors,
            summary.splits_observed,
            summary.final_partition_count,
            summary.final_record_count
        );

        summary
    }
}

/// The main loop of a single worker.
///
/// Writes a key set disjoint from every other worker's, waiting out budget
/// epochs when the target partition runs dry and probing its own earlier
/// writes for read-your-writes consistency. The first genuinely fatal
/// condition (exhausted retries, transport failure, failed probe) terminates
/// the worker with an error report; the harness keeps running.
pub(crate) async fn run_worker(
    worker_id: usize,
    client: StoreClient,
    workload: Workload,
    epoch: Duration,
) -> WorkerReport {
    tracing::debug!("worker {} started ({} ops)", worker_id, workload.operations);

    let started = Instant::now();
    let mut report = WorkerReport {
        worker_id,
        status: WorkerStatus::Success,
        detail: String::new(),
        ops_ok: 0,
        errors: Vec::new(),
        budget_stalls: 0,
        hard_cap_warnings: 0,
        splits_triggered: 0,
    };

    for op in 0..workload.operations {
        if let Some(deadline) = workload.deadline {
            if started.elapsed() >= deadline {
                tracing::debug!("worker {} hit its deadline after {} ops", worker_id, op);
                break;
            }
        }

        let key = format!("w{}-k{:06}", worker_id, op);
        let value = vec![b'a' + (worker_id % 26) as u8; workload.value_size];

        match put_with_budget_retry(&client, &key, value, epoch, &mut report).await {
            Ok(()) => report.ops_ok += 1,
            Err(err) => {
                report.status = WorkerStatus::Error;
                report.detail = format!("op {} ({}): {}", op, key, err);
                report.errors.push(err.to_string());
                return report;
            }
        }

        if workload.read_check_every > 0 && op % workload.read_check_every == 0 {
            match client.get(&key).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    report.status = WorkerStatus::Error;
                    report.detail = format!("consistency probe lost key {}", key);
                    report.errors.push(report.detail.clone());
                    return report;
                }
                Err(err) => {
                    report.status = WorkerStatus::Error;
                    report.detail = format!("consistency probe on {}: {}", key, err);
                    report.errors.push(err.to_string());
                    return report;
                }
            }
        }
    }

    report.detail = format!("{} ops in {:?}", report.ops_ok, started.elapsed());
    report
}

/// Issues one put, waiting out the replenishment epoch on budget exhaustion
/// up to `MAX_BUDGET_RETRIES` times. Splits and hard-cap advisories observed
/// along the way are tallied on the report.
async fn put_with_budget_retry(
    client: &StoreClient,
    key: &str,
    value: Vec<u8>,
    epoch: Duration,
    report: &mut WorkerReport,
) -> Result<(), StoreError> {
    let mut stalls = 0;

    loop {
        match client.put(key, value.clone()).await {
            Ok(outcome) => {
                if outcome.split.is_some() {
                    report.splits_triggered += 1;
                }
                if outcome.hard_cap_reached {
                    report.hard_cap_warnings += 1;
                }
                return Ok(());
            }
            Err(StoreError::InsufficientBudget(partition)) => {
                stalls += 1;
                report.budget_stalls += 1;
                if stalls > MAX_BUDGET_RETRIES {
                    return Err(StoreError::InsufficientBudget(partition));
                }
                tracing::debug!(
                    "budget dry on {}, waiting out epoch ({}/{})",
                    partition,
                    stalls,
                    MAX_BUDGET_RETRIES
                );
                tokio::time::sleep(epoch).await;
            }
            Err(other) => return Err(other),
        }
    }
}
