//! Worker Pool Harness Module
//!
//! The load-generation engine: spawns N independent workers, each repeatedly
//! issuing operations through its own `StoreClient` handle against the shared
//! collection, and collects a per-worker outcome.
//!
//! ## Contract
//! - The run returns only once every worker has terminated.
//! - A worker terminating with an error never crashes the harness; the
//!   failure is recorded and the remaining workers are drained.
//! - Each worker's terminal report is delivered exactly once.
//!
//! ## Submodules
//! - **`types`**: configuration, workload descriptor, reports and summary.
//! - **`pool`**: the worker pool and the per-worker operation loop.

pub mod pool;
pub mod types;

#[cfg(test)]
mod tests;
