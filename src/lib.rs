//! Partition Stress Harness Library
//!
//! This library crate defines the core modules of a load-generation harness
//! that drives concurrent workers against a partitioned, capacity-bounded
//! in-memory key/value store. It serves as the foundation for the binary
//! executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of three loosely coupled subsystems:
//!
//! - **`store`**: The partitioned state layer. Owns the set of partitions of
//!   a logical collection, decides when a partition must split (`move_cap`),
//!   enforces the soft ceiling on total partition count (`hard_cap`), and
//!   manages the per-partition replenishing cycle budget.
//! - **`client`**: The access layer a worker uses to reach the store. Routes
//!   each operation to the owning partition and transparently re-resolves
//!   (with bounded backoff) when a split races the operation.
//! - **`harness`**: The load-generation engine. Spawns N independent workers,
//!   each driving a workload through its own client handle, and aggregates a
//!   per-worker outcome into a run summary.

pub mod client;
pub mod harness;
pub mod store;
