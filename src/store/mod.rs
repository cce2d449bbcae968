//! Partitioned Store Module
//!
//! Implements the capacity-bounded, partitioned in-memory key-value store the
//! harness exercises.
//!
//! ## Core Concepts
//! - **Partitioning**: keys are hashed into a 64-bit space; each partition
//!   owns a contiguous range of it.
//! - **Splitting**: a write pushing a partition's used capacity to `move_cap`
//!   carves the upper half of its range into a fresh partition.
//! - **Hard cap**: a soft-advisory ceiling on the partition count — once
//!   reached, splits stop but writes keep succeeding.
//! - **Cycle budget**: every operation consumes a per-partition budget that
//!   is replenished on a fixed epoch; an uncovered operation is rejected
//!   whole, never partially applied.
//!
//! ## Submodules
//! - **`types`**: ids, lifecycle states, the error taxonomy, configuration.
//! - **`partition`**: a single shard and its atomic mutation discipline.
//! - **`manager`**: routing, the split state machine, budget replenishment.

pub mod manager;
pub mod partition;
pub mod types;
