use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Unique identifier for a partition within the collection.
///
/// Allocated monotonically by the `CapacityManager`, so id order equals
/// creation order. Stable for the partition's lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(pub u64);

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Lifecycle state of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    /// Serving reads and writes normally.
    Active,
    /// Used capacity reached `move_cap` but the hard cap prevents a split.
    /// The partition keeps serving traffic.
    AtCapacity,
    /// A split is moving records out. Operations are bounced back to the
    /// manager for re-routing.
    Migrating,
    /// Drained by an explicit compaction action. Never entered implicitly.
    Retired,
}

/// Error taxonomy of the store.
///
/// `HardCapReached` is deliberately absent: per the admission policy it is an
/// advisory carried alongside a successful write (`PutOutcome`), never an
/// error. An absent key on `get`/`delete` is likewise a normal outcome and is
/// expressed as `Ok(None)` / `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The partition's cycle budget cannot cover the operation. The
    /// operation was rejected without touching any state; the caller should
    /// retry after the next replenishment epoch.
    #[error("partition {0} has insufficient cycle budget")]
    InsufficientBudget(PartitionId),

    /// The key's owning partition changed (or is changing) under the caller.
    /// Transient: re-resolve through the manager and retry.
    #[error("partition {0} is migrating; re-resolve and retry")]
    MigrationInProgress(PartitionId),

    /// Failure in the transport collaborator carrying the operation. Never
    /// retried automatically by the client.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Capacity and budget configuration of a logical collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Used-capacity threshold (storage units) that triggers a split.
    pub move_cap: u64,
    /// Soft ceiling on the total partition count. `None` means unbounded.
    /// Once reached, splits stop but writes keep succeeding.
    pub hard_cap: Option<usize>,
    /// Cycle budget granted to every new partition and restored on each
    /// replenishment epoch.
    pub partition_cycles: u64,
}

/// Result of a successful `put`.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    /// Partition that absorbed the write.
    pub partition: PartitionId,
    /// Set when the write pushed the partition past `move_cap` and a new
    /// partition was created.
    pub split: Option<PartitionId>,
    /// Advisory: the write succeeded but the collection is at its hard cap,
    /// so no further split will occur.
    pub hard_cap_reached: bool,
}

impl PutOutcome {
    pub(crate) fn plain(partition: PartitionId) -> Self {
        Self {
            partition,
            split: None,
            hard_cap_reached: false,
        }
    }
}

/// Flat cycle cost charged for every operation.
pub const CYCLES_PER_OP: u64 = 1_000;
/// Additional cycle cost per storage unit written.
pub const CYCLES_PER_UNIT: u64 = 1_000;

/// Size of a record in storage units.
pub fn record_size(key: &str, value: &[u8]) -> u64 {
    (key.len() + value.len()) as u64
}

/// Deterministic position of a key in the routing hash space.
pub fn key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
