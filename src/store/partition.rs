//! Single Partition
//!
//! One logical shard of the collection. Holds the key/value records whose
//! hashes fall inside the partition's owned range, tracks consumed storage
//! units and the remaining cycle budget.
//!
//! ## Responsibilities
//! - **Atomicity**: every mutation updates `records`, `used_capacity` and the
//!   cycle budget together under one lock, or not at all.
//! - **Route validation**: an operation whose key no longer hashes inside the
//!   owned range (a split raced the caller) is bounced with
//!   `MigrationInProgress` so the caller re-resolves.
//! - **Budget accounting**: each operation is charged up front; an operation
//!   the budget cannot cover is rejected without any state change.

use super::types::*;

use std::collections::HashMap;
use std::sync::Mutex;

/// A single partition of the collection.
pub struct Partition {
    id: PartitionId,
    inner: Mutex<PartitionInner>,
}

/// Mutable partition state. All fields move together under the lock, which
/// is what serializes concurrent mutations on one partition.
struct PartitionInner {
    records: HashMap<String, Vec<u8>>,
    used_capacity: u64,
    cycle_budget: u64,
    state: PartitionState,
    /// Inclusive hash range owned by this partition.
    hash_lo: u64,
    hash_hi: u64,
}

/// Records carved out of a partition during a split, together with the
/// range the new partition takes over.
pub(crate) struct SplitPayload {
    pub records: HashMap<String, Vec<u8>>,
    pub moved_units: u64,
    pub hash_lo: u64,
    pub hash_hi: u64,
}

impl Partition {
    /// Creates an empty partition owning `[hash_lo, hash_hi]` with a full
    /// cycle budget.
    pub fn new(id: PartitionId, hash_lo: u64, hash_hi: u64, cycle_budget: u64) -> Self {
        Self::with_records(id, hash_lo, hash_hi, cycle_budget, HashMap::new(), 0)
    }

    /// Creates a partition pre-seeded with records moved in by a split.
    pub(crate) fn with_records(
        id: PartitionId,
        hash_lo: u64,
        hash_hi: u64,
        cycle_budget: u64,
        records: HashMap<String, Vec<u8>>,
        used_capacity: u64,
    ) -> Self {
        Self {
            id,
            inner: Mutex::new(PartitionInner {
                records,
                used_capacity,
                cycle_budget,
                state: PartitionState::Active,
                hash_lo,
                hash_hi,
            }),
        }
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// Inserts or overwrites a record. Returns the used capacity after the
    /// write so the manager can check the split threshold.
    pub fn put(&self, key: &str, value: Vec<u8>) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        self.check_serving(&inner)?;
        self.check_route(&inner, key)?;

        let size = record_size(key, &value);
        let cost = CYCLES_PER_OP + size * CYCLES_PER_UNIT;
        self.charge(&mut inner, cost)?;

        if let Some(old) = inner.records.insert(key.to_string(), value) {
            inner.used_capacity -= record_size(key, &old);
        }
        inner.used_capacity += size;

        Ok(inner.used_capacity)
    }

    /// Looks up a record. An absent key is the normal `Ok(None)` outcome.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut inner = self.lock();
        self.check_serving(&inner)?;
        self.check_route(&inner, key)?;
        self.charge(&mut inner, CYCLES_PER_OP)?;

        Ok(inner.records.get(key).cloned())
    }

    /// Removes a record. Returns `Ok(false)` for an absent key.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        self.check_serving(&inner)?;
        self.check_route(&inner, key)?;
        self.charge(&mut inner, CYCLES_PER_OP)?;

        match inner.records.remove(key) {
            Some(old) => {
                inner.used_capacity -= record_size(key, &old);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Consumes `n` cycles from the budget, rejecting the request outright
    /// (budget untouched) if it would go negative.
    pub fn consume_cycles(&self, n: u64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.charge(&mut inner, n)
    }

    /// Restores the cycle budget to the collection's `partition_cycles`.
    /// Called by the manager on each replenishment epoch.
    pub fn replenish(&self, partition_cycles: u64) {
        self.lock().cycle_budget = partition_cycles;
    }

    // --- Split support (driven by the CapacityManager) ---

    /// Carves the upper half of the owned hash range out of this partition.
    ///
    /// Re-checks the threshold under the lock (a concurrent split may have
    /// already relieved the pressure) and returns `None` when no split is
    /// needed or possible (range can no longer be halved). The whole move
    /// happens under the partition lock, so a racing operation either lands
    /// before the split or observes the shrunken range and re-resolves.
    pub(crate) fn split_upper(&self, move_cap: u64) -> Option<SplitPayload> {
        let mut inner = self.lock();
        if inner.state == PartitionState::Migrating || inner.state == PartitionState::Retired {
            return None;
        }
        if inner.used_capacity < move_cap || inner.hash_lo >= inner.hash_hi {
            return None;
        }

        inner.state = PartitionState::Migrating;
        let mid = inner.hash_lo + (inner.hash_hi - inner.hash_lo) / 2;
        let (hash_lo, hash_hi) = (mid + 1, inner.hash_hi);

        let mut moved = HashMap::new();
        let mut moved_units = 0u64;
        inner.records.retain(|key, value| {
            if key_hash(key) > mid {
                moved_units += record_size(key, value);
                moved.insert(key.clone(), std::mem::take(value));
                false
            } else {
                true
            }
        });

        inner.used_capacity -= moved_units;
        inner.hash_hi = mid;
        inner.state = PartitionState::Active;

        Some(SplitPayload {
            records: moved,
            moved_units,
            hash_lo,
            hash_hi,
        })
    }

    /// Marks the partition as at capacity (hard cap prevented a split).
    /// The partition keeps serving traffic.
    pub(crate) fn mark_at_capacity(&self) {
        let mut inner = self.lock();
        if inner.state == PartitionState::Active {
            inner.state = PartitionState::AtCapacity;
        }
    }

    /// Marks a drained partition as retired. Retired partitions bounce every
    /// operation so callers re-resolve.
    pub(crate) fn mark_retired(&self) {
        self.lock().state = PartitionState::Retired;
    }

    // --- Accessors ---

    pub fn used_capacity(&self) -> u64 {
        self.lock().used_capacity
    }

    pub fn cycle_budget(&self) -> u64 {
        self.lock().cycle_budget
    }

    pub fn state(&self) -> PartitionState {
        self.lock().state
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Inclusive hash range currently owned by this partition.
    pub fn hash_range(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.hash_lo, inner.hash_hi)
    }

    /// Snapshot of all records, for introspection and verification.
    pub fn dump(&self) -> Vec<(String, Vec<u8>)> {
        self.lock()
            .records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // --- Internals ---

    fn lock(&self) -> std::sync::MutexGuard<'_, PartitionInner> {
        self.inner.lock().expect("partition lock poisoned")
    }

    fn check_serving(&self, inner: &PartitionInner) -> Result<(), StoreError> {
        match inner.state {
            PartitionState::Active | PartitionState::AtCapacity => Ok(()),
            PartitionState::Migrating | PartitionState::Retired => {
                Err(StoreError::MigrationInProgress(self.id))
            }
        }
    }

    fn check_route(&self, inner: &PartitionInner, key: &str) -> Result<(), StoreError> {
        let hash = key_hash(key);
        if hash < inner.hash_lo || hash > inner.hash_hi {
            // Stale route: a split moved this key's range out from under the
            // caller between resolve and execute.
            return Err(StoreError::MigrationInProgress(self.id));
        }
        Ok(())
    }

    fn charge(&self, inner: &mut PartitionInner, cost: u64) -> Result<(), StoreError> {
        if inner.cycle_budget < cost {
            return Err(StoreError::InsufficientBudget(self.id));
        }
        inner.cycle_budget -= cost;
        Ok(())
    }
}
