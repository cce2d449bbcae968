//! Partition Capacity Manager
//!
//! Owns the set of partitions of a logical collection and the routing table
//! mapping the key hash space onto them. All membership changes (splits,
//! retirement) funnel through this component so the capacity invariants are
//! enforced in one place.
//!
//! ## Responsibilities
//! - **Routing**: resolving a key to its owning partition; clients only read
//!   the routing table, only the manager mutates it.
//! - **Splitting**: when a write pushes a partition's used capacity to
//!   `move_cap`, carving the upper half of its hash range into a fresh
//!   partition — unless the collection already holds `hard_cap` partitions,
//!   in which case the write still succeeds and an advisory is reported.
//! - **Budget replenishment**: restoring every partition's cycle budget to
//!   `partition_cycles` on a fixed epoch, independently per partition.
//! - **Idempotency**: absorbing replayed operation ids so a retried mutation
//!   is never double-applied.

use super::partition::Partition;
use super::types::*;

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// The admission/capacity state machine for one collection.
pub struct CapacityManager {
    config: CollectionConfig,
    /// All partition handles, keyed by id.
    partitions: DashMap<PartitionId, Arc<Partition>>,
    /// Hash-range start -> owning partition. Reads resolve keys; writes are
    /// manager-only and serialize splits globally.
    routing: RwLock<BTreeMap<u64, PartitionId>>,
    /// Operation ids already applied, for idempotent retries.
    processed_ops: DashMap<String, u64>,
    next_id: AtomicU64,
    epoch: AtomicU64,
    hard_cap_warned: AtomicBool,
}

impl CapacityManager {
    /// Creates a collection with a single partition owning the whole hash
    /// space.
    pub fn new(config: CollectionConfig) -> Arc<Self> {
        let first = PartitionId(0);
        let partitions = DashMap::new();
        partitions.insert(
            first,
            Arc::new(Partition::new(first, 0, u64::MAX, config.partition_cycles)),
        );

        let mut routing = BTreeMap::new();
        routing.insert(0u64, first);

        Arc::new(Self {
            config,
            partitions,
            routing: RwLock::new(routing),
            processed_ops: DashMap::new(),
            next_id: AtomicU64::new(1),
            epoch: AtomicU64::new(0),
            hard_cap_warned: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Resolves a key to its owning partition via the routing table.
    pub fn resolve(&self, key: &str) -> Result<Arc<Partition>, StoreError> {
        let hash = key_hash(key);
        let routing = self.read_routing();
        let (_, id) = routing
            .range(..=hash)
            .next_back()
            .expect("routing table covers the full hash space");

        match self.partitions.get(id) {
            Some(partition) => Ok(partition.clone()),
            // Routing entry observed mid-update; transient.
            None => Err(StoreError::MigrationInProgress(*id)),
        }
    }

    /// Inserts or overwrites a record, splitting the target partition if the
    /// write pushes it past `move_cap`.
    pub fn put(&self, op_id: &str, key: &str, value: Vec<u8>) -> Result<PutOutcome, StoreError> {
        let partition = self.resolve(key)?;

        if self.is_processed(op_id) {
            tracing::debug!("put {} already applied, absorbing replay", op_id);
            return Ok(PutOutcome::plain(partition.id()));
        }

        let used = partition.put(key, value)?;
        self.mark_processed(op_id);

        if used >= self.config.move_cap {
            return Ok(self.maybe_split(&partition));
        }
        Ok(PutOutcome::plain(partition.id()))
    }

    /// Looks up a record. An absent key is the normal `Ok(None)` outcome.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let partition = self.resolve(key)?;
        partition.get(key)
    }

    /// Removes a record. Returns `Ok(false)` for an absent key.
    pub fn delete(&self, op_id: &str, key: &str) -> Result<bool, StoreError> {
        let partition = self.resolve(key)?;

        if self.is_processed(op_id) {
            // The original delete already adjusted used_capacity; replaying
            // it must not decrement twice.
            tracing::debug!("delete {} already applied, absorbing replay", op_id);
            return Ok(true);
        }

        let removed = partition.delete(key)?;
        self.mark_processed(op_id);
        Ok(removed)
    }

    /// Attempts to split `source` after a threshold crossing.
    ///
    /// Takes the routing write lock first, which serializes splits across the
    /// collection and keeps the partition count check and the route insertion
    /// atomic with respect to other splits.
    fn maybe_split(&self, source: &Arc<Partition>) -> PutOutcome {
        let mut routing = self.write_routing();

        if let Some(cap) = self.config.hard_cap {
            if routing.len() >= cap {
                source.mark_at_capacity();
                if !self.hard_cap_warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        "hard cap of {} partitions reached; {} stays at capacity, splits suspended",
                        cap,
                        source.id()
                    );
                } else {
                    tracing::debug!("hard cap breach on {}", source.id());
                }
                return PutOutcome {
                    partition: source.id(),
                    split: None,
                    hard_cap_reached: true,
                };
            }
        }

        let Some(payload) = source.split_upper(self.config.move_cap) else {
            // A concurrent split already relieved the pressure, or the range
            // cannot be halved further.
            return PutOutcome::plain(source.id());
        };

        let new_id = PartitionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let moved = payload.records.len();
        let new_partition = Arc::new(Partition::with_records(
            new_id,
            payload.hash_lo,
            payload.hash_hi,
            self.config.partition_cycles,
            payload.records,
            payload.moved_units,
        ));

        self.partitions.insert(new_id, new_partition);
        routing.insert(payload.hash_lo, new_id);

        tracing::info!(
            "split {} -> {} ({} records / {} units moved, {} partitions total)",
            source.id(),
            new_id,
            moved,
            payload.moved_units,
            routing.len()
        );

        PutOutcome {
            partition: source.id(),
            split: Some(new_id),
            hard_cap_reached: false,
        }
    }

    /// Explicit compaction hook: retires a drained partition. Returns `false`
    /// if the partition still holds records or does not exist. The routing
    /// entry stays in place; operations landing on a retired partition bounce
    /// back to the caller for re-resolution.
    pub fn retire(&self, id: PartitionId) -> bool {
        let Some(partition) = self.partitions.get(&id) else {
            return false;
        };
        if partition.record_count() > 0 {
            return false;
        }
        partition.mark_retired();
        tracing::info!("retired empty partition {}", id);
        true
    }

    // --- Budget replenishment ---

    /// Restores every partition's cycle budget to `partition_cycles` and
    /// advances the epoch counter. Independent per partition; no global
    /// coordination with in-flight operations is required.
    pub fn replenish_all(&self) {
        for entry in self.partitions.iter() {
            entry.value().replenish(self.config.partition_cycles);
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!("cycle budgets replenished (epoch {})", epoch);
    }

    /// Spawns the background task that replenishes budgets every `every`.
    /// The caller owns the handle and aborts it when the run ends.
    pub fn spawn_replenisher(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let manager = self;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick fires immediately; skip it so epoch 1 lands one
            // full interval into the run.
            interval.tick().await;
            loop {
                interval.tick().await;
                manager.replenish_all();
            }
        })
    }

    /// Number of completed replenishment epochs.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // --- Introspection ---

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Partition ids in creation order.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        let mut ids: Vec<PartitionId> = self.partitions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn partition(&self, id: PartitionId) -> Option<Arc<Partition>> {
        self.partitions.get(&id).map(|e| e.clone())
    }

    pub fn total_records(&self) -> usize {
        self.partitions
            .iter()
            .map(|entry| entry.value().record_count())
            .sum()
    }

    /// Snapshot of one partition's records.
    pub fn dump_partition(&self, id: PartitionId) -> Vec<(String, Vec<u8>)> {
        self.partitions
            .get(&id)
            .map(|entry| entry.value().dump())
            .unwrap_or_default()
    }

    // --- Idempotency bookkeeping ---

    fn is_processed(&self, op_id: &str) -> bool {
        self.processed_ops.contains_key(op_id)
    }

    fn mark_processed(&self, op_id: &str) {
        if self.processed_ops.len() > 10_000 {
            self.processed_ops.clear();
        }
        self.processed_ops.insert(op_id.to_string(), now_ms());
    }

    fn read_routing(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<u64, PartitionId>> {
        self.routing.read().expect("routing table lock poisoned")
    }

    fn write_routing(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<u64, PartitionId>> {
        self.routing.write().expect("routing table lock poisoned")
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
