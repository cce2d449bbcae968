//! Store Transport
//!
//! The boundary between a client and the store. The real deployment would
//! carry operations over an RPC layer; the harness runs in-process, so the
//! default transport delegates straight to the capacity manager. Any failure
//! of the carrier itself must surface as `StoreError::Transport`, distinct
//! from the store's own capacity/budget errors.

use crate::store::manager::CapacityManager;
use crate::store::types::{PutOutcome, StoreError};

use async_trait::async_trait;
use std::sync::Arc;

/// Carries store operations from a client to the collection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn put(&self, op_id: &str, key: &str, value: Vec<u8>) -> Result<PutOutcome, StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn delete(&self, op_id: &str, key: &str) -> Result<bool, StoreError>;
}

/// In-process transport: operations go directly to the capacity manager.
pub struct LocalTransport {
    manager: Arc<CapacityManager>,
}

impl LocalTransport {
    pub fn new(manager: Arc<CapacityManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn put(&self, op_id: &str, key: &str, value: Vec<u8>) -> Result<PutOutcome, StoreError> {
        self.manager.put(op_id, key, value)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.manager.get(key)
    }

    async fn delete(&self, op_id: &str, key: &str) -> Result<bool, StoreError> {
        self.manager.delete(op_id, key)
    }
}
