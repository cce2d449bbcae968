//! Store Client
//!
//! The handle a worker uses to reach the store. Resolution and execution are
//! delegated to the transport; the client's only job is the retry discipline:
//! a `MigrationInProgress` answer means a split raced the operation, so the
//! client backs off and re-issues the same operation (same op id, so the
//! store absorbs any replay) a bounded number of times before surfacing the
//! error. Budget and transport errors are never retried here — that policy
//! belongs to the caller.

use super::transport::Transport;
use crate::store::types::{PutOutcome, StoreError};

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Attempts per operation before `MigrationInProgress` is surfaced.
const MAX_ROUTE_RETRIES: usize = 5;

/// Stateless client handle; holds nothing across calls beyond the transport.
pub struct StoreClient {
    transport: Arc<dyn Transport>,
}

impl StoreClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Writes a record, following a migration transparently if one occurs
    /// mid-operation.
    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<PutOutcome, StoreError> {
        let op_id = Uuid::new_v4().to_string();
        self.with_route_retry(|| self.transport.put(&op_id, key, value.clone()))
            .await
    }

    /// Reads a record; `Ok(None)` for an absent key.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_route_retry(|| self.transport.get(key)).await
    }

    /// Deletes a record; `Ok(false)` for an absent key.
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let op_id = Uuid::new_v4().to_string();
        self.with_route_retry(|| self.transport.delete(&op_id, key))
            .await
    }

    /// Runs one operation, retrying only `MigrationInProgress` with
    /// jittered exponential backoff up to `MAX_ROUTE_RETRIES` attempts.
    async fn with_route_retry<T, F, Fut>(&self, mut issue: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut delay_ms = 10u64;
        let mut attempt = 0;

        loop {
            match issue().await {
                Ok(value) => return Ok(value),
                Err(StoreError::MigrationInProgress(partition)) => {
                    attempt += 1;
                    if attempt == MAX_ROUTE_RETRIES {
                        tracing::warn!(
                            "migration on {} outlasted {} attempts, surfacing",
                            partition,
                            MAX_ROUTE_RETRIES
                        );
                        return Err(StoreError::MigrationInProgress(partition));
                    }
                    tracing::trace!("route to {} stale, re-resolving", partition);
                    let jitter = rand::random::<u64>() % 10;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(200);
                }
                Err(other) => return Err(other),
            }
        }
    }
}
