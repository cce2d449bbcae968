//! Client Module Tests
//!
//! Validates the retry discipline of `StoreClient` against controlled
//! transports: migration answers are retried with backoff up to the bound,
//! transport failures surface immediately, replays are never double-applied.

#[cfg(test)]
mod tests {
    use crate::client::store_client::StoreClient;
    use crate::client::transport::{LocalTransport, Transport};
    use crate::store::manager::CapacityManager;
    use crate::store::types::*;

    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn local_client(move_cap: u64) -> (Arc<CapacityManager>, StoreClient) {
        let manager = CapacityManager::new(CollectionConfig {
            move_cap,
            hard_cap: None,
            partition_cycles: 1_000_000_000,
        });
        let client = StoreClient::new(Arc::new(LocalTransport::new(manager.clone())));
        (manager, client)
    }

    /// Answers `MigrationInProgress` a fixed number of times before
    /// delegating to the real transport.
    struct StallingTransport {
        inner: LocalTransport,
        stalls_left: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl StallingTransport {
        fn new(manager: Arc<CapacityManager>, stalls: usize) -> Self {
            Self {
                inner: LocalTransport::new(manager),
                stalls_left: AtomicUsize::new(stalls),
                attempts: AtomicUsize::new(0),
            }
        }

        fn stall(&self) -> Option<StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let left = self.stalls_left.load(Ordering::SeqCst);
            if left > 0 {
                self.stalls_left.store(left - 1, Ordering::SeqCst);
                Some(StoreError::MigrationInProgress(PartitionId(0)))
            } else {
                None
            }
        }
    }

    #[async_trait]
    impl Transport for StallingTransport {
        async fn put(
            &self,
            op_id: &str,
            key: &str,
            value: Vec<u8>,
        ) -> Result<PutOutcome, StoreError> {
            match self.stall() {
                Some(err) => Err(err),
                None => self.inner.put(op_id, key, value).await,
            }
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            match self.stall() {
                Some(err) => Err(err),
                None => self.inner.get(key).await,
            }
        }

        async fn delete(&self, op_id: &str, key: &str) -> Result<bool, StoreError> {
            match self.stall() {
                Some(err) => Err(err),
                None => self.inner.delete(op_id, key).await,
            }
        }
    }

    /// Always fails at the carrier level, counting attempts.
    struct BrokenTransport {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Transport for BrokenTransport {
        async fn put(&self, _: &str, _: &str, _: Vec<u8>) -> Result<PutOutcome, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Transport("connection reset".to_string()))
        }

        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Transport("connection reset".to_string()))
        }

        async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Transport("connection reset".to_string()))
        }
    }

    // ============================================================
    // BASIC OPERATIONS
    // ============================================================

    #[tokio::test]
    async fn test_client_put_get_roundtrip() {
        let (_, client) = local_client(1_000_000);

        client.put("book-001", b"rust".to_vec()).await.unwrap();
        let got = client.get("book-001").await.unwrap();

        assert_eq!(got, Some(b"rust".to_vec()));
    }

    #[tokio::test]
    async fn test_client_get_missing_key() {
        let (_, client) = local_client(1_000_000);
        assert_eq!(client.get("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_client_delete() {
        let (_, client) = local_client(1_000_000);

        client.put("key", b"value".to_vec()).await.unwrap();
        assert!(client.delete("key").await.unwrap());
        assert!(!client.delete("key").await.unwrap());
        assert_eq!(client.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_client_roundtrip_across_splits() {
        let (manager, client) = local_client(300);

        for i in 0..80 {
            let key = format!("key-{:03}", i);
            client.put(&key, vec![b'v'; 30]).await.unwrap();
        }

        assert!(manager.partition_count() > 1);
        for i in 0..80 {
            let key = format!("key-{:03}", i);
            assert_eq!(client.get(&key).await.unwrap(), Some(vec![b'v'; 30]));
        }
    }

    // ============================================================
    // RETRY DISCIPLINE
    // ============================================================

    #[tokio::test]
    async fn test_migration_retried_until_it_clears() {
        let manager = CapacityManager::new(CollectionConfig {
            move_cap: 1_000_000,
            hard_cap: None,
            partition_cycles: 1_000_000_000,
        });
        // Three stalls, retry bound is five: the put must converge.
        let transport = Arc::new(StallingTransport::new(manager.clone(), 3));
        let client = StoreClient::new(transport.clone());

        client.put("key", b"value".to_vec()).await.unwrap();

        assert_eq!(transport.attempts.load(Ordering::SeqCst), 4);
        // Applied exactly once despite the retries.
        assert_eq!(manager.total_records(), 1);
    }

    #[tokio::test]
    async fn test_migration_surfaces_after_bounded_attempts() {
        let manager = CapacityManager::new(CollectionConfig {
            move_cap: 1_000_000,
            hard_cap: None,
            partition_cycles: 1_000_000_000,
        });
        // More stalls than the client will tolerate.
        let transport = Arc::new(StallingTransport::new(manager.clone(), 100));
        let client = StoreClient::new(transport.clone());

        let err = client.get("key").await.unwrap_err();
        assert_eq!(err, StoreError::MigrationInProgress(PartitionId(0)));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let transport = Arc::new(BrokenTransport {
            attempts: AtomicUsize::new(0),
        });
        let client = StoreClient::new(transport.clone());

        let err = client.put("key", b"value".to_vec()).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_error_is_not_retried() {
        let manager = CapacityManager::new(CollectionConfig {
            move_cap: 1_000_000,
            hard_cap: None,
            // Too small for any put.
            partition_cycles: 1,
        });
        let client = StoreClient::new(Arc::new(LocalTransport::new(manager)));

        let err = client.put("key", b"value".to_vec()).await.unwrap_err();
        assert_eq!(err, StoreError::InsufficientBudget(PartitionId(0)));
    }
}
