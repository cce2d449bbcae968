//! Harness Module Tests
//!
//! Validates the worker pool contract (exactly-once reporting, failure
//! isolation) and the end-to-end stress scenarios from the design notes.

#[cfg(test)]
mod tests {
    use crate::harness::pool::WorkerPool;
    use crate::harness::types::*;

    use std::collections::HashMap;
    use std::time::Duration;

    fn small_config() -> HarnessConfig {
        HarnessConfig {
            worker_count: 2,
            operations_per_worker: 50,
            move_cap: 1_000_000,
            hard_cap: None,
            partition_cycles: 1_000_000_000,
            value_size: 16,
            epoch: Duration::from_millis(20),
        }
    }

    // ============================================================
    // CONFIG VALIDATION
    // ============================================================

    #[test]
    fn test_config_validation() {
        assert!(HarnessConfig::default().validate().is_ok());

        let mut config = small_config();
        config.worker_count = 0;
        assert!(config.validate().is_err());

        let mut config = small_config();
        config.move_cap = 0;
        assert!(config.validate().is_err());

        let mut config = small_config();
        config.partition_cycles = 0;
        assert!(config.validate().is_err());

        let mut config = small_config();
        config.hard_cap = Some(0);
        assert!(config.validate().is_err());

        // Zero operations is a valid smoke run.
        let mut config = small_config();
        config.operations_per_worker = 0;
        assert!(config.validate().is_ok());
    }

    // ============================================================
    // POOL CONTRACT
    // ============================================================

    #[tokio::test]
    async fn test_one_report_per_worker() {
        let mut config = small_config();
        config.worker_count = 5;
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;

        assert_eq!(summary.reports.len(), 5);
        let mut ids: Vec<usize> = summary.reports.iter().map(|r| r.worker_id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(summary.failed_workers(), 0);
        assert_eq!(summary.total_ops, 5 * 50);
    }

    #[tokio::test]
    async fn test_zero_operation_smoke_run() {
        let mut config = small_config();
        config.operations_per_worker = 0;
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;

        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.total_ops, 0);
        assert_eq!(summary.final_partition_count, 1);
    }

    #[tokio::test]
    async fn test_failed_worker_does_not_crash_harness() {
        // A budget too small for even one put: every worker exhausts its
        // epoch retries and fails, but the harness still drains them all.
        let mut config = small_config();
        config.worker_count = 3;
        config.partition_cycles = 1;
        config.epoch = Duration::from_millis(5);
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;

        assert_eq!(summary.reports.len(), 3);
        assert_eq!(summary.failed_workers(), 3);
        assert!(summary.budget_stalls > 0);
        for report in &summary.reports {
            assert_eq!(report.status, WorkerStatus::Error);
            assert!(!report.detail.is_empty());
        }
    }

    #[tokio::test]
    async fn test_deadline_stops_worker_cleanly() {
        use crate::client::store_client::StoreClient;
        use crate::client::transport::LocalTransport;
        use crate::harness::pool;
        use crate::store::manager::CapacityManager;
        use crate::store::types::CollectionConfig;
        use std::sync::Arc;

        let manager = CapacityManager::new(CollectionConfig {
            move_cap: 1_000_000,
            hard_cap: None,
            partition_cycles: 1_000_000_000,
        });
        let client = StoreClient::new(Arc::new(LocalTransport::new(manager.clone())));
        let workload = Workload {
            operations: usize::MAX,
            value_size: 16,
            read_check_every: 0,
            deadline: Some(Duration::from_millis(50)),
        };

        let report = pool::run_worker(7, client, workload, Duration::from_millis(20)).await;

        // Stopped by the deadline, not by error; partial progress recorded.
        assert_eq!(report.status, WorkerStatus::Success);
        assert!(report.ops_ok > 0);
        assert_eq!(manager.total_records(), report.ops_ok);
    }

    // ============================================================
    // END-TO-END SCENARIOS
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stress_run_splits_and_keeps_every_key() {
        // 2 workers x 10_000 puts of ~60 units crosses move_cap=500_000,
        // so at least one split must occur; hard_cap bounds the count.
        let config = HarnessConfig {
            worker_count: 2,
            operations_per_worker: 10_000,
            move_cap: 500_000,
            hard_cap: Some(1_000),
            partition_cycles: 300_000_000_000,
            value_size: 60,
            epoch: Duration::from_millis(50),
        };
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;

        assert_eq!(summary.failed_workers(), 0);
        assert_eq!(summary.total_ops, 20_000);
        assert!(summary.splits_observed >= 1, "load must force a split");
        assert!(summary.final_partition_count >= 2);
        assert!(summary.final_partition_count <= 1_000);
        assert_eq!(summary.final_record_count, 20_000);

        // Every key written by every worker is retrievable after the run.
        let manager = pool.manager();
        for worker in 0..2 {
            for op in (0..10_000).step_by(997) {
                let key = format!("w{}-k{:06}", worker, op);
                assert!(manager.get(&key).unwrap().is_some(), "missing {}", key);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_disjoint_keys_never_duplicated() {
        let config = HarnessConfig {
            worker_count: 4,
            operations_per_worker: 500,
            move_cap: 2_000,
            hard_cap: None,
            partition_cycles: 10_000_000_000,
            value_size: 32,
            epoch: Duration::from_millis(20),
        };
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;
        assert_eq!(summary.failed_workers(), 0);

        // Union of all partitions' records equals the written key set, with
        // no key present in two partitions.
        let manager = pool.manager();
        let mut seen: HashMap<String, crate::store::types::PartitionId> = HashMap::new();
        for id in manager.partition_ids() {
            for (key, _) in manager.dump_partition(id) {
                if let Some(previous) = seen.insert(key.clone(), id) {
                    panic!("key {} present in both {} and {}", key, previous, id);
                }
            }
        }
        assert_eq!(seen.len(), 4 * 500);
        for worker in 0..4 {
            for op in 0..500 {
                let key = format!("w{}-k{:06}", worker, op);
                assert!(seen.contains_key(&key), "missing {}", key);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hard_cap_run_freezes_partition_count() {
        let config = HarnessConfig {
            worker_count: 3,
            operations_per_worker: 400,
            move_cap: 1_000,
            hard_cap: Some(4),
            partition_cycles: 10_000_000_000,
            value_size: 32,
            epoch: Duration::from_millis(20),
        };
        let pool = WorkerPool::new(config);

        let summary = pool.run().await;

        assert_eq!(summary.failed_workers(), 0, "writes succeed at the cap");
        assert_eq!(summary.total_ops, 3 * 400);
        assert!(summary.final_partition_count <= 4);
        assert!(summary.hard_cap_warnings > 0, "advisories must be reported");
        assert_eq!(summary.final_record_count, 3 * 400);
    }
}
