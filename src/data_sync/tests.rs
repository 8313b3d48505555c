/// Integration tests for graph synchronization
///
/// These drive a [`Synchronizer`] against an in-memory backend and scripted pool sources,
/// checking checkpoint progress, continuation and failure handling end to end.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::logic::graph::GraphStore;
    use crate::logic::types::PoolRecord;
    use crate::utils::constants::{BASE_WETH, ChainId};
    use crate::utils::{DexConfig, InMemoryStore, KeyValueStore, StoreError, Token};
    use alloy_primitives::Address;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio::time::Duration;

    /// Backend that counts checkpoint writes
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        checkpoint_sets: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            if key.contains("blockHeightCheckpoint") {
                self.checkpoint_sets.fetch_add(1, Ordering::Relaxed);
            }
            self.inner.set(key, value).await
        }

        async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
            self.inner.members(key).await
        }

        async fn add_members(&self, key: &str, members: Vec<String>, ttl: Option<Duration>) -> Result<(), StoreError> {
            self.inner.add_members(key, members, ttl).await
        }
    }

    /// Backend whose `fail_on`-th set-union write fails, as a timed-out store would
    struct FlakyStore {
        inner: InMemoryStore,
        fail_on: usize,
        add_members_calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(fail_on: usize) -> Self {
            Self { inner: InMemoryStore::new(), fail_on, add_members_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }

        async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
            self.inner.members(key).await
        }

        async fn add_members(&self, key: &str, members: Vec<String>, ttl: Option<Duration>) -> Result<(), StoreError> {
            if self.add_members_calls.fetch_add(1, Ordering::Relaxed) + 1 == self.fail_on {
                return Err(StoreError::Unavailable("write timed out".to_string()));
            }
            self.inner.add_members(key, members, ttl).await
        }
    }

    fn pool_at(index: u32, block_number: u64) -> PoolRecord {
        PoolRecord {
            token0: Token::new(Address::left_padding_from(&index.to_be_bytes()), ChainId::BASE, 18),
            token1: Token::new(BASE_WETH, ChainId::BASE, 18),
            stable: false,
            block_number,
            pair_address: Address::left_padding_from(&(index as u64 | 1 << 40).to_be_bytes()),
        }
    }

    fn pools(count: u32) -> Vec<PoolRecord> {
        (1..=count).map(|index| pool_at(index, index as u64)).collect()
    }

    fn synchronizer(backend: Arc<dyn KeyValueStore>, source: Arc<dyn PoolSource>, chunk_size: usize) -> (Arc<Synchronizer>, Arc<GraphStore>) {
        let dex = Arc::new(DexConfig::base_aerodrome_v2());
        let store = Arc::new(GraphStore::new(backend, &dex, "test", Duration::from_secs(60)));
        let sync = Synchronizer::new(dex, store.clone(), source, Arc::new(SyncFlags::new()), chunk_size, Duration::from_secs(3600));
        (Arc::new(sync), store)
    }

    #[test]
    fn test_chunk_by_block_keeps_blocks_together() {
        let pools: Vec<PoolRecord> = [3, 1, 2, 1, 3, 1].iter().enumerate().map(|(i, block)| pool_at(i as u32 + 1, *block)).collect();

        let chunks = chunk_by_block(pools, 2);
        let blocks: Vec<Vec<u64>> = chunks.iter().map(|chunk| chunk.iter().map(|pool| pool.block_number).collect()).collect();
        assert_eq!(blocks, vec![vec![1, 1, 1], vec![2], vec![3, 3]]);
    }

    #[tokio::test]
    async fn test_checkpoint_advances_per_chunk() -> eyre::Result<()> {
        let backend = Arc::new(CountingStore::default());
        let source = Arc::new(StaticPoolSource::new(pools(1300), 2000));
        let (sync, store) = synchronizer(backend.clone(), source, 500);

        let outcome = sync.tick().await;
        assert_eq!(outcome, SyncOutcome::Completed { fetches: 1, pools_applied: 1300 });
        assert_eq!(backend.checkpoint_sets.load(Ordering::Relaxed), 3);
        assert_eq!(store.get_checkpoint().await?, 1300);

        let stats = sync.stats().await;
        assert_eq!(stats.chunks_applied, 3);
        assert_eq!(stats.pools_applied, 1300);
        assert_eq!(stats.checkpoint, 1300);
        assert_eq!(store.neighbors(&BASE_WETH).await?.len(), 1300);
        Ok(())
    }

    #[tokio::test]
    async fn test_continues_while_source_has_more() -> eyre::Result<()> {
        let source = Arc::new(StaticPoolSource::new(pools(5), 2));
        let (sync, store) = synchronizer(Arc::new(InMemoryStore::new()), source.clone(), 500);

        let outcome = sync.tick().await;
        assert_eq!(outcome, SyncOutcome::Completed { fetches: 3, pools_applied: 5 });
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(store.get_checkpoint().await?, 5);

        // nothing new on the next tick
        let outcome = sync.tick().await;
        assert_eq!(outcome, SyncOutcome::Completed { fetches: 1, pools_applied: 0 });
        assert_eq!(store.get_checkpoint().await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_failure_is_swallowed() -> eyre::Result<()> {
        let source = |_start_block: u64| async move { Err::<PoolBatch, eyre::Report>(eyre::eyre!("indexer unavailable")) };
        let (sync, store) = synchronizer(Arc::new(InMemoryStore::new()), Arc::new(source), 500);

        assert!(matches!(sync.tick().await, SyncOutcome::Failed(reason) if reason.contains("indexer unavailable")));
        assert_eq!(store.get_checkpoint().await?, 0);

        let stats = sync.stats().await;
        assert_eq!(stats.failed_cycles, 1);
        assert_eq!(stats.cycles, 1);
        assert!(!sync.flags().is_cycle_in_flight());
        assert!(!sync.flags().is_synchronizing());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_pool_is_skipped() -> eyre::Result<()> {
        let mut malformed = pool_at(7, 2);
        malformed.token1 = malformed.token0.clone();
        let source = Arc::new(StaticPoolSource::new(vec![pool_at(1, 1), malformed, pool_at(3, 3)], 100));
        let (sync, store) = synchronizer(Arc::new(InMemoryStore::new()), source, 500);

        assert_eq!(sync.tick().await, SyncOutcome::Completed { fetches: 1, pools_applied: 2 });
        assert_eq!(store.get_checkpoint().await?, 3);
        assert_eq!(sync.stats().await.pools_skipped, 1);
        assert!(store.neighbors(&Address::left_padding_from(&7u32.to_be_bytes())).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_keeps_chunk_for_retry() -> eyre::Result<()> {
        // two adjacency writes per pool: the 5th write is the first one of pool 3
        let backend = Arc::new(FlakyStore::new(5));
        let source = Arc::new(StaticPoolSource::new(pools(4), 100));
        let (sync, store) = synchronizer(backend, source, 2);

        assert!(matches!(sync.tick().await, SyncOutcome::Failed(reason) if reason.contains("write timed out")));
        assert_eq!(store.get_checkpoint().await?, 2);
        assert!(!sync.flags().is_synchronizing());

        assert_eq!(sync.tick().await, SyncOutcome::Completed { fetches: 1, pools_applied: 2 });
        assert_eq!(store.get_checkpoint().await?, 4);
        assert_eq!(store.neighbors(&BASE_WETH).await?.len(), 4);
        assert_eq!(store.neighbors(&Address::left_padding_from(&3u32.to_be_bytes())).await?, vec![BASE_WETH]);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_failed_write_is_retried() -> eyre::Result<()> {
        let backend = Arc::new(FlakyStore::new(1));
        let source = Arc::new(StaticPoolSource::new(vec![pool_at(1, 10)], 100));
        let (sync, store) = synchronizer(backend, source, 500);

        assert!(matches!(sync.tick().await, SyncOutcome::Failed(_)));
        assert_eq!(store.get_checkpoint().await?, 0);

        assert_eq!(sync.tick().await, SyncOutcome::Completed { fetches: 1, pools_applied: 1 });
        assert_eq!(store.get_checkpoint().await?, 10);
        assert_eq!(store.neighbors(&Address::left_padding_from(&1u32.to_be_bytes())).await?, vec![BASE_WETH]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tick_while_in_flight_is_noop() -> eyre::Result<()> {
        let gate = Arc::new(Notify::new());
        let source = {
            let gate = gate.clone();
            move |_start_block: u64| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok::<_, eyre::Report>(PoolBatch::default())
                }
            }
        };
        let (sync, _store) = synchronizer(Arc::new(InMemoryStore::new()), Arc::new(source), 500);

        let running = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.tick().await })
        };
        while !sync.flags().is_cycle_in_flight() {
            tokio::task::yield_now().await;
        }

        assert_eq!(sync.tick().await, SyncOutcome::Skipped);
        assert_eq!(sync.state(), SyncState::Fetching);

        gate.notify_one();
        assert_eq!(running.await?, SyncOutcome::Completed { fetches: 1, pools_applied: 0 });
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.stats().await.skipped_ticks, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_spawn_runs_initial_cycle() -> eyre::Result<()> {
        let source = Arc::new(StaticPoolSource::new(pools(10), 100));
        let (sync, store) = synchronizer(Arc::new(InMemoryStore::new()), source, 4);

        let handle = sync.clone().spawn();
        assert!(sync.flags().is_initializing());
        assert!(!sync.flags().path_cache_writable());

        tokio::time::timeout(Duration::from_secs(5), async {
            while sync.flags().is_initializing() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await?;

        assert_eq!(store.get_checkpoint().await?, 10);
        assert!(sync.flags().path_cache_writable());
        handle.abort();
        Ok(())
    }
}
