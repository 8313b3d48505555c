use super::graph::{GraphStore, SwapPath, compress_paths};
use super::pathfinder::Pathfinder;
use super::router_config::RouterConfigSection;
use super::types::PathsResponse;
use crate::data_sync::{PoolSource, SyncConfig, SyncFlags, SyncOutcome, SyncStats, Synchronizer};
use crate::router_error::{RouterError, RouterErrorCode};
use crate::utils::{DexCatalog, DexConfig, InMemoryStore, KeyValueStore, StoreError};
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Routing facade for one DEX deployment.
///
/// Owns the deployment's graph store, its synchronizer and its path finder. Routers sharing a
/// backing store stay isolated through their key prefixes.
pub struct Router {
    dex: Arc<DexConfig>,
    store: Arc<GraphStore>,
    pathfinder: Pathfinder,
    synchronizer: Arc<Synchronizer>,
    flags: Arc<SyncFlags>,
    config: SyncConfig,
    sync_task: Option<JoinHandle<()>>,
}

impl Router {
    pub fn dex(&self) -> &Arc<DexConfig> {
        &self.dex
    }

    pub fn chain_id(&self) -> u64 {
        self.dex.chain_id
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn flags(&self) -> &Arc<SyncFlags> {
        &self.flags
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start periodic synchronization. The first cycle runs immediately.
    pub fn start(&mut self) -> Result<(), RouterError> {
        if self.is_running() {
            return Err(RouterError::Config(format!("router {} already started", self.dex.name)));
        }
        info!(dex = %self.dex.name, chain_id = self.dex.chain_id, "Starting router");
        self.sync_task = Some(self.synchronizer.clone().spawn());
        Ok(())
    }

    /// Stop periodic synchronization. A cycle in flight is aborted; the checkpoint keeps the
    /// last fully applied chunk.
    pub async fn stop(&mut self) {
        if let Some(task) = self.sync_task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(dex = %self.dex.name, "Sync task error during shutdown: {}", e);
                }
            }
            self.flags.set_initializing(false);
            info!(dex = %self.dex.name, "Router stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.sync_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Run one sync cycle now, outside the periodic schedule.
    pub async fn sync_now(&self) -> SyncOutcome {
        self.synchronizer.tick().await
    }

    pub async fn stats(&self) -> SyncStats {
        self.synchronizer.stats().await
    }

    pub async fn checkpoint(&self) -> Result<u64, StoreError> {
        self.store.get_checkpoint().await
    }

    /// Paths as structured values, for ranking.
    pub async fn find_paths(&self, token_in: &Address, token_out: &Address, max_hops: u8) -> Result<Vec<SwapPath>, RouterError> {
        Ok(self.pathfinder.find_paths(token_in, token_out, max_hops).await?)
    }

    /// Compressed paths from `token_in` to `token_out` with at most `max_hops` legs.
    ///
    /// Never fails: problems are reported through the response's error code.
    pub async fn get_available_paths(&self, token_in: &Address, token_out: &Address, max_hops: u8) -> PathsResponse {
        if token_in == token_out {
            return PathsResponse::rejected(RouterErrorCode::UnnecessaryRequest);
        }

        let paths = match self.pathfinder.find_paths(token_in, token_out, max_hops).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(dex = %self.dex.name, %token_in, %token_out, error = %e, "Path query failed");
                return PathsResponse::rejected(RouterErrorCode::StoreUnavailable);
            }
        };
        if !paths.is_empty() {
            return PathsResponse::found(compress_paths(&paths));
        }

        PathsResponse::rejected(self.diagnose_empty(token_in, token_out).await)
    }

    async fn diagnose_empty(&self, token_in: &Address, token_out: &Address) -> RouterErrorCode {
        match self.store.get_tokens(&[*token_in, *token_out]).await {
            Ok(tokens) => match tokens.as_slice() {
                [None, _] => RouterErrorCode::UnknownTokenIn,
                [_, None] => RouterErrorCode::UnknownTokenOut,
                _ => RouterErrorCode::EmptyRoute,
            },
            Err(e) => {
                warn!(dex = %self.dex.name, error = %e, "Token lookup failed");
                RouterErrorCode::StoreUnavailable
            }
        }
    }

    /// Fans a path query out over the routers serving `chain_id` and concatenates the results.
    ///
    /// Paths are scoped to one DEX, so results are not deduplicated across routers. When no
    /// router returns a path, the first router's error code is reported.
    pub async fn aggregate(token_in: &Address, token_out: &Address, chain_id: u64, max_hops: u8, routers: &[Router]) -> PathsResponse {
        let routers: Vec<&Router> = routers.iter().filter(|router| router.chain_id() == chain_id).collect();
        if routers.is_empty() {
            return PathsResponse::rejected(RouterErrorCode::UnknownChainId);
        }
        if token_in == token_out {
            return PathsResponse::rejected(RouterErrorCode::UnnecessaryRequest);
        }

        let mut paths = Vec::new();
        let mut first_error = None;
        for router in routers {
            let response = router.get_available_paths(token_in, token_out, max_hops).await;
            debug!(dex = %router.dex.name, paths = response.paths.len(), error = ?response.error, "Router answered");
            if first_error.is_none() {
                first_error = response.error;
            }
            paths.extend(response.paths);
        }

        if paths.is_empty() {
            return PathsResponse::rejected(first_error.unwrap_or(RouterErrorCode::EmptyRoute));
        }
        PathsResponse::found(paths)
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        if let Some(task) = self.sync_task.take() {
            if !task.is_finished() {
                warn!(dex = %self.dex.name, "Router dropped while running, aborting sync task");
                task.abort();
            }
        }
    }
}

/// Builder for Router
pub struct RouterBuilder {
    dex: Option<DexConfig>,
    backend: Option<Arc<dyn KeyValueStore>>,
    source: Option<Arc<dyn PoolSource>>,
    catalog: Option<Arc<DexCatalog>>,
    config: Option<SyncConfig>,
    router_config: Option<RouterConfigSection>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self { dex: None, backend: None, source: None, catalog: None, config: None, router_config: None }
    }

    pub fn with_dex(mut self, dex: DexConfig) -> Self {
        self.dex = Some(dex);
        self
    }

    /// Shared backing store; defaults to a private in-memory store.
    pub fn with_store(mut self, backend: Arc<dyn KeyValueStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_pool_source(mut self, source: Arc<dyn PoolSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Catalog used to decode cached paths; defaults to the built-in catalog.
    pub fn with_catalog(mut self, catalog: Arc<DexCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_router_config(mut self, router_config: RouterConfigSection) -> Self {
        self.router_config = Some(router_config);
        self
    }

    pub fn with_hub_nodes(mut self, hub_nodes: Vec<Address>) -> Self {
        let section = self.router_config.take().unwrap_or_default();
        self.router_config = Some(section.with_hub_nodes(hub_nodes));
        self
    }

    pub fn build(self) -> Result<Router, RouterError> {
        let dex = self.dex.ok_or_else(|| RouterError::Config("no DEX configured".to_string()))?;
        let source = self.source.ok_or_else(|| RouterError::Config(format!("no pool source for {}", dex.name)))?;
        let catalog = self.catalog.unwrap_or_else(DexCatalog::builtin);
        if !catalog.contains(&dex) {
            return Err(RouterError::Config(format!("DEX {} at {} is not in the catalog", dex.name, dex.router_address)));
        }
        let dex = catalog.get(&dex.router_address).ok_or_else(|| RouterError::Config(format!("DEX {} vanished from the catalog", dex.name)))?;

        let config = self.config.unwrap_or_else(|| SyncConfig::from_env().unwrap_or_default());
        config.validate().map_err(|e| RouterError::Config(e.to_string()))?;
        let router_config = self.router_config.unwrap_or_else(|| RouterConfigSection::default().with_max_hops(config.max_hops));
        let backend = self.backend.unwrap_or_else(|| Arc::new(InMemoryStore::new()));

        let store = Arc::new(GraphStore::new(backend, &dex, config.key_prefix.clone(), config.paths_cache_ttl()));
        let flags = Arc::new(SyncFlags::new());
        let synchronizer = Arc::new(Synchronizer::new(dex.clone(), store.clone(), source, flags.clone(), config.chunk_size, config.sync_interval()));
        let pathfinder = Pathfinder::new(dex.clone(), store.clone(), catalog, flags.clone(), router_config.hub_nodes, router_config.max_hops);

        debug!(dex = %dex.name, chain_id = dex.chain_id, max_hops = pathfinder.max_hops(), "Router built");
        Ok(Router { dex, store, pathfinder, synchronizer, flags, config, sync_task: None })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::StaticPoolSource;
    use crate::logic::types::PoolRecord;
    use crate::utils::Token;
    use crate::utils::constants::ChainId;
    use async_trait::async_trait;
    use std::time::Duration;

    const A: u8 = 0x0a;
    const B: u8 = 0x0b;
    const C: u8 = 0x0c;
    const D: u8 = 0x0d;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn pool(a: u8, b: u8, stable: bool, block_number: u64) -> PoolRecord {
        PoolRecord {
            token0: Token::repeat_byte(a, ChainId::BASE),
            token1: Token::repeat_byte(b, ChainId::BASE),
            stable,
            block_number,
            pair_address: Address::repeat_byte(a.wrapping_add(b).wrapping_add(block_number as u8)),
        }
    }

    fn scenario_pools() -> Vec<PoolRecord> {
        vec![pool(A, B, false, 1), pool(B, C, true, 2), pool(D, 0x0e, false, 3)]
    }

    fn builder(source: Vec<PoolRecord>) -> RouterBuilder {
        RouterBuilder::new()
            .with_dex(DexConfig::base_aerodrome_v2())
            .with_pool_source(Arc::new(StaticPoolSource::new(source, 100)))
            .with_config(SyncConfig::default())
            .with_hub_nodes(vec![addr(B)])
    }

    struct UnavailableStore;

    #[async_trait]
    impl KeyValueStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn members(&self, _key: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn add_members(&self, _key: &str, _members: Vec<String>, _ttl: Option<Duration>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(RouterBuilder::new().build(), Err(RouterError::Config(_))));
        assert!(matches!(RouterBuilder::new().with_dex(DexConfig::base_aerodrome_v2()).build(), Err(RouterError::Config(_))));

        let unknown = DexConfig { router_address: Address::repeat_byte(0x77), ..DexConfig::base_aerodrome_v2() };
        assert!(matches!(builder(vec![]).with_dex(unknown).build(), Err(RouterError::Config(_))));

        let config = SyncConfig { chunk_size: 0, ..SyncConfig::default() };
        assert!(matches!(builder(vec![]).with_config(config).build(), Err(RouterError::Config(_))));

        assert!(builder(vec![]).build().is_ok());
    }

    #[tokio::test]
    async fn test_get_available_paths() -> eyre::Result<()> {
        let router = builder(scenario_pools()).build()?;
        router.sync_now().await;

        let response = router.get_available_paths(&addr(A), &addr(C), 3).await;
        assert_eq!(response.error, None);
        assert_eq!(response.paths.len(), 1);
        assert_eq!(response.paths[0].hop_count(), 2);
        assert!(response.paths[0].as_str().ends_with("-true"));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_codes() -> eyre::Result<()> {
        let router = builder(scenario_pools()).build()?;
        router.sync_now().await;

        let same = router.get_available_paths(&addr(A), &addr(A), 3).await;
        assert_eq!(same.error, Some(RouterErrorCode::UnnecessaryRequest));

        let unknown_in = router.get_available_paths(&addr(0x99), &addr(C), 3).await;
        assert_eq!(unknown_in.error, Some(RouterErrorCode::UnknownTokenIn));

        let unknown_out = router.get_available_paths(&addr(A), &addr(0x99), 3).await;
        assert_eq!(unknown_out.error, Some(RouterErrorCode::UnknownTokenOut));

        let disconnected = router.get_available_paths(&addr(A), &addr(D), 3).await;
        assert_eq!(disconnected.error, Some(RouterErrorCode::EmptyRoute));
        assert!(disconnected.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() -> eyre::Result<()> {
        let router = builder(vec![]).with_store(Arc::new(UnavailableStore)).build()?;

        assert!(matches!(router.sync_now().await, SyncOutcome::Failed(_)));
        let response = router.get_available_paths(&addr(A), &addr(C), 3).await;
        assert_eq!(response.error, Some(RouterErrorCode::StoreUnavailable));
        Ok(())
    }

    #[tokio::test]
    async fn test_aggregate_concatenates_per_chain() -> eyre::Result<()> {
        let second = DexConfig { name: "Aerodrome Fork".to_string(), router_address: Address::repeat_byte(0x77), ..DexConfig::base_aerodrome_v2() };
        let catalog = Arc::new(DexCatalog::from_dexes([DexConfig::base_aerodrome_v2(), second.clone(), DexConfig::arbitrum_camelot()]));
        let backend: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());

        let routers = vec![
            builder(scenario_pools()).with_catalog(catalog.clone()).with_store(backend.clone()).build()?,
            builder(scenario_pools()).with_dex(second).with_catalog(catalog.clone()).with_store(backend.clone()).build()?,
            RouterBuilder::new()
                .with_dex(DexConfig::arbitrum_camelot())
                .with_pool_source(Arc::new(StaticPoolSource::new(vec![], 100)))
                .with_catalog(catalog)
                .with_config(SyncConfig::default())
                .build()?,
        ];
        for router in &routers {
            router.sync_now().await;
        }

        let response = Router::aggregate(&addr(A), &addr(C), ChainId::BASE, 3, &routers).await;
        assert_eq!(response.error, None);
        assert_eq!(response.paths.len(), 2);
        assert_ne!(response.paths[0], response.paths[1]);

        let unknown = Router::aggregate(&addr(A), &addr(C), ChainId::FANTOM, 3, &routers).await;
        assert_eq!(unknown.error, Some(RouterErrorCode::UnknownChainId));

        let none = Router::aggregate(&addr(A), &addr(D), ChainId::BASE, 3, &routers).await;
        assert_eq!(none.error, Some(RouterErrorCode::EmptyRoute));
        Ok(())
    }

    #[tokio::test]
    async fn test_start_and_stop() -> eyre::Result<()> {
        let mut router = builder(scenario_pools()).build()?;
        router.start()?;
        assert!(router.start().is_err());

        tokio::time::timeout(Duration::from_secs(5), async {
            while router.flags().is_initializing() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await?;

        assert_eq!(router.checkpoint().await?, 3);
        assert_eq!(router.stats().await.pools_applied, 3);

        router.stop().await;
        assert!(!router.is_running());
        Ok(())
    }
}
