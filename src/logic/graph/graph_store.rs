use super::compression::CompressedPath;
use super::volatility::Volatility;
use crate::data_sync::SyncFlags;
use crate::logic::types::PoolRecord;
use crate::utils::{DexConfig, KeyValueStore, StoreError, Token};
use alloy_primitives::Address;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug, Display)]
#[strum(serialize_all = "camelCase")]
enum KeyKind {
    Paths,
    StableGraph,
    VolatileGraph,
    Tokens,
    Volatility,
    BlockHeightCheckpoint,
}

/// Liquidity graph of one DEX deployment over a shared [`KeyValueStore`].
///
/// Every key is `<prefix>:<kind>:<router>:<chain>:<key>`, so routers sharing a backend never see
/// each other's data. The graph is append-only: adjacency is a set union, volatility only widens
/// and the checkpoint only moves forward.
pub struct GraphStore {
    backend: Arc<dyn KeyValueStore>,
    prefix: String,
    router: String,
    chain_id: u64,
    paths_ttl: Duration,
}

impl GraphStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, dex: &DexConfig, prefix: impl Into<String>, paths_ttl: Duration) -> Self {
        Self { backend, prefix: prefix.into(), router: dex.router_address.to_checksum(None), chain_id: dex.chain_id, paths_ttl }
    }

    fn key(&self, kind: KeyKind, key: &str) -> String {
        format!("{}:{}:{}:{}:{}", self.prefix, kind, self.router, self.chain_id, key)
    }

    fn address_key(address: &Address) -> String {
        address.to_checksum(None)
    }

    fn pair_key(a: &Address, b: &Address) -> String {
        format!("{}:{}", a.to_checksum(None), b.to_checksum(None))
    }

    fn parse_address(key: &str, value: &str) -> Result<Address, StoreError> {
        Address::from_str(value).map_err(|e| StoreError::Corrupt { key: key.to_string(), reason: e.to_string() })
    }

    fn parse_volatility(key: &str, value: Option<String>) -> Result<Option<Volatility>, StoreError> {
        value
            .map(|value| Volatility::from_str(&value).map_err(|e| StoreError::Corrupt { key: key.to_string(), reason: e.to_string() }))
            .transpose()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // Tokens

    pub async fn get_token(&self, address: &Address) -> Result<Option<Token>, StoreError> {
        let key = self.key(KeyKind::Tokens, &Self::address_key(address));
        match self.backend.get(&key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// One multi-get for all `addresses`, results in input order.
    pub async fn get_tokens(&self, addresses: &[Address]) -> Result<Vec<Option<Token>>, StoreError> {
        let keys: Vec<String> = addresses.iter().map(|address| self.key(KeyKind::Tokens, &Self::address_key(address))).collect();
        self.backend
            .get_many(&keys)
            .await?
            .into_iter()
            .map(|raw| raw.map(|raw| serde_json::from_str::<Token>(&raw)).transpose().map_err(StoreError::from))
            .collect()
    }

    pub async fn set_token(&self, token: &Token) -> Result<(), StoreError> {
        let key = self.key(KeyKind::Tokens, &Self::address_key(&token.get_address()));
        self.backend.set(&key, serde_json::to_string(token)?).await
    }

    // Adjacency

    /// Neighbours reachable through pools of one kind, sorted.
    pub async fn class_neighbors(&self, token: &Address, stable: bool) -> Result<Vec<Address>, StoreError> {
        let kind = if stable { KeyKind::StableGraph } else { KeyKind::VolatileGraph };
        let key = self.key(kind, &Self::address_key(token));
        let members = self.backend.members(&key).await?;
        let neighbors = members.iter().map(|member| Self::parse_address(&key, member)).collect::<Result<BTreeSet<_>, _>>()?;
        Ok(neighbors.into_iter().collect())
    }

    /// Union of both adjacency views, sorted.
    pub async fn neighbors(&self, token: &Address) -> Result<Vec<Address>, StoreError> {
        let mut neighbors: BTreeSet<Address> = self.class_neighbors(token, true).await?.into_iter().collect();
        neighbors.extend(self.class_neighbors(token, false).await?);
        Ok(neighbors.into_iter().collect())
    }

    /// Records the edge `a <-> b` in the view of its pool kind.
    pub async fn add_edge(&self, a: &Address, b: &Address, stable: bool) -> Result<(), StoreError> {
        let kind = if stable { KeyKind::StableGraph } else { KeyKind::VolatileGraph };
        self.backend.add_members(&self.key(kind, &Self::address_key(a)), vec![Self::address_key(b)], None).await?;
        self.backend.add_members(&self.key(kind, &Self::address_key(b)), vec![Self::address_key(a)], None).await
    }

    // Volatility

    pub async fn get_volatility(&self, a: &Address, b: &Address) -> Result<Option<Volatility>, StoreError> {
        let key = self.key(KeyKind::Volatility, &Self::pair_key(a, b));
        let value = self.backend.get(&key).await?;
        Self::parse_volatility(&key, value)
    }

    /// One multi-get for all directed pairs, results in input order.
    pub async fn get_volatilities(&self, pairs: &[(Address, Address)]) -> Result<Vec<Option<Volatility>>, StoreError> {
        let keys: Vec<String> = pairs.iter().map(|(a, b)| self.key(KeyKind::Volatility, &Self::pair_key(a, b))).collect();
        let values = self.backend.get_many(&keys).await?;
        keys.iter().zip(values).map(|(key, value)| Self::parse_volatility(key, value)).collect()
    }

    /// Joins `observed` into the stored value of the pair, in both directions.
    ///
    /// Read-modify-write; callers must not widen the same pair concurrently.
    pub async fn widen_volatility(&self, a: &Address, b: &Address, observed: Volatility) -> Result<Volatility, StoreError> {
        let current = self.get_volatility(a, b).await?;
        let widened = Volatility::widen(current, observed);
        if current != Some(widened) {
            self.backend.set(&self.key(KeyKind::Volatility, &Self::pair_key(a, b)), widened.to_string()).await?;
            self.backend.set(&self.key(KeyKind::Volatility, &Self::pair_key(b, a)), widened.to_string()).await?;
        }
        Ok(widened)
    }

    // Checkpoint

    /// Highest fully-ingested block, 0 when nothing was ingested yet.
    pub async fn get_checkpoint(&self) -> Result<u64, StoreError> {
        let key = self.key(KeyKind::BlockHeightCheckpoint, "latest");
        match self.backend.get(&key).await? {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| StoreError::Corrupt { key, reason: e.to_string() }),
            None => Ok(0),
        }
    }

    /// Moves the checkpoint forward. Moving it backwards is rejected, see [`Self::rewind_checkpoint`].
    pub async fn set_checkpoint(&self, block_number: u64) -> Result<(), StoreError> {
        let current = self.get_checkpoint().await?;
        if block_number < current {
            return Err(StoreError::CheckpointRegression { current, attempted: block_number });
        }
        if block_number == current {
            return Ok(());
        }
        self.backend.set(&self.key(KeyKind::BlockHeightCheckpoint, "latest"), block_number.to_string()).await
    }

    /// Deliberately moves the checkpoint to `block_number`, forcing re-ingestion of later pools.
    pub async fn rewind_checkpoint(&self, block_number: u64) -> Result<(), StoreError> {
        warn!(router = %self.router, chain_id = self.chain_id, block_number, "Rewinding sync checkpoint");
        self.backend.set(&self.key(KeyKind::BlockHeightCheckpoint, "latest"), block_number.to_string()).await
    }

    // Path cache

    /// Cached paths for the pair, sorted. Absence reads as empty.
    pub async fn get_cached_paths(&self, token_in: &Address, token_out: &Address) -> Result<Vec<CompressedPath>, StoreError> {
        let mut paths: Vec<CompressedPath> =
            self.backend.members(&self.key(KeyKind::Paths, &Self::pair_key(token_in, token_out))).await?.into_iter().map(CompressedPath::from).collect();
        paths.sort();
        Ok(paths)
    }

    /// Writes computed paths with the cache TTL. Returns false when the write was skipped:
    /// while `flags` report a sync or the initial boot, or while `token_in` has no neighbours.
    pub async fn cache_paths(&self, token_in: &Address, token_out: &Address, paths: &[CompressedPath], flags: &SyncFlags) -> Result<bool, StoreError> {
        if paths.is_empty() {
            return Ok(false);
        }
        if !flags.path_cache_writable() {
            debug!(token_in = %token_in, token_out = %token_out, "Skipping path cache write during synchronization");
            return Ok(false);
        }
        if self.neighbors(token_in).await?.is_empty() {
            debug!(token_in = %token_in, "Skipping path cache write for a token without adjacency");
            return Ok(false);
        }

        let key = self.key(KeyKind::Paths, &Self::pair_key(token_in, token_out));
        self.backend.add_members(&key, paths.iter().map(|path| path.as_str().to_string()).collect(), Some(self.paths_ttl)).await?;
        Ok(true)
    }

    // Ingestion

    /// Decomposes a pool into token records, pair volatility and adjacency. Idempotent.
    pub async fn add_pool(&self, pool: &PoolRecord) -> Result<(), StoreError> {
        let token0 = pool.token0.get_address();
        let token1 = pool.token1.get_address();

        self.set_token(&pool.token0).await?;
        self.set_token(&pool.token1).await?;
        self.widen_volatility(&token0, &token1, Volatility::from_stable_flag(pool.stable)).await?;
        self.add_edge(&token0, &token1, pool.stable).await
    }
}
