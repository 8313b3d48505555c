use super::graph::{GraphStore, PathLeg, SwapPath, SwapPathSet, Volatility, decompress_paths, fork_by_volatility};
use crate::data_sync::SyncFlags;
use crate::utils::constants::MAX_TRAVERSAL_STEPS;
use crate::utils::{DexCatalog, DexConfig, StoreError, Token};
use ahash::{HashMap, HashSet};
use alloy_primitives::Address;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// State of the search: the node sequence walked so far, ending at the current node.
/// The sequence doubles as the cycle guard.
#[derive(Debug)]
struct TraversalState {
    nodes: Vec<Address>,
}

/// Finds swap paths for one DEX deployment over its cached liquidity graph.
///
/// The traversal only routes through hub nodes: from any node, the next node must be a hub or
/// `token_out`. This bounds the branching factor regardless of how many long-tail tokens the
/// graph holds.
pub struct Pathfinder {
    dex: Arc<DexConfig>,
    store: Arc<GraphStore>,
    catalog: Arc<DexCatalog>,
    flags: Arc<SyncFlags>,
    hub_nodes: HashSet<Address>,
    /// Hop ceiling; the path cache is always filled at this depth
    max_hops: u8,
    max_traversal_steps: usize,
}

impl Pathfinder {
    pub fn new(
        dex: Arc<DexConfig>,
        store: Arc<GraphStore>,
        catalog: Arc<DexCatalog>,
        flags: Arc<SyncFlags>,
        hub_nodes: impl IntoIterator<Item = Address>,
        max_hops: u8,
    ) -> Self {
        Self {
            dex,
            store,
            catalog,
            flags,
            hub_nodes: hub_nodes.into_iter().collect(),
            max_hops: max_hops.max(1),
            max_traversal_steps: MAX_TRAVERSAL_STEPS,
        }
    }

    pub fn with_max_traversal_steps(mut self, max_traversal_steps: usize) -> Self {
        self.max_traversal_steps = max_traversal_steps;
        self
    }

    pub fn max_hops(&self) -> u8 {
        self.max_hops
    }

    pub fn is_hub(&self, token: &Address) -> bool {
        self.hub_nodes.contains(token)
    }

    /// All paths from `token_in` to `token_out` with at most `max_hops` legs.
    ///
    /// A `max_hops` of zero admits no path; larger values are clamped to the ceiling. Cached paths are served when present; otherwise the
    /// graph is traversed at the ceiling, the result written through to the cache and filtered.
    pub async fn find_paths(&self, token_in: &Address, token_out: &Address, max_hops: u8) -> Result<Vec<SwapPath>, StoreError> {
        if token_in == token_out || max_hops == 0 {
            return Ok(Vec::new());
        }
        let max_hops = max_hops.min(self.max_hops) as usize;

        let cached = self.store.get_cached_paths(token_in, token_out).await?;
        if !cached.is_empty() {
            debug!(dex = %self.dex.name, %token_in, %token_out, paths = cached.len(), "Path cache hit");
            let paths = decompress_paths(&cached, &self.catalog);
            return Ok(paths.into_iter().filter(|path| path.len() <= max_hops).collect());
        }

        let sequences = self.traverse(token_in, token_out).await?;
        let paths = self.resolve(sequences).await?;

        if !paths.is_empty() {
            self.store.cache_paths(token_in, token_out, &paths.compressed(), &self.flags).await?;
        }
        debug!(dex = %self.dex.name, %token_in, %token_out, paths = paths.len(), "Computed paths");

        Ok(paths.vec().into_iter().filter(|path| path.len() <= max_hops).collect())
    }

    /// Bounded depth-first search yielding node sequences `token_in, ..., token_out`.
    ///
    /// Neighbours are visited in ascending address order, so identical graph state yields
    /// identical output.
    async fn traverse(&self, token_in: &Address, token_out: &Address) -> Result<Vec<Vec<Address>>, StoreError> {
        let mut sequences = Vec::new();
        let mut neighbor_cache: HashMap<Address, Vec<Address>> = HashMap::default();
        let mut stack = vec![TraversalState { nodes: vec![*token_in] }];
        let mut steps = 0usize;

        while let Some(TraversalState { nodes }) = stack.pop() {
            steps += 1;
            if steps > self.max_traversal_steps {
                error!(dex = %self.dex.name, %token_in, %token_out, steps, "Traversal step limit reached, returning partial result");
                break;
            }

            let Some(node) = nodes.last().copied() else {
                continue;
            };
            if node == *token_out {
                sequences.push(nodes);
                continue;
            }
            if nodes.len() > self.max_hops as usize {
                continue;
            }

            if !neighbor_cache.contains_key(&node) {
                let neighbors = self.store.neighbors(&node).await?;
                neighbor_cache.insert(node, neighbors);
            }
            let Some(neighbors) = neighbor_cache.get(&node) else {
                continue;
            };

            // reversed so the smallest neighbour is explored first
            for neighbor in neighbors.iter().rev() {
                if !(self.hub_nodes.contains(neighbor) || neighbor == token_out) || nodes.contains(neighbor) {
                    continue;
                }
                let mut next = nodes.clone();
                next.push(*neighbor);
                stack.push(TraversalState { nodes: next });
            }
        }

        Ok(sequences)
    }

    /// Turns node sequences into forked, deduplicated paths. Token and volatility records are
    /// read with one multi-get each; a sequence with any unresolved hop is dropped.
    async fn resolve(&self, sequences: Vec<Vec<Address>>) -> Result<SwapPathSet, StoreError> {
        let mut result = SwapPathSet::new();
        if sequences.is_empty() {
            return Ok(result);
        }

        let addresses: Vec<Address> = sequences.iter().flatten().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let tokens: HashMap<Address, Arc<Token>> = addresses
            .iter()
            .zip(self.store.get_tokens(&addresses).await?)
            .filter_map(|(address, token)| token.map(|token| (*address, Arc::new(token))))
            .collect();

        let pairs: Vec<(Address, Address)> =
            sequences.iter().flat_map(|nodes| nodes.windows(2).map(|hop| (hop[0], hop[1]))).collect::<BTreeSet<_>>().into_iter().collect();
        let volatilities: HashMap<(Address, Address), Volatility> = pairs
            .iter()
            .zip(self.store.get_volatilities(&pairs).await?)
            .filter_map(|(pair, volatility)| volatility.map(|volatility| (*pair, volatility)))
            .collect();

        for nodes in sequences {
            match self.resolve_sequence(&nodes, &tokens, &volatilities) {
                Some((path, path_volatilities)) => result.extend(fork_by_volatility(&path, &path_volatilities)),
                None => warn!(dex = %self.dex.name, ?nodes, "Dropping path with unresolved tokens or volatility"),
            }
        }
        Ok(result)
    }

    fn resolve_sequence(
        &self,
        nodes: &[Address],
        tokens: &HashMap<Address, Arc<Token>>,
        volatilities: &HashMap<(Address, Address), Volatility>,
    ) -> Option<(SwapPath, Vec<Volatility>)> {
        let hops = nodes.len().saturating_sub(1);
        let mut legs = Vec::with_capacity(hops);
        let mut path_volatilities = Vec::with_capacity(hops);
        for hop in nodes.windows(2) {
            let from = tokens.get(&hop[0])?;
            let to = tokens.get(&hop[1])?;
            path_volatilities.push(*volatilities.get(&(hop[0], hop[1]))?);
            legs.push(PathLeg::new(self.dex.clone(), from.clone(), to.clone(), false));
        }
        let path = SwapPath::new(legs).ok()?;
        Some((path, path_volatilities))
    }
}
