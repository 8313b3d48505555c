/// Route Discovery Example
///
/// Syncs a handful of Base pools into an in-memory graph, lists the routes between two tokens
/// and ranks them against a fixed reserve table.
use alloy_primitives::{Address, Bytes, U256, address};
use async_trait::async_trait;
use eyre::Result;
use std::collections::HashMap;
use std::sync::Arc;
use swap_router::utils::constants::{BASE_USDC, BASE_WETH, ChainId};
use swap_router::{
    DexCatalog, DexConfig, PoolRecord, PriceRanker, RawLegReserves, ReserveReader, RouterBuilder, Selection, StaticPoolSource, SwapPath,
    SyncConfig, Token,
};
use tracing::{info, warn};

const BASE_USDBC: Address = address!("0xd9aaec86b65d86f6a7b5b1b0c42ffa531710b6ca");
const BASE_DEGEN: Address = address!("0x4ed4e862860bed51a9570b96d89af5e1b0efefed");

fn units(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

/// Reserves keyed by unordered pair and pool kind
#[derive(Default)]
struct ReserveTable {
    pools: HashMap<(Address, Address, bool), (U256, U256)>,
}

impl ReserveTable {
    fn key(a: Address, b: Address, stable: bool) -> (Address, Address, bool) {
        if a < b { (a, b, stable) } else { (b, a, stable) }
    }

    /// `amount_a`/`amount_b` follow the argument order, not pool order.
    fn insert(&mut self, a: &Token, b: &Token, stable: bool, amount_a: U256, amount_b: U256) {
        let (reserve0, reserve1) = if a.get_address() < b.get_address() { (amount_a, amount_b) } else { (amount_b, amount_a) };
        self.pools.insert(Self::key(a.get_address(), b.get_address(), stable), (reserve0, reserve1));
    }
}

#[async_trait]
impl ReserveReader for ReserveTable {
    async fn read_reserves(&self, path: &SwapPath) -> Result<Vec<RawLegReserves>> {
        path.legs()
            .iter()
            .map(|leg| {
                let key = Self::key(leg.from.get_address(), leg.to.get_address(), leg.stable);
                let (reserve0, reserve1) = self.pools.get(&key).ok_or_else(|| eyre::eyre!("no pool for {}", leg))?;
                let mut data = Vec::with_capacity(96);
                for word in [*reserve0, *reserve1, U256::ZERO] {
                    data.extend_from_slice(&word.to_be_bytes::<32>());
                }
                Ok(RawLegReserves { token0: key.0, data: Bytes::from(data) })
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).init();

    let weth = Token::new(BASE_WETH, ChainId::BASE, 18);
    let usdc = Token::new(BASE_USDC, ChainId::BASE, 6);
    let usdbc = Token::new(BASE_USDBC, ChainId::BASE, 6);
    let degen = Token::new(BASE_DEGEN, ChainId::BASE, 18);

    let pool = |token0: &Token, token1: &Token, stable: bool, block_number: u64| PoolRecord {
        token0: token0.clone(),
        token1: token1.clone(),
        stable,
        block_number,
        pair_address: Address::random(),
    };
    let pools = vec![
        pool(&weth, &usdc, false, 3_200_000),
        pool(&usdc, &usdbc, true, 3_200_100),
        pool(&degen, &weth, false, 3_300_000),
        pool(&degen, &usdc, false, 3_300_500),
    ];

    let mut reserves = ReserveTable::default();
    reserves.insert(&weth, &usdc, false, units(1_000, 18), units(3_000_000, 6));
    reserves.insert(&usdc, &usdbc, true, units(5_000_000, 6), units(5_000_000, 6));
    reserves.insert(&degen, &weth, false, units(10_000_000, 18), units(100, 18));
    reserves.insert(&degen, &usdc, false, units(5_000_000, 18), units(15_000, 6));

    let router = RouterBuilder::new()
        .with_dex(DexConfig::base_aerodrome_v2())
        .with_pool_source(Arc::new(StaticPoolSource::new(pools, 2)))
        .with_config(SyncConfig::from_env().unwrap_or_else(|e| {
            warn!("Failed to load config from environment, using defaults: {}", e);
            SyncConfig::default()
        }))
        .with_hub_nodes(vec![BASE_WETH, BASE_USDC])
        .build()?;

    let outcome = router.sync_now().await;
    info!("Initial sync: {:?}, checkpoint={}", outcome, router.checkpoint().await?);

    let response = router.get_available_paths(&BASE_DEGEN, &BASE_USDBC, 3).await;
    if let Some(code) = response.error {
        warn!("No route from DEGEN to USDbC: {}", code);
        return Ok(());
    }
    for compressed in &response.paths {
        info!("Route: {}", compressed.as_str());
    }

    let paths = router.find_paths(&BASE_DEGEN, &BASE_USDBC, 3).await?;
    let ranker = PriceRanker::new(DexCatalog::builtin());
    let amount_in = units(100_000, 18);
    let quote = ranker.quote(&reserves, ChainId::BASE, &BASE_DEGEN, &BASE_USDBC, amount_in, &paths, Selection::Highest).await?;

    match quote.quote {
        Some(best) => {
            info!("Best route for 100000 DEGEN: {} USDbC via {}", best.amount_out_decimal, best.compressed_path.as_str());
            let price = ranker.price(&reserves, ChainId::BASE, &BASE_DEGEN, &BASE_USDBC, &best.path).await?;
            info!("Spot price on that route: {:?}", price.price);
        }
        None => warn!("No route produced a positive amount, error={:?}", quote.error),
    }

    Ok(())
}
