use alloy_primitives::{Address, address};

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

pub const DEFAULT_SYNC_CHUNK_SIZE: usize = 500;

pub const DEFAULT_PATHS_CACHE_TTL_SECS: u64 = 30 * 60;

pub const DEFAULT_CACHE_KEY_PREFIX: &str = "swap-router";

pub const DEFAULT_MAX_HOPS: u8 = 3;

/// Upper bound on Newton iterations in the stable-swap solvers, same as the on-chain pools.
pub const MAX_NEWTON_ITERATIONS: usize = 255;

/// Safety valve for the path traversal stack.
pub const MAX_TRAVERSAL_STEPS: usize = 500_000;

#[non_exhaustive]
pub struct ChainId;

impl ChainId {
    pub const MAINNET: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const BINANCE: u64 = 56;
    pub const FANTOM: u64 = 250;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;
}

/// Spectrum aggregation router deployments. A chain without an entry cannot be quoted.
#[non_exhaustive]
pub struct SpectrumRouterAddress;

impl SpectrumRouterAddress {
    pub const ARBITRUM: Address = address!("0xBa22100380a3615B705Ff025EB31595EBaeDe231");
    pub const BASE: Address = address!("0x146D3078c4b550760BC3a2EaeCC7Cd7F0dc5445E");
    pub const FANTOM: Address = address!("0x592EC5A4A4Ad0cbc05344f8a72299D5A203b9510");

    pub fn for_chain(chain_id: u64) -> Option<Address> {
        match chain_id {
            ChainId::ARBITRUM => Some(Self::ARBITRUM),
            ChainId::BASE => Some(Self::BASE),
            ChainId::FANTOM => Some(Self::FANTOM),
            _ => None,
        }
    }
}

// Common hub tokens
pub const BASE_WETH: Address = address!("0x4200000000000000000000000000000000000006");
pub const BASE_USDC: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const ARBITRUM_WETH: Address = address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1");
pub const ARBITRUM_USDC: Address = address!("0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8");
