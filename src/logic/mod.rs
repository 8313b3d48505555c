/// Logic Layer - Routing Engine
///
/// This layer is responsible for:
/// - Hub-restricted path discovery over the liquidity graph
/// - Path compression and the per-pair path cache
/// - AMM output simulation for constant-product and stable pools
/// - Ranking candidate paths by simulated output and spot price

pub mod amm;
pub mod graph;
pub mod pathfinder;
pub mod price_ranker;
pub mod reserves;
pub mod router;
pub mod router_config;
pub mod types;

// Re-export key components from the logic layer
pub use amm::{SolverError, constant_product_amount_out, constant_product_ratio, stable_swap_variant_a, stable_swap_variant_b};
pub use graph::{
    CodecError, CompressedPath, GraphStore, PathLeg, SwapPath, SwapPathSet, Volatility, compress_path, compress_paths,
    decompress_path, decompress_paths, fork_by_volatility,
};
pub use pathfinder::Pathfinder;
pub use price_ranker::{PriceRanker, PriceResponse, QuoteResponse, RankedQuote, ReserveReader, Selection};
pub use reserves::{LegReserves, RawLegReserves, ReservesError, decode_reserves};
pub use router::{Router, RouterBuilder};
pub use router_config::{RouterConfigRoot, RouterConfigSection};
pub use types::{PathsResponse, PoolRecord};
