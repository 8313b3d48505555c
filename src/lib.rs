// Two-Layer Architecture
pub mod data_sync; // Data Layer: Pool ingestion, checkpoints, sync flags
pub mod logic; // Logic Layer: Path finding, AMM simulation, ranking

// Common utilities and types
pub mod router_error;
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{PoolBatch, PoolSource, StaticPoolSource, SyncConfig, SyncFlags, SyncOutcome, SyncState, Synchronizer};
pub use logic::{
    CompressedPath, GraphStore, PathLeg, PathsResponse, Pathfinder, PoolRecord, PriceRanker, PriceResponse, QuoteResponse,
    RankedQuote, RawLegReserves, ReserveReader, Router, RouterBuilder, RouterConfigSection, Selection, SolverError, SwapPath,
    Volatility,
};
pub use router_error::{RouterError, RouterErrorCode};
pub use utils::{DexCatalog, DexConfig, InMemoryStore, KeyValueStore, StoreError, Token, TokenWrapper};
