/// Data Synchronization Layer
///
/// Keeps each router's liquidity graph current. It provides:
///
/// - Pluggable pool sources paged by block number
/// - Block-aligned chunking with a checkpoint advanced after every chunk
/// - A periodic, single-flight sync loop per router
/// - Flags that gate path-cache writes while the graph is changing

pub mod config;
pub mod pool_source;
pub mod synchronizer;

#[cfg(test)]
mod tests;

pub use config::SyncConfig;
pub use pool_source::{PoolBatch, PoolSource, StaticPoolSource};
pub use synchronizer::{ApplyReport, SyncFlags, SyncOutcome, SyncState, SyncStats, Synchronizer, chunk_by_block};
