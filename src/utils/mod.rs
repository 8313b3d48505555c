/// Utilities Module
///
/// Shared building blocks for the data and logic layers:
/// - `token`: chain-scoped token identity
/// - `cache`: key-value store contract and the in-memory implementation
/// - `dex_catalog`: static DEX deployment catalog
/// - `config_loader`: TOML loading with environment expansion
/// - `constants`: defaults, chain ids and well-known addresses
pub mod cache;
pub mod config_loader;
pub mod constants;
pub mod dex_catalog;
pub mod token;

pub use cache::{CacheStats, InMemoryStore, KeyValueStore, StoreError};
pub use config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError};
pub use dex_catalog::{AmountsOutShape, DexCatalog, DexCatalogFile, DexConfig, PairLookupShape, ReservesShape, StableFormula};
pub use token::{Token, TokenWrapper};
