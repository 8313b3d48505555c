use crate::utils::config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync};
use crate::utils::constants::ChainId;
use alloy_primitives::{Address, address};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use strum_macros::{Display, EnumString};

/// Argument layout of the router's `getAmountsOut`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AmountsOutShape {
    #[strum(serialize = "address[]")]
    #[serde(rename = "address[]")]
    AddressArray,
    #[strum(serialize = "from_to_stable")]
    #[serde(rename = "from_to_stable")]
    FromToStable,
    #[strum(serialize = "from_to_stable_factory")]
    #[serde(rename = "from_to_stable_factory")]
    FromToStableFactory,
}

/// Factory method used to look up a pair address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum PairLookupShape {
    #[strum(serialize = "getPair_A_B")]
    #[serde(rename = "getPair_A_B")]
    GetPair,
    #[strum(serialize = "getPair_A_B_stable")]
    #[serde(rename = "getPair_A_B_stable")]
    GetPairStable,
    #[strum(serialize = "pairFor_A_B_stable")]
    #[serde(rename = "pairFor_A_B_stable")]
    PairForStable,
    #[strum(serialize = "getPool_A_B_stable")]
    #[serde(rename = "getPool_A_B_stable")]
    GetPoolStable,
}

/// Return tuple of the pair's `getReserves()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum ReservesShape {
    #[strum(serialize = "getReserves_112_112_32")]
    #[serde(rename = "getReserves_112_112_32")]
    Uint112Uint112Uint32,
    #[strum(serialize = "getReserves_112_112_16_16")]
    #[serde(rename = "getReserves_112_112_16_16")]
    Uint112Uint112Uint16Uint16,
    #[strum(serialize = "getReserves_256_256_256")]
    #[serde(rename = "getReserves_256_256_256")]
    Uint256Uint256Uint256,
}

/// Stable-swap solver used for `stable` legs on this DEX.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StableFormula {
    #[default]
    None,
    /// Velodrome V2 style: one-unit neighbour check on convergence.
    VariantA,
    /// Solidly V1 style: consecutive iterates within one unit.
    VariantB,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DexConfig {
    pub name: String,
    pub chain_id: u64,
    pub router_address: Address,
    pub factory_address: Address,
    pub amounts_out: AmountsOutShape,
    pub pair_lookup: PairLookupShape,
    pub reserves: ReservesShape,
    #[serde(default)]
    pub stable_formula: StableFormula,
}

impl DexConfig {
    pub fn arbitrum_camelot() -> Self {
        Self {
            name: "Camelot".to_string(),
            chain_id: ChainId::ARBITRUM,
            router_address: address!("0xc873fEcbd354f5A56E00E710B90EF4201db2448d"),
            factory_address: address!("0x6EcCab422D763aC031210895C81787E87B43A652"),
            amounts_out: AmountsOutShape::AddressArray,
            pair_lookup: PairLookupShape::GetPair,
            reserves: ReservesShape::Uint112Uint112Uint16Uint16,
            stable_formula: StableFormula::None,
        }
    }

    pub fn base_aerodrome_v2() -> Self {
        Self {
            name: "Aerodrome V2".to_string(),
            chain_id: ChainId::BASE,
            router_address: address!("0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43"),
            factory_address: address!("0x420DD381b31aEf6683db6B902084cB0FFECe40Da"),
            amounts_out: AmountsOutShape::FromToStableFactory,
            pair_lookup: PairLookupShape::GetPoolStable,
            reserves: ReservesShape::Uint256Uint256Uint256,
            stable_formula: StableFormula::VariantA,
        }
    }

    pub fn binance_pancakeswap_v2() -> Self {
        Self {
            name: "PancakeSwap V2".to_string(),
            chain_id: ChainId::BINANCE,
            router_address: address!("0x10ED43C718714eb63d5aA57B78B54704E256024E"),
            factory_address: address!("0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
            amounts_out: AmountsOutShape::AddressArray,
            pair_lookup: PairLookupShape::GetPair,
            reserves: ReservesShape::Uint112Uint112Uint32,
            stable_formula: StableFormula::None,
        }
    }

    pub fn fantom_spookyswap_v2() -> Self {
        Self {
            name: "SpookySwap V2".to_string(),
            chain_id: ChainId::FANTOM,
            router_address: address!("0xF491e7B69E4244ad4002BC14e878a34207E38c29"),
            factory_address: address!("0x152eE697f2E276fA89E96742e9bB9aB1F2E61bE3"),
            amounts_out: AmountsOutShape::AddressArray,
            pair_lookup: PairLookupShape::GetPair,
            reserves: ReservesShape::Uint112Uint112Uint32,
            stable_formula: StableFormula::None,
        }
    }

    pub fn mainnet_uniswap_v2() -> Self {
        Self {
            name: "Uniswap V2".to_string(),
            chain_id: ChainId::MAINNET,
            router_address: address!("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            factory_address: address!("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
            amounts_out: AmountsOutShape::AddressArray,
            pair_lookup: PairLookupShape::GetPair,
            reserves: ReservesShape::Uint112Uint112Uint32,
            stable_formula: StableFormula::None,
        }
    }

    /// Whether the DEX has stable pools at all.
    pub fn supports_stable(&self) -> bool {
        self.stable_formula != StableFormula::None
    }
}

/// `[[dex]]` entries of a catalog file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DexCatalogFile {
    #[serde(default)]
    pub dex: Vec<DexConfig>,
}

#[async_trait]
impl ConfigLoader for DexCatalogFile {
    type SectionType = DexCatalogFile;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file(file_name).await
    }
}

impl ConfigLoaderSync for DexCatalogFile {
    type SectionType = DexCatalogFile;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file_sync(file_name)
    }
}

static BUILTIN_CATALOG: LazyLock<Arc<DexCatalog>> = LazyLock::new(|| {
    Arc::new(DexCatalog::from_dexes([
        DexConfig::arbitrum_camelot(),
        DexConfig::base_aerodrome_v2(),
        DexConfig::binance_pancakeswap_v2(),
        DexConfig::fantom_spookyswap_v2(),
        DexConfig::mainnet_uniswap_v2(),
    ]))
});

/// Router address -> DEX deployment lookup.
#[derive(Clone, Debug, Default)]
pub struct DexCatalog {
    by_router: HashMap<Address, Arc<DexConfig>>,
}

impl DexCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dexes(dexes: impl IntoIterator<Item = DexConfig>) -> Self {
        let mut catalog = Self::new();
        for dex in dexes {
            catalog.register(dex);
        }
        catalog
    }

    /// Deployments known at compile time.
    pub fn builtin() -> Arc<DexCatalog> {
        BUILTIN_CATALOG.clone()
    }

    /// Built-in deployments plus the `[[dex]]` entries of `file_name`. File entries win on conflict.
    pub fn builtin_with_file(file_name: String) -> Result<DexCatalog, LoadConfigError> {
        let file = DexCatalogFile::load_section_from_file_sync(file_name)?;
        let mut catalog = BUILTIN_CATALOG.as_ref().clone();
        for dex in file.dex {
            catalog.register(dex);
        }
        Ok(catalog)
    }

    pub fn register(&mut self, dex: DexConfig) -> Arc<DexConfig> {
        let dex = Arc::new(dex);
        self.by_router.insert(dex.router_address, dex.clone());
        dex
    }

    pub fn get(&self, router_address: &Address) -> Option<Arc<DexConfig>> {
        self.by_router.get(router_address).cloned()
    }

    pub fn contains(&self, dex: &DexConfig) -> bool {
        self.by_router.get(&dex.router_address).is_some_and(|known| known.as_ref() == dex)
    }

    /// Deployments on `chain_id`, ordered by router address.
    pub fn for_chain(&self, chain_id: u64) -> Vec<Arc<DexConfig>> {
        let mut dexes: Vec<Arc<DexConfig>> = self.by_router.values().filter(|dex| dex.chain_id == chain_id).cloned().collect();
        dexes.sort_by_key(|dex| dex.router_address);
        dexes
    }

    pub fn len(&self) -> usize {
        self.by_router.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_router.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config_loader::parse_config;
    use std::str::FromStr;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let catalog = DexCatalog::builtin();
        let lower = Address::from_str("0xcf77a3ba9a5ca399b7c97c74d54e5b1beb874e43").unwrap();

        let dex = catalog.get(&lower).unwrap();
        assert_eq!(dex.name, "Aerodrome V2");
        assert_eq!(dex.stable_formula, StableFormula::VariantA);
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_for_chain() {
        let catalog = DexCatalog::builtin();
        assert_eq!(catalog.for_chain(ChainId::BASE).len(), 1);
        assert!(catalog.for_chain(ChainId::OPTIMISM).is_empty());
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(AmountsOutShape::AddressArray.to_string(), "address[]");
        assert_eq!(ReservesShape::from_str("getReserves_112_112_16_16").unwrap(), ReservesShape::Uint112Uint112Uint16Uint16);
        assert_eq!(StableFormula::VariantB.to_string(), "variant_b");
    }

    #[test]
    fn test_parse_catalog_file() {
        let raw = r#"
[[dex]]
name = "Velodrome V1"
chain_id = 10
router_address = "0x9c12939390052919aF3155f41Bf4160Fd3666A6f"
factory_address = "0x25CbdDb98b35ab1FF77413456B31EC81A6B6B746"
amounts_out = "from_to_stable"
pair_lookup = "pairFor_A_B_stable"
reserves = "getReserves_256_256_256"
stable_formula = "variant_b"
"#;
        let file: DexCatalogFile = parse_config(raw).unwrap();
        let mut catalog = DexCatalog::new();
        for dex in file.dex {
            catalog.register(dex);
        }

        let dexes = catalog.for_chain(ChainId::OPTIMISM);
        assert_eq!(dexes.len(), 1);
        assert_eq!(dexes[0].pair_lookup, PairLookupShape::PairForStable);
        assert!(dexes[0].supports_stable());
        assert!(catalog.contains(&dexes[0]));
    }
}
