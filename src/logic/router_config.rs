use crate::data_sync::SyncConfig;
use crate::utils::config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync};
use crate::utils::constants::DEFAULT_MAX_HOPS;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct RouterConfigRoot {
    pub router: RouterConfigSection,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfigSection {
    /// Tokens path finding may route through
    #[serde(default)]
    pub hub_nodes: Vec<Address>,
    #[serde(default = "default_max_hops")]
    pub max_hops: u8,
}

fn default_max_hops() -> u8 {
    DEFAULT_MAX_HOPS
}

impl RouterConfigSection {
    pub fn with_max_hops(&self, max_hops: u8) -> Self {
        Self { hub_nodes: self.hub_nodes.clone(), max_hops }
    }

    pub fn with_hub_nodes(&self, hub_nodes: Vec<Address>) -> Self {
        Self { hub_nodes, max_hops: self.max_hops }
    }
}

impl Default for RouterConfigSection {
    fn default() -> Self {
        Self { hub_nodes: Vec::new(), max_hops: DEFAULT_MAX_HOPS }
    }
}

#[async_trait]
impl ConfigLoader for RouterConfigSection {
    type SectionType = RouterConfigSection;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file(file_name).await?;
        Ok(root.router)
    }
}

impl ConfigLoaderSync for RouterConfigSection {
    type SectionType = RouterConfigSection;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.router)
    }
}

#[async_trait]
impl ConfigLoader for SyncConfig {
    type SectionType = SyncConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file(file_name).await?;
        root.sync.validate().map_err(|e| LoadConfigError::ConfigError(e.to_string()))?;
        Ok(root.sync)
    }
}

impl ConfigLoaderSync for SyncConfig {
    type SectionType = SyncConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file_sync(file_name)?;
        root.sync.validate().map_err(|e| LoadConfigError::ConfigError(e.to_string()))?;
        Ok(root.sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config_loader::parse_config;
    use crate::utils::constants::{BASE_USDC, BASE_WETH};

    #[test]
    fn test_parse_router_section() {
        let root: RouterConfigRoot = parse_config(
            r#"
            [router]
            hub_nodes = ["0x4200000000000000000000000000000000000006", "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"]
            max_hops = 2

            [sync]
            chunk_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(root.router.hub_nodes, vec![BASE_WETH, BASE_USDC]);
        assert_eq!(root.router.max_hops, 2);
        assert_eq!(root.sync.chunk_size, 100);
        assert_eq!(root.sync.sync_interval_secs, 300);
    }

    #[test]
    fn test_defaults() {
        let root: RouterConfigRoot = parse_config("[router]").unwrap();
        assert_eq!(root.router, RouterConfigSection::default());
        assert_eq!(root.sync, SyncConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse_config::<RouterConfigRoot>("[router]\nhubs = []").is_err());
    }
}
