use super::graph::CompressedPath;
use crate::router_error::{RouterError, RouterErrorCode};
use crate::utils::Token;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// One pool as reported by a pool source. Decomposed into the graph, never stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub token0: Token,
    pub token1: Token,
    pub stable: bool,
    pub block_number: u64,
    pub pair_address: Address,
}

impl PoolRecord {
    /// Rejects records that cannot belong to a pool on `chain_id`.
    pub fn validate(&self, chain_id: u64) -> Result<(), RouterError> {
        let malformed = |reason: &str| RouterError::MalformedPool { pair: self.pair_address, reason: reason.to_string() };

        if self.token0.get_address() == self.token1.get_address() {
            return Err(malformed("token0 and token1 are the same token"));
        }
        if self.token0.get_address().is_zero() || self.token1.get_address().is_zero() {
            return Err(malformed("zero token address"));
        }
        if self.token0.get_chain_id() != chain_id || self.token1.get_chain_id() != chain_id {
            return Err(malformed("token chain does not match the DEX chain"));
        }
        Ok(())
    }
}

/// Result of a path query: possibly empty paths plus an optional error code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsResponse {
    pub paths: Vec<CompressedPath>,
    pub error: Option<RouterErrorCode>,
}

impl PathsResponse {
    pub fn found(paths: Vec<CompressedPath>) -> Self {
        if paths.is_empty() { Self::rejected(RouterErrorCode::EmptyRoute) } else { Self { paths, error: None } }
    }

    pub fn rejected(code: RouterErrorCode) -> Self {
        Self { paths: Vec::new(), error: Some(code) }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
