//! Canonical string form of a [`SwapPath`].
//!
//! A leg is written as `<router>-<from>:<fromDecimals>-<to>:<toDecimals>-<stable>` with
//! checksummed addresses, and legs are joined by `|`:
//!
//! ```text
//! 0xcF77...4E43-0x4200...0006:18-0x8335...2913:6-false|0xcF77...4E43-0x8335...2913:6-0x50c5...B0Cb:18-true
//! ```
//!
//! The DEX is re-resolved from its router address on decode and tokens take the DEX's chain.

use super::swap_path::{PathLeg, SwapPath};
use crate::utils::{DexCatalog, Token};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub const LEG_SEPARATOR: char = '|';
pub const FIELD_SEPARATOR: char = '-';
pub const DECIMALS_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed leg `{leg}`: {reason}")]
    Malformed { leg: String, reason: &'static str },
    #[error("unknown router {0}")]
    UnknownRouter(Address),
    #[error("legs of `{0}` are not connected")]
    Discontinuous(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressedPath(String);

impl CompressedPath {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Leg count without decoding.
    pub fn hop_count(&self) -> usize {
        if self.0.is_empty() { 0 } else { self.0.matches(LEG_SEPARATOR).count() + 1 }
    }
}

impl Display for CompressedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompressedPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

fn compress_leg(leg: &PathLeg) -> String {
    format!(
        "{router}{sep}{from}{dsep}{from_decimals}{sep}{to}{dsep}{to_decimals}{sep}{stable}",
        router = leg.dex.router_address.to_checksum(None),
        from = leg.from.checksummed(),
        from_decimals = leg.from.get_decimals(),
        to = leg.to.checksummed(),
        to_decimals = leg.to.get_decimals(),
        stable = leg.stable,
        sep = FIELD_SEPARATOR,
        dsep = DECIMALS_SEPARATOR,
    )
}

pub fn compress_path(path: &SwapPath) -> CompressedPath {
    let legs: Vec<String> = path.legs().iter().map(compress_leg).collect();
    CompressedPath(legs.join(&LEG_SEPARATOR.to_string()))
}

pub fn compress_paths(paths: &[SwapPath]) -> Vec<CompressedPath> {
    paths.iter().map(compress_path).collect()
}

fn malformed(leg: &str, reason: &'static str) -> CodecError {
    CodecError::Malformed { leg: leg.to_string(), reason }
}

fn parse_token(leg: &str, field: &str, chain_id: u64) -> Result<Token, CodecError> {
    let (address, decimals) = field.split_once(DECIMALS_SEPARATOR).ok_or_else(|| malformed(leg, "token field without decimals"))?;
    let address = Address::from_str(address).map_err(|_| malformed(leg, "invalid token address"))?;
    let decimals = u8::from_str(decimals).map_err(|_| malformed(leg, "invalid token decimals"))?;
    Ok(Token::new(address, chain_id, decimals))
}

fn decompress_leg(leg: &str, catalog: &DexCatalog) -> Result<PathLeg, CodecError> {
    let fields: Vec<&str> = leg.split(FIELD_SEPARATOR).collect();
    let [router, from, to, stable] = fields.as_slice() else {
        return Err(malformed(leg, "expected four fields"));
    };

    let router = Address::from_str(router).map_err(|_| malformed(leg, "invalid router address"))?;
    let dex = catalog.get(&router).ok_or(CodecError::UnknownRouter(router))?;
    let from = parse_token(leg, from, dex.chain_id)?;
    let to = parse_token(leg, to, dex.chain_id)?;
    let stable = match *stable {
        "true" => true,
        "false" => false,
        _ => return Err(malformed(leg, "stable flag must be true or false")),
    };

    Ok(PathLeg::new(dex, Arc::new(from), Arc::new(to), stable))
}

pub fn decompress_path(compressed: &CompressedPath, catalog: &DexCatalog) -> Result<SwapPath, CodecError> {
    let legs = compressed.as_str().split(LEG_SEPARATOR).map(|leg| decompress_leg(leg, catalog)).collect::<Result<Vec<_>, _>>()?;
    SwapPath::new(legs).map_err(|_| CodecError::Discontinuous(compressed.to_string()))
}

/// Decodes every path, dropping (and logging) the ones that fail.
pub fn decompress_paths(compressed: &[CompressedPath], catalog: &DexCatalog) -> Vec<SwapPath> {
    compressed
        .iter()
        .filter_map(|path| match decompress_path(path, catalog) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(path = %path, error = %e, "Dropping undecodable path");
                None
            }
        })
        .collect()
}
