use crate::logic::amm::{self, SolverError};
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An ERC-20 token on a specific chain.
///
/// Identity is the `(address, chain_id)` pair. `Address` stores raw bytes, so two
/// spellings of the same hex string that differ only in case are the same token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    address: Address,
    chain_id: u64,
    decimals: u8,
}

pub type TokenWrapper = Arc<Token>;

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.chain_id.hash(state);
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.chain_id == other.chain_id
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address).then(self.chain_id.cmp(&other.chain_id))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.checksummed(), self.chain_id)
    }
}

impl Token {
    pub fn new(address: Address, chain_id: u64, decimals: u8) -> Token {
        Token { address, chain_id, decimals }
    }

    // For testing purposes
    pub fn random(chain_id: u64) -> Token {
        Token::new(Address::random(), chain_id, 18)
    }

    // For testing purposes
    pub fn repeat_byte(byte: u8, chain_id: u64) -> Token {
        Token::new(Address::repeat_byte(byte), chain_id, 18)
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn get_chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    /// `10^decimals`, the raw amount of one whole token.
    pub fn get_exp(&self) -> Result<U256, SolverError> {
        amm::pow10(self.decimals)
    }

    /// EIP-55 checksummed address.
    pub fn checksummed(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Converts a raw integer amount into human units.
    pub fn to_decimal(&self, value: U256) -> Result<Decimal, SolverError> {
        amm::to_decimal(value, self.decimals)
    }
}
