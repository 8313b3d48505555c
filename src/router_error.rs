use crate::logic::amm::SolverError;
use crate::logic::graph::CodecError;
use crate::logic::reserves::ReservesError;
use crate::utils::StoreError;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Code carried in query responses instead of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouterErrorCode {
    /// No path connects the tokens, or no path produced a quote
    EmptyRoute,
    /// `token_in == token_out`
    UnnecessaryRequest,
    /// No router (or no aggregation router deployment) for the chain
    UnknownChainId,
    UnknownTokenIn,
    UnknownTokenOut,
    /// A compressed path names a router missing from the DEX catalog
    UnknownRouter,
    /// The backing store failed; the query may succeed later
    StoreUnavailable,
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("request rejected: {0}")]
    Rejected(RouterErrorCode),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Reserves(#[from] ReservesError),
    #[error("path has {legs} legs but {results} reserve results were returned")]
    LegCountMismatch { legs: usize, results: usize },
    #[error("malformed pool {pair}: {reason}")]
    MalformedPool { pair: Address, reason: String },
    #[error("router misconfigured: {0}")]
    Config(String),
}

impl RouterError {
    /// Response code for errors a caller can act on.
    pub fn code(&self) -> Option<RouterErrorCode> {
        match self {
            RouterError::Rejected(code) => Some(*code),
            RouterError::Store(_) => Some(RouterErrorCode::StoreUnavailable),
            RouterError::Codec(CodecError::UnknownRouter(_)) => Some(RouterErrorCode::UnknownRouter),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_code_names() {
        assert_eq!(RouterErrorCode::UnknownChainId.to_string(), "UNKNOWN_CHAIN_ID");
        assert_eq!(RouterErrorCode::EmptyRoute.to_string(), "EMPTY_ROUTE");
        assert_eq!(RouterErrorCode::from_str("UNNECESSARY_REQUEST").unwrap(), RouterErrorCode::UnnecessaryRequest);
        assert_eq!(serde_json::to_string(&RouterErrorCode::UnknownTokenIn).unwrap(), "\"UNKNOWN_TOKEN_IN\"");
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(RouterError::Rejected(RouterErrorCode::EmptyRoute).code(), Some(RouterErrorCode::EmptyRoute));
        assert_eq!(RouterError::Store(StoreError::Unavailable("down".to_string())).code(), Some(RouterErrorCode::StoreUnavailable));
        assert_eq!(RouterError::Codec(CodecError::UnknownRouter(Address::ZERO)).code(), Some(RouterErrorCode::UnknownRouter));
        assert_eq!(RouterError::LegCountMismatch { legs: 2, results: 1 }.code(), None);
    }
}
