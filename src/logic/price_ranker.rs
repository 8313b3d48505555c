use super::amm::{self, SolverError};
use super::graph::{CodecError, CompressedPath, PathLeg, SwapPath, decompress_path};
use super::reserves::{LegReserves, RawLegReserves, decode_reserves};
use crate::router_error::{RouterError, RouterErrorCode};
use crate::utils::constants::SpectrumRouterAddress;
use crate::utils::{DexCatalog, StableFormula};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::{debug, error, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Highest,
    Lowest,
}

/// On-chain read of the pools behind a path.
#[async_trait]
pub trait ReserveReader: Send + Sync {
    /// `getReserves()` return data and `token0()` of every leg's pool, in leg order.
    async fn read_reserves(&self, path: &SwapPath) -> eyre::Result<Vec<RawLegReserves>>;
}

#[derive(Clone, Debug)]
pub struct RankedQuote {
    pub amount_out: U256,
    /// `amount_out` in units of the output token
    pub amount_out_decimal: Decimal,
    pub path: SwapPath,
    pub compressed_path: CompressedPath,
}

#[derive(Clone, Debug, Default)]
pub struct QuoteResponse {
    /// None when no path produced a positive amount
    pub quote: Option<RankedQuote>,
    pub error: Option<RouterErrorCode>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceResponse {
    /// Units of `token_out` per unit of `token_in`; None when a leg could not be priced
    pub price: Option<Decimal>,
    pub error: Option<RouterErrorCode>,
}

/// Ranks candidate paths by simulated output and prices paths from their reserves.
pub struct PriceRanker {
    catalog: Arc<DexCatalog>,
}

impl PriceRanker {
    pub fn new(catalog: Arc<DexCatalog>) -> Self {
        Self { catalog }
    }

    /// Request-level checks shared by quoting and pricing.
    pub fn validate(chain_id: u64, token_in: &Address, token_out: &Address, path_count: usize) -> Option<RouterErrorCode> {
        if SpectrumRouterAddress::for_chain(chain_id).is_none() {
            Some(RouterErrorCode::UnknownChainId)
        } else if token_in == token_out {
            Some(RouterErrorCode::UnnecessaryRequest)
        } else if path_count == 0 {
            Some(RouterErrorCode::EmptyRoute)
        } else {
            None
        }
    }

    /// Decodes the reserve reads of every leg. A read count that differs from the leg count is a
    /// broken reader and fails the whole request.
    pub fn decode_path_reserves(path: &SwapPath, raw: &[RawLegReserves]) -> Result<Vec<LegReserves>, RouterError> {
        if raw.len() != path.len() {
            error!(path = %path, legs = path.len(), results = raw.len(), "Reserve reads do not match the path legs");
            return Err(RouterError::LegCountMismatch { legs: path.len(), results: raw.len() });
        }
        path.legs().iter().zip(raw).map(|(leg, raw)| decode_reserves(leg.dex.reserves, raw).map_err(RouterError::from)).collect()
    }

    /// Output of one leg for `amount_in`. Stable legs use the DEX's stable formula, volatile
    /// legs the constant product.
    pub fn leg_amount_out(leg: &PathLeg, reserves: &LegReserves, amount_in: U256) -> Result<U256, SolverError> {
        let from = leg.from.get_address();
        if !leg.stable {
            let (reserve_in, reserve_out) = reserves.oriented(from);
            return amm::constant_product_amount_out(amount_in, reserve_in, reserve_out);
        }

        let is_token0 = from == reserves.token0;
        let (decimals0, decimals1) =
            if is_token0 { (leg.from.get_decimals(), leg.to.get_decimals()) } else { (leg.to.get_decimals(), leg.from.get_decimals()) };
        match leg.dex.stable_formula {
            StableFormula::VariantA => amm::stable_swap_variant_a(amount_in, reserves.reserve0, reserves.reserve1, decimals0, decimals1, is_token0),
            StableFormula::VariantB => amm::stable_swap_variant_b(amount_in, reserves.reserve0, reserves.reserve1, decimals0, decimals1, is_token0),
            StableFormula::None => Err(SolverError::NoStableFormula),
        }
    }

    /// Runs `amount_in` through every leg, each leg's output feeding the next.
    pub fn simulate_amount_out(path: &SwapPath, reserves: &[LegReserves], amount_in: U256) -> Result<U256, RouterError> {
        if reserves.len() != path.len() {
            return Err(RouterError::LegCountMismatch { legs: path.len(), results: reserves.len() });
        }
        let mut amount = amount_in;
        for (leg, leg_reserves) in path.legs().iter().zip(reserves) {
            amount = Self::leg_amount_out(leg, leg_reserves, amount)?;
        }
        Ok(amount)
    }

    /// Picks the extreme amount. The first path reaching it wins; a zero extreme is no winner.
    pub fn select(outcomes: Vec<(SwapPath, U256)>, selection: Selection) -> Option<(SwapPath, U256)> {
        let mut best: Option<(SwapPath, U256)> = None;
        for (path, amount) in outcomes {
            let better = match &best {
                None => true,
                Some((_, best_amount)) => match selection {
                    Selection::Highest => amount > *best_amount,
                    Selection::Lowest => amount < *best_amount,
                },
            };
            if better {
                best = Some((path, amount));
            }
        }
        best.filter(|(_, amount)| !amount.is_zero())
    }

    /// Quotes `amount_in` over every path and returns the selected one.
    ///
    /// Paths whose reserves cannot be read or decoded, or whose math fails, are left out. A
    /// reader returning the wrong number of legs fails the request.
    #[allow(clippy::too_many_arguments)]
    pub async fn quote(
        &self,
        reader: &dyn ReserveReader,
        chain_id: u64,
        token_in: &Address,
        token_out: &Address,
        amount_in: U256,
        paths: &[SwapPath],
        selection: Selection,
    ) -> Result<QuoteResponse, RouterError> {
        if let Some(code) = Self::validate(chain_id, token_in, token_out, paths.len()) {
            return Ok(QuoteResponse { quote: None, error: Some(code) });
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = match reader.read_reserves(path).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to read reserves, skipping path");
                    continue;
                }
            };
            let reserves = match Self::decode_path_reserves(path, &raw) {
                Ok(reserves) => reserves,
                Err(e @ RouterError::LegCountMismatch { .. }) => return Err(e),
                Err(e) => {
                    warn!(path = %path, error = %e, "Undecodable reserves, skipping path");
                    continue;
                }
            };
            match Self::simulate_amount_out(path, &reserves, amount_in) {
                Ok(amount_out) => outcomes.push((path.clone(), amount_out)),
                Err(e) => debug!(path = %path, error = %e, "Path excluded from ranking"),
            }
        }

        let Some((path, amount_out)) = Self::select(outcomes, selection) else {
            return Ok(QuoteResponse::default());
        };
        let amount_out_decimal = match path.token_out() {
            Some(token) => token.to_decimal(amount_out)?,
            None => Decimal::ZERO,
        };
        let compressed_path = path.compressed();
        Ok(QuoteResponse { quote: Some(RankedQuote { amount_out, amount_out_decimal, path, compressed_path }), error: None })
    }

    /// [`Self::quote`] over compressed paths. Paths that fail to decode are dropped; when none
    /// decodes and one named an unknown router, the response carries `UNKNOWN_ROUTER`.
    #[allow(clippy::too_many_arguments)]
    pub async fn quote_compressed(
        &self,
        reader: &dyn ReserveReader,
        chain_id: u64,
        token_in: &Address,
        token_out: &Address,
        amount_in: U256,
        paths: &[CompressedPath],
        selection: Selection,
    ) -> Result<QuoteResponse, RouterError> {
        let mut decoded = Vec::with_capacity(paths.len());
        let mut unknown_router = false;
        for compressed in paths {
            match decompress_path(compressed, &self.catalog) {
                Ok(path) => decoded.push(path),
                Err(e) => {
                    warn!(path = %compressed, error = %e, "Dropping undecodable path");
                    unknown_router |= matches!(e, CodecError::UnknownRouter(_));
                }
            }
        }

        if decoded.is_empty() && unknown_router {
            let code = Self::validate(chain_id, token_in, token_out, paths.len()).unwrap_or(RouterErrorCode::UnknownRouter);
            return Ok(QuoteResponse { quote: None, error: Some(code) });
        }
        self.quote(reader, chain_id, token_in, token_out, amount_in, &decoded, selection).await
    }

    /// Spot price of the path's input in its output: the product of per-leg multipliers.
    ///
    /// A stable leg's multiplier is the output for one whole input token; a volatile leg's is the
    /// reserve ratio. Returns None when any leg cannot be priced.
    pub fn spot_price(path: &SwapPath, raw: &[RawLegReserves]) -> Result<Option<Decimal>, RouterError> {
        let reserves = Self::decode_path_reserves(path, raw)?;

        let mut price = Decimal::ONE;
        for (leg, leg_reserves) in path.legs().iter().zip(&reserves) {
            let multiplier = match Self::leg_multiplier(leg, leg_reserves) {
                Ok(multiplier) => multiplier,
                Err(e) => {
                    debug!(leg = %leg, error = %e, "Leg cannot be priced");
                    return Ok(None);
                }
            };
            let Some(next) = price.checked_mul(multiplier) else {
                return Ok(None);
            };
            price = next;
        }
        Ok(Some(price))
    }

    fn leg_multiplier(leg: &PathLeg, reserves: &LegReserves) -> Result<Decimal, SolverError> {
        if leg.stable {
            let one = leg.from.get_exp()?;
            let amount_out = Self::leg_amount_out(leg, reserves, one)?;
            return leg.to.to_decimal(amount_out);
        }
        let (reserve_in, reserve_out) = reserves.oriented(leg.from.get_address());
        amm::constant_product_ratio(reserve_in, reserve_out, leg.from.get_decimals(), leg.to.get_decimals())
    }

    /// Reads the path's reserves and prices it.
    pub async fn price(
        &self,
        reader: &dyn ReserveReader,
        chain_id: u64,
        token_in: &Address,
        token_out: &Address,
        path: &SwapPath,
    ) -> Result<PriceResponse, RouterError> {
        if let Some(code) = Self::validate(chain_id, token_in, token_out, path.len()) {
            return Ok(PriceResponse { price: None, error: Some(code) });
        }
        let raw = match reader.read_reserves(path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read reserves for pricing");
                return Ok(PriceResponse::default());
            }
        };
        Ok(PriceResponse { price: Self::spot_price(path, &raw)?, error: None })
    }
}
