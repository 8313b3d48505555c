use crate::utils::dex_catalog::ReservesShape;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use thiserror::Error;

mod abi {
    use alloy_sol_types::sol;

    sol! {
        interface IUniswapV2PairReserves {
            function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        }

        interface ICamelotPairReserves {
            function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint16 token0FeePercent, uint16 token1FeePercent);
        }

        interface ISolidlyPoolReserves {
            function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint256 blockTimestampLast);
        }
    }
}

#[derive(Debug, Error)]
pub enum ReservesError {
    #[error("failed to decode {shape} return data: {source}")]
    Decode {
        shape: ReservesShape,
        #[source]
        source: alloy_sol_types::Error,
    },
}

/// Raw `getReserves()` return data for one leg, as read from chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLegReserves {
    /// `token0()` of the pair, which fixes the order of the reserves
    pub token0: Address,
    pub data: Bytes,
}

/// Decoded reserves of one leg in pool order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LegReserves {
    pub token0: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl LegReserves {
    /// `(reserve_in, reserve_out)` for a swap starting at `from`.
    pub fn oriented(&self, from: Address) -> (U256, U256) {
        if from == self.token0 { (self.reserve0, self.reserve1) } else { (self.reserve1, self.reserve0) }
    }
}

pub fn decode_reserves(shape: ReservesShape, raw: &RawLegReserves) -> Result<LegReserves, ReservesError> {
    let data = raw.data.as_ref();
    let (reserve0, reserve1) = match shape {
        ReservesShape::Uint112Uint112Uint32 => {
            let ret = abi::IUniswapV2PairReserves::getReservesCall::abi_decode_returns(data).map_err(|source| ReservesError::Decode { shape, source })?;
            (U256::from(ret.reserve0), U256::from(ret.reserve1))
        }
        ReservesShape::Uint112Uint112Uint16Uint16 => {
            let ret = abi::ICamelotPairReserves::getReservesCall::abi_decode_returns(data).map_err(|source| ReservesError::Decode { shape, source })?;
            (U256::from(ret.reserve0), U256::from(ret.reserve1))
        }
        ReservesShape::Uint256Uint256Uint256 => {
            let ret = abi::ISolidlyPoolReserves::getReservesCall::abi_decode_returns(data).map_err(|source| ReservesError::Decode { shape, source })?;
            (ret.reserve0, ret.reserve1)
        }
    };

    Ok(LegReserves { token0: raw.token0, reserve0, reserve1 })
}
