use super::swap_path::SwapPath;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which pool kinds exist for a token pair on one DEX.
///
/// Observations only ever widen the value: `stable` and `volatile` join to `stable_volatile`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    Stable,
    Volatile,
    StableVolatile,
}

impl Volatility {
    pub fn from_stable_flag(stable: bool) -> Self {
        if stable { Volatility::Stable } else { Volatility::Volatile }
    }

    /// Least upper bound of two observations.
    pub fn join(self, other: Volatility) -> Volatility {
        if self == other { self } else { Volatility::StableVolatile }
    }

    /// New value after observing `observed` on a pair currently at `current`.
    pub fn widen(current: Option<Volatility>, observed: Volatility) -> Volatility {
        current.map_or(observed, |current| current.join(observed))
    }

    pub fn has_stable_pool(&self) -> bool {
        matches!(self, Volatility::Stable | Volatility::StableVolatile)
    }

    pub fn has_volatile_pool(&self) -> bool {
        matches!(self, Volatility::Volatile | Volatility::StableVolatile)
    }
}

/// Expands a path of volatile legs into one variant per pool combination.
///
/// `volatilities[i]` belongs to leg `i`. Pure `stable` legs are flipped on every variant;
/// each `stable_volatile` leg doubles the variants, so `k` such legs give `2^k` paths. The
/// all-volatile (for mixed legs) variant comes first.
pub fn fork_by_volatility(base: &SwapPath, volatilities: &[Volatility]) -> Vec<SwapPath> {
    let mut first = base.clone();
    for (index, volatility) in volatilities.iter().enumerate() {
        first.set_stable(index, *volatility == Volatility::Stable);
    }

    let mut variants = vec![first];
    for (index, volatility) in volatilities.iter().enumerate() {
        if *volatility != Volatility::StableVolatile {
            continue;
        }
        let forked: Vec<SwapPath> = variants
            .iter()
            .map(|variant| {
                let mut variant = variant.clone();
                variant.set_stable(index, true);
                variant
            })
            .collect();
        variants.extend(forked);
    }
    variants
}
