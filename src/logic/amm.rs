//! Integer AMM math.
//!
//! Every function mirrors the on-chain arithmetic: `U256` values, 1e18 fixed point where the
//! pools use it, truncating division. Overflow and division by zero surface as [`SolverError`]
//! so a single bad pool kills its path instead of the request.

use crate::utils::constants::MAX_NEWTON_ITERATIONS;
use alloy_primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// 1e18
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// `rust_decimal` keeps at most 28 fractional digits.
const MAX_DECIMAL_SCALE: u8 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("stable swap did not converge within {MAX_NEWTON_ITERATIONS} iterations")]
    NoConvergence,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("unsupported token decimals: {0}")]
    DecimalsMismatch(u8),
    #[error("stable leg on a DEX without a stable formula")]
    NoStableFormula,
}

fn add(a: U256, b: U256) -> Result<U256, SolverError> {
    a.checked_add(b).ok_or(SolverError::Overflow)
}

fn sub(a: U256, b: U256) -> Result<U256, SolverError> {
    a.checked_sub(b).ok_or(SolverError::Overflow)
}

fn mul(a: U256, b: U256) -> Result<U256, SolverError> {
    a.checked_mul(b).ok_or(SolverError::Overflow)
}

fn div(a: U256, b: U256) -> Result<U256, SolverError> {
    a.checked_div(b).ok_or(SolverError::DivisionByZero)
}

/// `10^decimals`.
pub fn pow10(decimals: u8) -> Result<U256, SolverError> {
    U256::from(10u8).checked_pow(U256::from(decimals)).ok_or(SolverError::DecimalsMismatch(decimals))
}

/// Raw integer amount to human units, truncated to 28 fractional digits.
pub fn to_decimal(value: U256, decimals: u8) -> Result<Decimal, SolverError> {
    let (whole, fraction) = value.div_rem(pow10(decimals)?);

    let whole = i128::try_from(whole).map_err(|_| SolverError::Overflow)?;
    let whole = Decimal::try_from_i128_with_scale(whole, 0).map_err(|_| SolverError::Overflow)?;

    let (fraction, scale) = if decimals > MAX_DECIMAL_SCALE {
        (fraction / pow10(decimals - MAX_DECIMAL_SCALE)?, MAX_DECIMAL_SCALE)
    } else {
        (fraction, decimals)
    };
    let fraction = i128::try_from(fraction).map_err(|_| SolverError::Overflow)?;
    let fraction = Decimal::try_from_i128_with_scale(fraction, u32::from(scale)).map_err(|_| SolverError::Overflow)?;

    whole.checked_add(fraction).ok_or(SolverError::Overflow)
}

fn to_wad(amount: U256, decimals_exp: U256) -> Result<U256, SolverError> {
    div(mul(amount, WAD)?, decimals_exp)
}

fn from_wad(amount: U256, decimals_exp: U256) -> Result<U256, SolverError> {
    div(mul(amount, decimals_exp)?, WAD)
}

/// Human-unit price of `token_in` in `token_out`: `reserve_out / reserve_in` after decimal shifting.
///
/// Divides exactly in `U256`, so reserves far beyond `Decimal`'s range still price as long as the
/// quotient fits. Fractional digits past 28 are truncated.
pub fn constant_product_ratio(reserve_in: U256, reserve_out: U256, decimals_in: u8, decimals_out: u8) -> Result<Decimal, SolverError> {
    if reserve_in.is_zero() {
        return Err(SolverError::DivisionByZero);
    }
    let numerator = mul(reserve_out, pow10(decimals_in)?)?;
    let denominator = mul(reserve_in, pow10(decimals_out)?)?;
    let (whole, mut remainder) = numerator.div_rem(denominator);

    let whole = i128::try_from(whole).map_err(|_| SolverError::Overflow)?;
    let whole = Decimal::try_from_i128_with_scale(whole, 0).map_err(|_| SolverError::Overflow)?;
    if remainder.is_zero() {
        return Ok(whole);
    }

    // long division, one digit at a time; remainder < denominator keeps `remainder * 10` in range
    let ten = U256::from(10u8);
    let mut fraction: i128 = 0;
    for _ in 0..MAX_DECIMAL_SCALE {
        let (digit, rest) = mul(remainder, ten)?.div_rem(denominator);
        remainder = rest;
        fraction = fraction * 10 + i128::try_from(digit).map_err(|_| SolverError::Overflow)?;
    }
    let fraction = Decimal::try_from_i128_with_scale(fraction, u32::from(MAX_DECIMAL_SCALE)).map_err(|_| SolverError::Overflow)?;

    whole.checked_add(fraction).map(|ratio| ratio.normalize()).ok_or(SolverError::Overflow)
}

/// `x * y = k` output for `amount_in`, fee-less.
pub fn constant_product_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256, SolverError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(SolverError::DivisionByZero);
    }
    div(mul(amount_in, reserve_out)?, add(reserve_in, amount_in)?)
}

/// `x³y + y³x` over raw reserves, each scaled to 1e18 by its own decimals.
fn stable_k(x: U256, y: U256, decimals0_exp: U256, decimals1_exp: U256) -> Result<U256, SolverError> {
    let x = to_wad(x, decimals0_exp)?;
    let y = to_wad(y, decimals1_exp)?;
    let a = div(mul(x, y)?, WAD)?;
    let b = add(div(mul(x, x)?, WAD)?, div(mul(y, y)?, WAD)?)?;
    div(mul(a, b)?, WAD)
}

/// Derivative of the invariant in `y`.
fn stable_d(x0: U256, y: U256) -> Result<U256, SolverError> {
    let y_sq = div(mul(y, y)?, WAD)?;
    let left = div(mul(mul(U256::from(3u8), x0)?, y_sq)?, WAD)?;
    let x0_sq = div(mul(x0, x0)?, WAD)?;
    let right = div(mul(x0_sq, x0)?, WAD)?;
    add(left, right)
}

fn f_variant_a(x0: U256, y: U256) -> Result<U256, SolverError> {
    let a = div(mul(x0, y)?, WAD)?;
    let b = add(div(mul(x0, x0)?, WAD)?, div(mul(y, y)?, WAD)?)?;
    div(mul(a, b)?, WAD)
}

fn f_variant_b(x0: U256, y: U256) -> Result<U256, SolverError> {
    let y_cubed = div(mul(div(mul(y, y)?, WAD)?, y)?, WAD)?;
    let x0_cubed = div(mul(div(mul(x0, x0)?, WAD)?, x0)?, WAD)?;
    add(div(mul(x0, y_cubed)?, WAD)?, div(mul(x0_cubed, y)?, WAD)?)
}

/// Newton solve for `y` with the neighbour checks of the Velodrome V2 pool.
fn get_y_variant_a(x0: U256, xy: U256, mut y: U256, decimals0_exp: U256, decimals1_exp: U256) -> Result<U256, SolverError> {
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let k = f_variant_a(x0, y)?;
        if k < xy {
            let mut dy = div(mul(xy - k, WAD)?, stable_d(x0, y)?)?;
            if dy.is_zero() {
                if k == xy {
                    return Ok(y);
                }
                // the on-chain pool re-scales here with the pool decimals; an overflowing
                // invariant is necessarily above the target
                let next = add(y, U256::from(1u8))?;
                let next_above = match stable_k(x0, next, decimals0_exp, decimals1_exp) {
                    Ok(next_k) => next_k > xy,
                    Err(SolverError::Overflow) => true,
                    Err(e) => return Err(e),
                };
                if next_above {
                    return Ok(next);
                }
                dy = U256::from(1u8);
            }
            y = add(y, dy)?;
        } else {
            let mut dy = div(mul(k - xy, WAD)?, stable_d(x0, y)?)?;
            if dy.is_zero() {
                if k == xy || f_variant_a(x0, sub(y, U256::from(1u8))?)? < xy {
                    return Ok(y);
                }
                dy = U256::from(1u8);
            }
            y = sub(y, dy)?;
        }
    }
    Err(SolverError::NoConvergence)
}

/// Newton solve for `y`, accepted once consecutive iterates differ by at most one unit.
fn get_y_variant_b(x0: U256, xy: U256, mut y: U256) -> Result<U256, SolverError> {
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let y_prev = y;
        let k = f_variant_b(x0, y)?;
        if k < xy {
            let dy = div(mul(xy - k, WAD)?, stable_d(x0, y)?)?;
            y = add(y, dy)?;
        } else {
            let dy = div(mul(k - xy, WAD)?, stable_d(x0, y)?)?;
            y = sub(y, dy)?;
        }
        if y.abs_diff(y_prev) <= U256::from(1u8) {
            return Ok(y);
        }
    }
    Err(SolverError::NoConvergence)
}

enum Variant {
    A,
    B,
}

fn stable_swap(
    variant: Variant,
    amount_in: U256,
    reserve0: U256,
    reserve1: U256,
    decimals0: u8,
    decimals1: u8,
    is_token0: bool,
) -> Result<U256, SolverError> {
    if amount_in.is_zero() {
        return Ok(U256::ZERO);
    }
    let decimals0_exp = pow10(decimals0)?;
    let decimals1_exp = pow10(decimals1)?;

    let xy = stable_k(reserve0, reserve1, decimals0_exp, decimals1_exp)?;
    let reserve0 = to_wad(reserve0, decimals0_exp)?;
    let reserve1 = to_wad(reserve1, decimals1_exp)?;

    let (reserve_a, reserve_b, exp_in, exp_out) =
        if is_token0 { (reserve0, reserve1, decimals0_exp, decimals1_exp) } else { (reserve1, reserve0, decimals1_exp, decimals0_exp) };

    let amount_in = to_wad(amount_in, exp_in)?;
    let x0 = add(amount_in, reserve_a)?;
    let y = match variant {
        Variant::A => get_y_variant_a(x0, xy, reserve_b, decimals0_exp, decimals1_exp)?,
        Variant::B => get_y_variant_b(x0, xy, reserve_b)?,
    };

    from_wad(sub(reserve_b, y)?, exp_out)
}

/// Output of a `x³y + y³x` pool (Velodrome V2 / Aerodrome rounding). Fee-less.
///
/// `reserve0`/`reserve1` and `decimals0`/`decimals1` are in pool order; `is_token0` tells
/// whether `amount_in` is denominated in token0.
pub fn stable_swap_variant_a(
    amount_in: U256,
    reserve0: U256,
    reserve1: U256,
    decimals0: u8,
    decimals1: u8,
    is_token0: bool,
) -> Result<U256, SolverError> {
    stable_swap(Variant::A, amount_in, reserve0, reserve1, decimals0, decimals1, is_token0)
}

/// Output of a `x³y + y³x` pool (Solidly V1 rounding). Fee-less.
pub fn stable_swap_variant_b(
    amount_in: U256,
    reserve0: U256,
    reserve1: U256,
    decimals0: u8,
    decimals1: u8,
    is_token0: bool,
) -> Result<U256, SolverError> {
    stable_swap(Variant::B, amount_in, reserve0, reserve1, decimals0, decimals1, is_token0)
}
