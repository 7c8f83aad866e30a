//! Data-gas (blob gas) pricing.
//!
//! The unit price follows an exponential curve over the block's excess data
//! gas, approximated with the integer Taylor expansion below.

use crate::types::{narrow, U256, U512};

/// Data gas charged per referenced blob.
pub const DATA_GAS_PER_BLOB: u64 = 1 << 17;

/// Floor of the data-gas unit price.
pub const MIN_DATA_GASPRICE: u64 = 1;

/// Controls how fast the price reacts to excess data gas.
pub const DATA_GASPRICE_UPDATE_FRACTION: u64 = 2_225_652;

/// Approximate `factor * e ** (numerator / denominator)` with integer math.
///
/// Returns `None` if an intermediate leaves the 512-bit range, if the result
/// does not fit 256 bits, or if `denominator` is zero.
pub fn fake_exponential(factor: U256, numerator: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let factor = U512::from(factor);
    let numerator = U512::from(numerator);
    let denominator = U512::from(denominator);

    let mut i = U512::one();
    let mut output = U512::zero();
    let mut accum = factor.checked_mul(denominator)?;
    while !accum.is_zero() {
        output = output.checked_add(accum)?;
        accum = accum
            .checked_mul(numerator)?
            .checked_div(denominator.checked_mul(i)?)?;
        i = i.checked_add(U512::one())?;
    }
    narrow(output / denominator)
}

/// Current data-gas unit price for a block with the given excess data gas.
///
/// `None` means the price left the 256-bit range.
pub fn data_gas_price(excess_data_gas: U256) -> Option<U256> {
    fake_exponential(
        U256::from(MIN_DATA_GASPRICE),
        excess_data_gas,
        U256::from(DATA_GASPRICE_UPDATE_FRACTION),
    )
}
