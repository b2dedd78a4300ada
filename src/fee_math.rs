//! EIP-4844 blob fee math shared by the blob subpool and the fee oracle.
//!
//! Per SPEC_FULL.md §14's resolution of the blob-base-fee Open Question,
//! `fake_exponential` is implemented as the literal truncating-integer-series
//! approximation specified by EIP-4844 itself (consensus-relevant: any
//! floating-point or closed-form approximation would diverge from mainnet
//! clients bit-for-bit), not a convenience float computation.

use crate::constants::{BLOB_BASE_FEE_UPDATE_FRACTION, FAKE_EXPONENTIAL_ITERATION_BOUND, MIN_BLOB_BASE_FEE, TARGET_BLOB_GAS_PER_BLOCK};

/// `fake_exponential(factor, numerator, denominator)` per EIP-4844: an
/// integer approximation of `factor * e**(numerator / denominator)`,
/// computed as a truncating accumulation series, never using floats.
pub fn fake_exponential(factor: u128, numerator: u128, denominator: u128) -> u128 {
    let mut i: u128 = 1;
    let mut output: u128 = 0;
    let mut numerator_accum = factor.saturating_mul(denominator);

    while numerator_accum > 0 {
        output = output.saturating_add(numerator_accum);
        numerator_accum = (numerator_accum.saturating_mul(numerator)) / (denominator.saturating_mul(i));
        i += 1;
        if i as u32 > FAKE_EXPONENTIAL_ITERATION_BOUND {
            break;
        }
    }
    (output / denominator).max(MIN_BLOB_BASE_FEE)
}

/// The blob base fee for a block with the given `excess_blob_gas` (EIP-4844
/// `get_blob_base_fee`).
pub fn blob_base_fee(excess_blob_gas: u64) -> u128 {
    fake_exponential(MIN_BLOB_BASE_FEE, excess_blob_gas as u128, BLOB_BASE_FEE_UPDATE_FRACTION)
}

/// Advances `excess_blob_gas` given the parent block's blob gas usage
/// (EIP-4844 `calc_excess_blob_gas`).
pub fn next_excess_blob_gas(parent_excess_blob_gas: u64, parent_blob_gas_used: u64) -> u64 {
    let total = parent_excess_blob_gas.saturating_add(parent_blob_gas_used);
    total.saturating_sub(TARGET_BLOB_GAS_PER_BLOCK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_excess_yields_floor_fee() {
        assert_eq!(blob_base_fee(0), MIN_BLOB_BASE_FEE);
    }

    #[test]
    fn fee_increases_monotonically_with_excess() {
        let low = blob_base_fee(1_000_000);
        let high = blob_base_fee(5_000_000);
        assert!(high > low);
    }

    #[test]
    fn excess_gas_progression_saturates_at_zero() {
        assert_eq!(next_excess_blob_gas(0, 0), 0);
        assert_eq!(next_excess_blob_gas(0, 100), 0);
    }

    #[test]
    fn excess_gas_progression_tracks_above_target() {
        let parent_excess = 1_000_000u64;
        let parent_used = TARGET_BLOB_GAS_PER_BLOCK + 200_000;
        assert_eq!(next_excess_blob_gas(parent_excess, parent_used), parent_excess + 200_000);
    }
}
