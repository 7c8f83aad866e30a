//! Gas accounting for Meridian transaction execution.
//!
//! Two concerns live here: the intrinsic gas a message must carry before any
//! execution, and the block-wide gas budget every message draws from.

use core::fmt;

use crate::config::IntrinsicGasRules;
use crate::error::{TransitionError, TransitionResult};
use crate::types::AccessList;

// ── Intrinsic gas constants ──

/// Base cost of a message that is not a contract creation.
pub const TX_GAS: u64 = 21_000;

/// Base cost of a contract creation once Homestead is active.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Per-byte cost of a zero payload byte.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Per-byte cost of a non-zero payload byte before EIP-2028.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;

/// Per-byte cost of a non-zero payload byte after EIP-2028.
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;

/// Cost per address declared in an access list.
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;

/// Cost per storage key declared in an access list.
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;

// ── Refund quotients ──

/// Maximum refund is `gas_used / REFUND_QUOTIENT` before London.
pub const REFUND_QUOTIENT: u64 = 2;

/// Maximum refund is `gas_used / REFUND_QUOTIENT_EIP3529` from London on.
pub const REFUND_QUOTIENT_EIP3529: u64 = 5;

/// Compute the intrinsic gas of a message.
///
/// Every term is added with an overflow check; a payload large enough to wrap
/// the accumulator is rejected with [`TransitionError::GasUintOverflow`].
/// `access_list` distinguishes absent (`None`) from empty.
pub fn intrinsic_gas(
    data: &[u8],
    access_list: Option<&AccessList>,
    is_contract_creation: bool,
    rules: IntrinsicGasRules,
) -> TransitionResult<u64> {
    let mut gas = if is_contract_creation && rules.homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    if !data.is_empty() {
        let non_zero = data.iter().filter(|b| **b != 0).count() as u64;
        let zero = data.len() as u64 - non_zero;

        let non_zero_gas = if rules.eip2028 {
            TX_DATA_NON_ZERO_GAS_EIP2028
        } else {
            TX_DATA_NON_ZERO_GAS_FRONTIER
        };
        gas = add_term(gas, non_zero, non_zero_gas)?;
        gas = add_term(gas, zero, TX_DATA_ZERO_GAS)?;
    }

    if let Some(list) = access_list {
        gas = add_term(gas, list.addresses() as u64, TX_ACCESS_LIST_ADDRESS_GAS)?;
        gas = add_term(gas, list.storage_keys() as u64, TX_ACCESS_LIST_STORAGE_KEY_GAS)?;
    }

    Ok(gas)
}

/// `acc + count * rate`, or `GasUintOverflow`.
fn add_term(acc: u64, count: u64, rate: u64) -> TransitionResult<u64> {
    count
        .checked_mul(rate)
        .and_then(|term| acc.checked_add(term))
        .ok_or(TransitionError::GasUintOverflow)
}

/// Block-wide gas budget shared by every message in a block.
///
/// Reservations either apply in full or not at all. Releases only ever
/// return gas previously reserved.
pub trait GasBudget {
    /// Reserve `amount` ordinary gas.
    fn sub_gas(&mut self, amount: u64) -> TransitionResult<()>;

    /// Return `amount` ordinary gas to the budget.
    fn add_gas(&mut self, amount: u64);

    /// Reserve `amount` data gas.
    fn sub_data_gas(&mut self, amount: u64) -> TransitionResult<()>;

    /// Return `amount` data gas to the budget.
    fn add_data_gas(&mut self, amount: u64);

    /// Ordinary gas left in the block.
    fn gas(&self) -> u64;

    /// Data gas left in the block.
    fn data_gas(&self) -> u64;
}

/// In-memory block gas budget with separate ordinary and data-gas counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasPool {
    gas: u64,
    data_gas: u64,
}

impl GasPool {
    /// Create a pool holding `gas` ordinary gas and `data_gas` data gas.
    pub fn new(gas: u64, data_gas: u64) -> Self {
        Self { gas, data_gas }
    }
}

impl GasBudget for GasPool {
    /// Checked before applying, so on error the counter is unchanged.
    fn sub_gas(&mut self, amount: u64) -> TransitionResult<()> {
        self.gas = self
            .gas
            .checked_sub(amount)
            .ok_or(TransitionError::GasLimitReached {
                available: self.gas,
                requested: amount,
            })?;
        Ok(())
    }

    fn add_gas(&mut self, amount: u64) {
        self.gas = self.gas.saturating_add(amount);
    }

    fn sub_data_gas(&mut self, amount: u64) -> TransitionResult<()> {
        self.data_gas = self
            .data_gas
            .checked_sub(amount)
            .ok_or(TransitionError::DataGasLimitReached {
                available: self.data_gas,
                requested: amount,
            })?;
        Ok(())
    }

    fn add_data_gas(&mut self, amount: u64) {
        self.data_gas = self.data_gas.saturating_add(amount);
    }

    fn gas(&self) -> u64 {
        self.gas
    }

    fn data_gas(&self) -> u64 {
        self.data_gas
    }
}

impl fmt::Display for GasPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gas: {}, data gas: {}", self.gas, self.data_gas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{address_from_low_u8, AccessTuple, H256};
    use proptest::prelude::*;

    const ISTANBUL: IntrinsicGasRules = IntrinsicGasRules {
        homestead: true,
        eip2028: true,
        eip4844: false,
    };
    const FRONTIER: IntrinsicGasRules = IntrinsicGasRules {
        homestead: false,
        eip2028: false,
        eip4844: false,
    };

    // ── Test: intrinsic gas ──

    #[test]
    fn test_plain_transfer() {
        assert_eq!(intrinsic_gas(&[], None, false, ISTANBUL).unwrap(), TX_GAS);
    }

    #[test]
    fn test_creation_needs_homestead() {
        assert_eq!(
            intrinsic_gas(&[], None, true, ISTANBUL).unwrap(),
            TX_GAS_CONTRACT_CREATION
        );
        assert_eq!(intrinsic_gas(&[], None, true, FRONTIER).unwrap(), TX_GAS);
    }

    #[test]
    fn test_payload_pricing() {
        let data = [0u8, 1, 0, 2, 3];
        // 3 non-zero, 2 zero
        assert_eq!(
            intrinsic_gas(&data, None, false, ISTANBUL).unwrap(),
            21_000 + 3 * 16 + 2 * 4
        );
        assert_eq!(
            intrinsic_gas(&data, None, false, FRONTIER).unwrap(),
            21_000 + 3 * 68 + 2 * 4
        );
    }

    #[test]
    fn test_access_list_pricing() {
        let list = AccessList::from(vec![
            AccessTuple {
                address: address_from_low_u8(1),
                storage_keys: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
            },
            AccessTuple {
                address: address_from_low_u8(2),
                storage_keys: Vec::new(),
            },
        ]);
        assert_eq!(
            intrinsic_gas(&[], Some(&list), false, ISTANBUL).unwrap(),
            21_000 + 2 * 2_400 + 2 * 1_900
        );
        // Present but empty costs nothing extra.
        assert_eq!(
            intrinsic_gas(&[], Some(&AccessList::default()), false, ISTANBUL).unwrap(),
            TX_GAS
        );
    }

    #[test]
    fn test_add_term_overflow() {
        assert_eq!(add_term(u64::MAX - 1, 1, 2), Err(TransitionError::GasUintOverflow));
        assert_eq!(add_term(1, u64::MAX, 16), Err(TransitionError::GasUintOverflow));
        assert_eq!(add_term(u64::MAX - 2, 1, 2), Ok(u64::MAX));
    }

    proptest! {
        #[test]
        fn prop_intrinsic_gas_deterministic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let a = intrinsic_gas(&data, None, false, ISTANBUL).unwrap();
            let b = intrinsic_gas(&data, None, false, ISTANBUL).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_zero_bytes_cost_zero_rate(len in 1usize..2048) {
            let single = intrinsic_gas(&vec![0u8; len], None, false, ISTANBUL).unwrap();
            let double = intrinsic_gas(&vec![0u8; len * 2], None, false, ISTANBUL).unwrap();
            prop_assert_eq!(double - single, TX_DATA_ZERO_GAS * len as u64);
        }
    }

    // ── Test: gas pool ──

    #[test]
    fn test_pool_sub_and_add() {
        let mut pool = GasPool::new(100, 10);
        pool.sub_gas(60).unwrap();
        assert_eq!(pool.gas(), 40);
        pool.add_gas(5);
        assert_eq!(pool.gas(), 45);
        pool.sub_data_gas(10).unwrap();
        assert_eq!(pool.data_gas(), 0);
    }

    #[test]
    fn test_pool_exhaustion_leaves_counter_unchanged() {
        let mut pool = GasPool::new(100, 10);
        let err = pool.sub_gas(101).unwrap_err();
        assert_eq!(err, TransitionError::GasLimitReached { available: 100, requested: 101 });
        assert_eq!(pool.gas(), 100);

        let err = pool.sub_data_gas(11).unwrap_err();
        assert_eq!(err, TransitionError::DataGasLimitReached { available: 10, requested: 11 });
        assert_eq!(pool.data_gas(), 10);
    }

    #[test]
    fn test_pool_display() {
        assert_eq!(GasPool::new(7, 3).to_string(), "gas: 7, data gas: 3");
    }
}
