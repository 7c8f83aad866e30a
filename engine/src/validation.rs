//! Message admissibility checks.
//!
//! These run before a message touches any balance. A failure here is a
//! consensus error: the message cannot be included in a block under the
//! current state.

use meridian_primitives::types::widen;
use meridian_primitives::{
    data_gas_price, Address, BlockContext, Message, Rules, TransitionError, TransitionResult,
    VmConfig, EMPTY_CODE_HASH, U256, ZERO_HASH,
};

use crate::host::StateDb;

/// Validate nonce, sender shape, fee caps and data-gas price.
///
/// Checks, in order:
/// 1. Nonce equals the stored nonce and can still be incremented (skipped
///    for fake messages)
/// 2. Sender has no code (skipped for fake messages)
/// 3. Fee caps fit 256 bits, tip cap ≤ fee cap, fee cap ≥ base fee (London
///    onwards, unless base-fee enforcement is off and both caps are zero)
/// 4. Data-gas price ≤ the message's max fee per data gas (sharding
///    onwards, only for messages that reference blobs)
pub fn pre_check(
    msg: &Message,
    state: &dyn StateDb,
    block: &BlockContext,
    rules: &Rules,
    config: &VmConfig,
) -> TransitionResult<()> {
    if !msg.is_fake {
        check_nonce(msg, state)?;
        check_sender_eoa(msg, state)?;
    }
    if rules.is_london {
        check_fee_caps(msg, block, config)?;
    }
    if rules.is_sharding {
        check_data_gas_price(msg, block)?;
    }
    Ok(())
}

fn check_nonce(msg: &Message, state: &dyn StateDb) -> TransitionResult<()> {
    let address = msg.from;
    let stored = state.nonce(address);
    if stored < msg.nonce {
        return Err(TransitionError::NonceTooHigh {
            address,
            tx: msg.nonce,
            state: stored,
        });
    }
    if stored > msg.nonce {
        return Err(TransitionError::NonceTooLow {
            address,
            tx: msg.nonce,
            state: stored,
        });
    }
    if stored.checked_add(1).is_none() {
        return Err(TransitionError::NonceMax {
            address,
            nonce: stored,
        });
    }
    Ok(())
}

fn check_sender_eoa(msg: &Message, state: &dyn StateDb) -> TransitionResult<()> {
    let code_hash = state.code_hash(msg.from);
    if code_hash != ZERO_HASH && code_hash != EMPTY_CODE_HASH {
        return Err(TransitionError::SenderNoEoa {
            address: msg.from,
            code_hash,
        });
    }
    Ok(())
}

fn check_fee_caps(msg: &Message, block: &BlockContext, config: &VmConfig) -> TransitionResult<()> {
    let address = msg.from;
    let fee_cap = msg.pricing.fee_cap();
    let tip_cap = msg.pricing.tip_cap();

    // Simulations may run with zero fees when base-fee enforcement is off.
    if config.no_base_fee && fee_cap.is_zero() && tip_cap.is_zero() {
        return Ok(());
    }

    if fee_cap.bits() > 256 {
        return Err(TransitionError::FeeCapVeryHigh {
            address,
            bit_len: fee_cap.bits(),
        });
    }
    if tip_cap.bits() > 256 {
        return Err(TransitionError::TipVeryHigh {
            address,
            bit_len: tip_cap.bits(),
        });
    }
    if fee_cap < tip_cap {
        return Err(TransitionError::TipAboveFeeCap {
            address,
            tip_cap,
            fee_cap,
        });
    }
    let base_fee = block.base_fee.unwrap_or_default();
    if fee_cap < widen(base_fee) {
        return Err(TransitionError::FeeCapTooLow {
            address,
            fee_cap,
            base_fee,
        });
    }
    Ok(())
}

fn check_data_gas_price(msg: &Message, block: &BlockContext) -> TransitionResult<()> {
    let used = msg
        .data_gas_used()
        .ok_or(TransitionError::DataGasUsageOverflow {
            address: msg.from,
            blobs: msg.data_hashes.len(),
        })?;
    if used == 0 {
        return Ok(());
    }

    let excess_data_gas = block.excess_data_gas_or_zero();
    let price = data_gas_price(excess_data_gas)
        .ok_or(TransitionError::DataGasPriceOverflow { excess_data_gas })?;
    if price > msg.max_fee_per_data_gas {
        return Err(TransitionError::MaxFeePerDataGas {
            address: msg.from,
            max_fee_per_data_gas: msg.max_fee_per_data_gas,
            data_gas_price: price,
            excess_data_gas,
        });
    }
    Ok(())
}

/// Whether `addr` can cover a plain transfer of `value` right now.
pub fn can_transfer(state: &dyn StateDb, addr: Address, value: U256) -> bool {
    state.balance(addr) >= value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockState;
    use bytes::Bytes;
    use meridian_primitives::types::address_from_low_u8;
    use meridian_primitives::{ChainConfig, Hash, Pricing, DATA_GAS_PER_BLOB, U512};

    fn sender() -> Address {
        address_from_low_u8(0xaa)
    }

    fn msg(nonce: u64, pricing: Pricing) -> Message {
        Message {
            from: sender(),
            to: Some(address_from_low_u8(0xbb)),
            nonce,
            gas_limit: 21_000,
            value: U256::zero(),
            pricing,
            data: Bytes::new(),
            access_list: None,
            max_fee_per_data_gas: U256::zero(),
            data_hashes: Vec::new(),
            is_fake: false,
        }
    }

    fn dynamic(fee_cap: u64, tip_cap: u64) -> Pricing {
        Pricing::dynamic_fee(U512::from(fee_cap), U512::from(tip_cap), Some(U256::from(25u64)))
    }

    fn block(base_fee: u64) -> BlockContext {
        BlockContext {
            base_fee: Some(U256::from(base_fee)),
            ..BlockContext::default()
        }
    }

    fn check(msg: &Message, state: &MockState, block: &BlockContext) -> TransitionResult<()> {
        let rules = ChainConfig::all_active().rules(block.number, false);
        pre_check(msg, state, block, &rules, &VmConfig::default())
    }

    // ── Test: nonce ──

    #[test]
    fn test_nonce_matrix() {
        let state = MockState::new().with_eoa(sender(), U256::zero(), 5);
        let block = block(0);
        let legacy = Pricing::Legacy { gas_price: U256::zero() };

        assert_eq!(
            check(&msg(4, legacy), &state, &block),
            Err(TransitionError::NonceTooLow { address: sender(), tx: 4, state: 5 })
        );
        assert_eq!(
            check(&msg(6, legacy), &state, &block),
            Err(TransitionError::NonceTooHigh { address: sender(), tx: 6, state: 5 })
        );
        assert_eq!(check(&msg(5, legacy), &state, &block), Ok(()));
    }

    #[test]
    fn test_nonce_max() {
        let state = MockState::new().with_eoa(sender(), U256::zero(), u64::MAX);
        let m = msg(u64::MAX, Pricing::Legacy { gas_price: U256::zero() });
        assert_eq!(
            check(&m, &state, &block(0)),
            Err(TransitionError::NonceMax { address: sender(), nonce: u64::MAX })
        );
    }

    #[test]
    fn test_fake_skips_nonce_and_eoa() {
        let mut state = MockState::new().with_eoa(sender(), U256::zero(), 5);
        state.set_code_hash(sender(), Hash::repeat_byte(0x11));
        let mut m = msg(0, Pricing::Legacy { gas_price: U256::zero() });
        m.is_fake = true;
        assert_eq!(check(&m, &state, &block(0)), Ok(()));
    }

    // ── Test: sender shape ──

    #[test]
    fn test_sender_with_code_rejected() {
        let mut state = MockState::new().with_eoa(sender(), U256::zero(), 0);
        let code_hash = Hash::repeat_byte(0x11);
        state.set_code_hash(sender(), code_hash);
        let m = msg(0, Pricing::Legacy { gas_price: U256::zero() });
        assert_eq!(
            check(&m, &state, &block(0)),
            Err(TransitionError::SenderNoEoa { address: sender(), code_hash })
        );
    }

    #[test]
    fn test_unknown_sender_is_eoa() {
        let state = MockState::new();
        let m = msg(0, Pricing::Legacy { gas_price: U256::zero() });
        assert_eq!(check(&m, &state, &block(0)), Ok(()));
    }

    // ── Test: fee caps ──

    #[test]
    fn test_tip_above_fee_cap_rejected_regardless_of_base_fee() {
        let state = MockState::new();
        for base in [0u64, 1, 1_000] {
            let m = msg(0, dynamic(10, 11));
            assert!(matches!(
                check(&m, &state, &block(base)),
                Err(TransitionError::TipAboveFeeCap { .. })
            ));
        }
    }

    #[test]
    fn test_fee_cap_below_base_fee() {
        let state = MockState::new();
        let m = msg(0, dynamic(24, 0));
        assert_eq!(
            check(&m, &state, &block(25)),
            Err(TransitionError::FeeCapTooLow {
                address: sender(),
                fee_cap: U512::from(24u64),
                base_fee: U256::from(25u64),
            })
        );
    }

    #[test]
    fn test_fee_cap_equal_to_base_fee_accepted() {
        let state = MockState::new();
        let m = msg(0, dynamic(25, 0));
        assert_eq!(check(&m, &state, &block(25)), Ok(()));
    }

    #[test]
    fn test_oversized_caps() {
        let state = MockState::new();
        let huge = U512::from(U256::MAX) + U512::one();

        let m = msg(0, Pricing::dynamic_fee(huge, U512::zero(), None));
        assert_eq!(
            check(&m, &state, &block(0)),
            Err(TransitionError::FeeCapVeryHigh { address: sender(), bit_len: 257 })
        );

        let m = msg(0, Pricing::dynamic_fee(U512::one(), huge, None));
        assert_eq!(
            check(&m, &state, &block(0)),
            Err(TransitionError::TipVeryHigh { address: sender(), bit_len: 257 })
        );
    }

    #[test]
    fn test_legacy_price_below_base_fee() {
        let state = MockState::new();
        let m = msg(0, Pricing::Legacy { gas_price: U256::from(5u64) });
        assert!(matches!(
            check(&m, &state, &block(6)),
            Err(TransitionError::FeeCapTooLow { .. })
        ));
    }

    #[test]
    fn test_no_base_fee_zero_caps_skip_fee_checks() {
        let state = MockState::new();
        let rules = ChainConfig::all_active().rules(0, false);
        let config = VmConfig { no_base_fee: true };
        let m = msg(0, dynamic(0, 0));
        assert_eq!(pre_check(&m, &state, &block(25), &rules, &config), Ok(()));

        // A non-zero cap is still checked.
        let m = msg(0, dynamic(1, 0));
        assert!(pre_check(&m, &state, &block(25), &rules, &config).is_err());
    }

    #[test]
    fn test_fee_checks_inactive_before_london() {
        let state = MockState::new();
        let rules = ChainConfig::frontier().rules(0, false);
        let m = msg(0, Pricing::Legacy { gas_price: U256::zero() });
        assert_eq!(pre_check(&m, &state, &block(25), &rules, &VmConfig::default()), Ok(()));
    }

    // ── Test: data gas ──

    #[test]
    fn test_data_gas_price_above_max() {
        let state = MockState::new();
        let mut m = msg(0, dynamic(100, 0));
        m.data_hashes = vec![Hash::repeat_byte(1)];
        m.max_fee_per_data_gas = U256::zero();
        assert_eq!(
            check(&m, &state, &block(0)),
            Err(TransitionError::MaxFeePerDataGas {
                address: sender(),
                max_fee_per_data_gas: U256::zero(),
                data_gas_price: U256::one(),
                excess_data_gas: U256::zero(),
            })
        );

        m.max_fee_per_data_gas = U256::one();
        assert_eq!(check(&m, &state, &block(0)), Ok(()));
    }

    #[test]
    fn test_data_gas_price_overflow() {
        let state = MockState::new();
        let mut m = msg(0, dynamic(100, 0));
        m.data_hashes = vec![Hash::repeat_byte(1)];
        let mut b = block(0);
        b.excess_data_gas = Some(U256::MAX);
        assert_eq!(
            check(&m, &state, &b),
            Err(TransitionError::DataGasPriceOverflow { excess_data_gas: U256::MAX })
        );
    }

    #[test]
    fn test_no_blobs_skip_data_gas_check() {
        let state = MockState::new();
        let m = msg(0, dynamic(100, 0));
        let mut b = block(0);
        b.excess_data_gas = Some(U256::from(DATA_GAS_PER_BLOB * 1_000));
        assert_eq!(check(&m, &state, &b), Ok(()));
    }

    #[test]
    fn test_can_transfer() {
        let state = MockState::new().with_eoa(sender(), U256::from(10u64), 0);
        assert!(can_transfer(&state, sender(), U256::from(10u64)));
        assert!(!can_transfer(&state, sender(), U256::from(11u64)));
        assert!(can_transfer(&state, sender(), U256::zero()));
    }
}
