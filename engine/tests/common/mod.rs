//! Shared test helpers for integration tests.
//!
//! Provides stable addresses, chain presets, message builders, and a
//! harness that owns everything a transition borrows.

#![allow(dead_code)]

use bytes::Bytes;
use meridian_engine::{apply_message, Env, MockState, ScriptedVm, StateDb};
use meridian_primitives::types::address_from_low_u8;
use meridian_primitives::{
    Address, BlockContext, ChainConfig, ExecutionResult, GasPool, Hash, Message, Pricing,
    TransitionResult, VmConfig, DATA_GAS_PER_BLOB, U256, U512,
};

// ── Stable addresses ──

pub const ALICE: Address = address_from_low_u8(0xa1);
pub const BOB: Address = address_from_low_u8(0xb0);
pub const COINBASE: Address = address_from_low_u8(0xc0);

pub const BLOCK_GAS: u64 = 30_000_000;
pub const BLOCK_BLOBS: u64 = 6;

pub fn u256(v: u64) -> U256 {
    U256::from(v)
}

// ── Chain presets ──

/// Everything up to Berlin, no fee market.
pub fn berlin() -> ChainConfig {
    ChainConfig {
        london_block: None,
        sharding_block: None,
        ..ChainConfig::all_active()
    }
}

// ── Harness ──

/// Owns the chain, block, ledger, execution engine and gas pool for a test.
#[derive(Clone)]
pub struct Harness {
    pub chain: ChainConfig,
    pub block: BlockContext,
    pub config: VmConfig,
    pub state: MockState,
    pub vm: ScriptedVm,
    pub pool: GasPool,
}

impl Harness {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            block: BlockContext {
                number: 1,
                coinbase: COINBASE,
                base_fee: Some(U256::zero()),
                excess_data_gas: Some(U256::zero()),
                random: Some(Hash::repeat_byte(0x42)),
            },
            config: VmConfig::default(),
            state: MockState::new(),
            vm: ScriptedVm::new(),
            pool: GasPool::new(BLOCK_GAS, BLOCK_BLOBS * DATA_GAS_PER_BLOB),
        }
    }

    /// Give `addr` an EOA with `balance` and nonce zero.
    pub fn fund(self, addr: Address, balance: u64) -> Self {
        self.fund_with_nonce(addr, balance, 0)
    }

    pub fn fund_with_nonce(mut self, addr: Address, balance: u64, nonce: u64) -> Self {
        self.state = self.state.with_eoa(addr, u256(balance), nonce);
        self
    }

    pub fn with_vm(mut self, vm: ScriptedVm) -> Self {
        self.vm = vm;
        self
    }

    pub fn with_base_fee(mut self, base_fee: u64) -> Self {
        self.block.base_fee = Some(u256(base_fee));
        self
    }

    pub fn apply(&mut self, msg: &Message) -> TransitionResult<ExecutionResult> {
        let mut env = Env {
            chain: &self.chain,
            block: &self.block,
            config: &self.config,
            state: &mut self.state,
            vm: &mut self.vm,
        };
        apply_message(&mut env, msg, &mut self.pool)
    }

    pub fn balance(&self, addr: Address) -> U256 {
        self.state.balance(addr)
    }

    pub fn nonce(&self, addr: Address) -> u64 {
        self.state.nonce(addr)
    }
}

// ── Message builders ──

pub fn legacy(from: Address, to: Option<Address>, nonce: u64, gas_limit: u64, gas_price: u64) -> Message {
    Message {
        from,
        to,
        nonce,
        gas_limit,
        value: U256::zero(),
        pricing: Pricing::Legacy { gas_price: u256(gas_price) },
        data: Bytes::new(),
        access_list: None,
        max_fee_per_data_gas: U256::zero(),
        data_hashes: Vec::new(),
        is_fake: false,
    }
}

pub fn dynamic(
    from: Address,
    to: Option<Address>,
    nonce: u64,
    gas_limit: u64,
    fee_cap: u64,
    tip_cap: u64,
    base_fee: u64,
) -> Message {
    Message {
        pricing: Pricing::dynamic_fee(U512::from(fee_cap), U512::from(tip_cap), Some(u256(base_fee))),
        ..legacy(from, to, nonce, gas_limit, 0)
    }
}
