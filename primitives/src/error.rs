//! Error types for Meridian transaction execution.
//!
//! Two classes, never mixed:
//!
//! - [`TransitionError`]: consensus errors. The message is invalid for the
//!   current state and must not be included in a block. Raised before any net
//!   state mutation.
//! - [`VmError`]: execution-level errors raised inside contract execution.
//!   Gas is still charged and the error travels inside
//!   [`ExecutionResult`](crate::execution::ExecutionResult).

use crate::types::{Address, Hash, U256, U512};

/// Consensus-level rejection of a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Message nonce is ahead of the sender's account nonce.
    #[error("nonce too high: address {address:?}, tx: {tx} state: {state}")]
    NonceTooHigh { address: Address, tx: u64, state: u64 },

    /// Message nonce is behind the sender's account nonce.
    #[error("nonce too low: address {address:?}, tx: {tx} state: {state}")]
    NonceTooLow { address: Address, tx: u64, state: u64 },

    /// Incrementing the sender's nonce would wrap around.
    #[error("nonce has max value: address {address:?}, nonce: {nonce}")]
    NonceMax { address: Address, nonce: u64 },

    /// The sender has deployed code and cannot originate messages.
    #[error("sender not an eoa: address {address:?}, codehash: {code_hash:?}")]
    SenderNoEoa { address: Address, code_hash: Hash },

    /// Fee cap does not fit in 256 bits.
    #[error("max fee per gas higher than 2^256-1: address {address:?}, maxFeePerGas bit length: {bit_len}")]
    FeeCapVeryHigh { address: Address, bit_len: usize },

    /// Tip cap does not fit in 256 bits.
    #[error("max priority fee per gas higher than 2^256-1: address {address:?}, maxPriorityFeePerGas bit length: {bit_len}")]
    TipVeryHigh { address: Address, bit_len: usize },

    /// Tip cap exceeds fee cap.
    #[error("max priority fee per gas higher than max fee per gas: address {address:?}, maxPriorityFeePerGas: {tip_cap}, maxFeePerGas: {fee_cap}")]
    TipAboveFeeCap { address: Address, tip_cap: U512, fee_cap: U512 },

    /// Fee cap is below the block base fee.
    #[error("max fee per gas less than block base fee: address {address:?}, maxFeePerGas: {fee_cap} baseFee: {base_fee}")]
    FeeCapTooLow { address: Address, fee_cap: U512, base_fee: U256 },

    /// Current data-gas price exceeds what the sender is willing to pay.
    #[error("max fee per data gas less than data gas price: address {address:?}, maxFeePerDataGas: {max_fee_per_data_gas} dataGasPrice: {data_gas_price}, excessDataGas: {excess_data_gas}")]
    MaxFeePerDataGas {
        address: Address,
        max_fee_per_data_gas: U256,
        data_gas_price: U256,
        excess_data_gas: U256,
    },

    /// The data-gas price curve left the 256-bit range.
    #[error("data gas price overflow: excessDataGas: {excess_data_gas}")]
    DataGasPriceOverflow { excess_data_gas: U256 },

    /// Data-gas units for the referenced blobs overflow 64 bits.
    #[error("data gas usage overflow: address {address:?} blobs {blobs}")]
    DataGasUsageOverflow { address: Address, blobs: usize },

    /// Sender cannot cover the worst-case cost of the message.
    #[error("insufficient funds for gas * price + value: address {address:?} have {have} want {want}")]
    InsufficientFunds { address: Address, have: U256, want: U512 },

    /// Sender cannot cover the value of the topmost call.
    #[error("insufficient funds for transfer: address {address:?}")]
    InsufficientFundsForTransfer { address: Address },

    /// Block gas budget exhausted.
    #[error("gas limit reached: available {available}, requested {requested}")]
    GasLimitReached { available: u64, requested: u64 },

    /// Block data-gas budget exhausted.
    #[error("data gas limit reached: available {available}, requested {requested}")]
    DataGasLimitReached { available: u64, requested: u64 },

    /// Intrinsic gas computation overflowed 64 bits.
    #[error("gas uint64 overflow")]
    GasUintOverflow,

    /// Gas limit does not cover intrinsic gas.
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas { have: u64, want: u64 },

    /// A fee or refund amount left the 256-bit balance range.
    #[error("fee overflow: {0}")]
    FeeOverflow(&'static str),

    /// Gas bookkeeping broke its bounds (a collaborator returned more gas
    /// than it was given). Fatal: escrow and block gas are returned, but the
    /// execution engine has already touched the ledger, so the caller must
    /// discard it.
    #[error("gas accounting violated: limit {limit}, remaining {remaining}")]
    GasAccounting { limit: u64, remaining: u64 },
}

/// Execution-level error raised inside contract execution.
///
/// These never invalidate a message: gas is consumed, the nonce (for calls)
/// is still incremented, refunds and fee settlement still apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("out of gas")]
    OutOfGas,
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,
    #[error("max call depth exceeded")]
    DepthLimit,
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    #[error("contract address collision")]
    ContractAddressCollision,
    #[error("execution reverted")]
    ExecutionReverted,
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("write protection")]
    WriteProtection,
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    #[error("gas uint64 overflow")]
    GasUintOverflow,
    #[error("invalid code: must not begin with 0xef")]
    InvalidCode,
    #[error("nonce uint64 overflow")]
    NonceUintOverflow,
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("stack underflow ({len} <=> {required})")]
    StackUnderflow { len: usize, required: usize },
    #[error("stack limit reached {len} ({limit})")]
    StackOverflow { len: usize, limit: usize },
}

impl VmError {
    /// Returns true for the explicit-revert kind, the only kind that carries
    /// a revert reason.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::ExecutionReverted)
    }
}

/// Convenience result type for consensus-checked operations.
pub type TransitionResult<T> = core::result::Result<T, TransitionError>;
