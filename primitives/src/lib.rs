//! `meridian-primitives`: foundational types for Meridian transaction
//! execution.
//!
//! This crate holds plain data and pure functions: wide-integer and address
//! types, the two error classes, chain configuration and per-block rules,
//! the message model, intrinsic gas, data-gas pricing, the block gas pool,
//! and the execution result. Everything stateful lives in `meridian-engine`.

pub mod types;
pub mod error;
pub mod config;
pub mod gas;
pub mod data_gas;
pub mod message;
pub mod execution;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    AccessList, AccessTuple, Address, BlockNumber, Hash, EMPTY_CODE_HASH, H160, H256, U256, U512,
    ZERO_ADDRESS, ZERO_HASH,
};
pub use error::{TransitionError, TransitionResult, VmError};
pub use config::{ChainConfig, IntrinsicGasRules, Rules};
pub use gas::{intrinsic_gas, GasBudget, GasPool};
pub use data_gas::{data_gas_price, DATA_GAS_PER_BLOB};
pub use message::{Message, Pricing, TxType};
pub use execution::{BlockContext, ExecutionResult, VmConfig};
