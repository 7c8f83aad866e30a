//! `meridian-engine`: deterministic transaction state-transition engine.
//!
//! This crate applies one message at a time to a ledger:
//! `f(state, block, message, gas_pool) → (execution_result | consensus_error)`
//!
//! A consensus error leaves the ledger and the gas pool untouched. An
//! admitted message always yields an [`ExecutionResult`](meridian_primitives::ExecutionResult),
//! which may itself carry an execution-level error.
//!
//! ## Architecture
//!
//! - [`host::StateDb`] / [`host::Vm`]: capability traits for the ledger and the execution engine
//! - [`host::MockState`] / [`host::ScriptedVm`]: in-memory implementations for testing
//! - [`validation`]: nonce, sender, fee-cap and data-gas admissibility checks
//! - [`transition`]: escrow, intrinsic gas, dispatch, refund and settlement
//! - [`timeboost`]: bid-discounted ordering of pending transactions

pub mod host;
pub mod validation;
pub mod transition;
pub mod timeboost;

// Re-export key types for convenience
pub use host::{CallOutcome, MockState, ScriptedVm, StateDb, Vm};
pub use timeboost::{PriorityBid, TimeBoostConfig, TimeBoostable};
pub use transition::{apply_message, Env, StateTransition};
