//! Execution boundary types: the block context a message runs in, the
//! simulation knobs, and the outcome record returned to the caller.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::VmError;
use crate::types::{Address, BlockNumber, Hash, U256};

/// Block-level inputs to a transition. Identical across validators for the
/// same block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub number: BlockNumber,
    /// Proposer credited with the effective tip.
    pub coinbase: Address,
    /// `None` before the fee market activates.
    pub base_fee: Option<U256>,
    /// `None` before data gas activates; treated as zero when pricing.
    pub excess_data_gas: Option<U256>,
    /// Present once the chain has merged.
    pub random: Option<Hash>,
}

impl BlockContext {
    pub fn is_merge(&self) -> bool {
        self.random.is_some()
    }

    /// Excess data gas, with absence read as zero.
    pub fn excess_data_gas_or_zero(&self) -> U256 {
        self.excess_data_gas.unwrap_or_default()
    }
}

/// Simulation overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Skip base-fee enforcement for messages whose fee fields are both zero.
    pub no_base_fee: bool,
}

/// Outcome of an admitted message.
///
/// Constructed once at the end of a transition. An execution-level error in
/// `err` does not mean the message was rejected: gas was charged and the
/// state changes of settlement were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Gas charged, refund already netted in.
    pub used_gas: u64,
    pub err: Option<VmError>,
    pub return_data: Option<Bytes>,
}

impl ExecutionResult {
    /// True if execution hit an execution-level error.
    pub fn failed(&self) -> bool {
        self.err.is_some()
    }

    pub fn error(&self) -> Option<&VmError> {
        self.err.as_ref()
    }

    /// Return data of a successful execution, copied out.
    ///
    /// `None` whenever an error is present or no data was returned.
    pub fn returned(&self) -> Option<Bytes> {
        if self.err.is_some() {
            return None;
        }
        self.return_data.as_deref().map(Bytes::copy_from_slice)
    }

    /// Revert reason supplied by an explicit revert, copied out.
    ///
    /// `None` unless the error is [`VmError::ExecutionReverted`], and `None`
    /// if the revert carried no data.
    pub fn revert_reason(&self) -> Option<Bytes> {
        match &self.err {
            Some(err) if err.is_revert() => {
                self.return_data.as_deref().map(Bytes::copy_from_slice)
            }
            _ => None,
        }
    }
}
