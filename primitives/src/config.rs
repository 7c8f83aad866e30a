//! Chain configuration and per-block protocol rules.
//!
//! A [`ChainConfig`] holds the activation block of every protocol upgrade the
//! engine knows about. [`ChainConfig::rules`] flattens it into an immutable
//! [`Rules`] bundle for one block. Rules are derived once and never mutated.

use serde::{Deserialize, Serialize};

use crate::types::BlockNumber;

/// Protocol activation schedule.
///
/// `None` means the upgrade is not scheduled. Activation is inclusive: an
/// upgrade at block `n` applies to block `n` and later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Contract-creation base cost.
    pub homestead_block: Option<BlockNumber>,
    /// Precompiles 0x05-0x08.
    pub byzantium_block: Option<BlockNumber>,
    /// Cheaper non-zero calldata (EIP-2028) and precompile 0x09.
    pub istanbul_block: Option<BlockNumber>,
    /// Access lists (EIP-2929/2930).
    pub berlin_block: Option<BlockNumber>,
    /// Fee market (EIP-1559) and reduced refunds (EIP-3529).
    pub london_block: Option<BlockNumber>,
    /// Data gas (EIP-4844).
    pub sharding_block: Option<BlockNumber>,
}

impl ChainConfig {
    /// Every upgrade active from genesis.
    pub fn all_active() -> Self {
        Self {
            homestead_block: Some(0),
            byzantium_block: Some(0),
            istanbul_block: Some(0),
            berlin_block: Some(0),
            london_block: Some(0),
            sharding_block: Some(0),
        }
    }

    /// No upgrades at all.
    pub fn frontier() -> Self {
        Self::default()
    }

    /// Every upgrade up to and including London active from genesis.
    pub fn london() -> Self {
        Self {
            sharding_block: None,
            ..Self::all_active()
        }
    }

    pub fn is_homestead(&self, number: BlockNumber) -> bool {
        is_active(self.homestead_block, number)
    }

    pub fn is_byzantium(&self, number: BlockNumber) -> bool {
        is_active(self.byzantium_block, number)
    }

    pub fn is_istanbul(&self, number: BlockNumber) -> bool {
        is_active(self.istanbul_block, number)
    }

    pub fn is_berlin(&self, number: BlockNumber) -> bool {
        is_active(self.berlin_block, number)
    }

    pub fn is_london(&self, number: BlockNumber) -> bool {
        is_active(self.london_block, number)
    }

    pub fn is_sharding(&self, number: BlockNumber) -> bool {
        is_active(self.sharding_block, number)
    }

    /// Derive the rule bundle for a block.
    ///
    /// `is_merge` is supplied by the block context (a randomness value is
    /// present after the merge).
    pub fn rules(&self, number: BlockNumber, is_merge: bool) -> Rules {
        Rules {
            is_homestead: self.is_homestead(number),
            is_byzantium: self.is_byzantium(number),
            is_istanbul: self.is_istanbul(number),
            is_berlin: self.is_berlin(number),
            is_london: self.is_london(number),
            is_merge,
            is_sharding: self.is_sharding(number),
        }
    }
}

fn is_active(activation: Option<BlockNumber>, number: BlockNumber) -> bool {
    activation.is_some_and(|at| at <= number)
}

/// Protocol rules in force for a single block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    pub is_homestead: bool,
    pub is_byzantium: bool,
    pub is_istanbul: bool,
    pub is_berlin: bool,
    pub is_london: bool,
    pub is_merge: bool,
    pub is_sharding: bool,
}

impl Rules {
    /// The subset of rules that parameterize intrinsic gas.
    pub fn intrinsic_gas_rules(&self) -> IntrinsicGasRules {
        IntrinsicGasRules {
            homestead: self.is_homestead,
            eip2028: self.is_istanbul,
            eip4844: self.is_sharding,
        }
    }
}

/// Rules used when computing intrinsic gas.
///
/// `eip4844` is carried for completeness; blob data is priced in data gas,
/// not in intrinsic gas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrinsicGasRules {
    pub homestead: bool,
    pub eip2028: bool,
    pub eip4844: bool,
}
