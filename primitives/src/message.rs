//! The message model: the already-decoded, already-authenticated form of a
//! transaction that the state transition consumes.

use bytes::Bytes;

use crate::data_gas::DATA_GAS_PER_BLOB;
use crate::types::{widen, AccessList, Address, Hash, U256, U512};

/// Transaction envelope a message was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    AccessList,
    DynamicFee,
    Blob,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::AccessList => "access_list",
            Self::DynamicFee => "dynamic_fee",
            Self::Blob => "blob",
        }
    }
}

/// Which fee model prices a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pricing {
    /// Single gas price paid in full to the proposer.
    Legacy { gas_price: U256 },
    /// Fee-cap and tip-cap. `gas_price` is the nominal per-unit price used
    /// for prepayment and for returning unused gas.
    DynamicFee {
        gas_price: U256,
        fee_cap: U512,
        tip_cap: U512,
    },
}

impl Pricing {
    /// Dynamic-fee pricing with the nominal price derived from the block's
    /// base fee: `min(tip_cap + base_fee, fee_cap)`, or `fee_cap` when there
    /// is no base fee.
    ///
    /// Caps that do not fit 256 bits yield a saturated nominal price; such
    /// messages never pass validation.
    pub fn dynamic_fee(fee_cap: U512, tip_cap: U512, base_fee: Option<U256>) -> Self {
        Self::DynamicFee {
            gas_price: effective_price(fee_cap, tip_cap, base_fee),
            fee_cap,
            tip_cap,
        }
    }

    /// Per-unit price charged in a block with `base_fee`.
    ///
    /// Legacy messages pay their gas price. Dynamic-fee messages are
    /// re-priced against `base_fee`, ignoring the nominal price they were
    /// built with.
    pub fn price_for_block(&self, base_fee: Option<U256>) -> U256 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::DynamicFee { fee_cap, tip_cap, .. } => effective_price(*fee_cap, *tip_cap, base_fee),
        }
    }

    /// Nominal per-unit gas price.
    pub fn gas_price(&self) -> U256 {
        match self {
            Self::Legacy { gas_price } | Self::DynamicFee { gas_price, .. } => *gas_price,
        }
    }

    /// Fee cap. Legacy messages report their gas price.
    pub fn fee_cap(&self) -> U512 {
        match self {
            Self::Legacy { gas_price } => widen(*gas_price),
            Self::DynamicFee { fee_cap, .. } => *fee_cap,
        }
    }

    /// Tip cap. Legacy messages report their gas price.
    pub fn tip_cap(&self) -> U512 {
        match self {
            Self::Legacy { gas_price } => widen(*gas_price),
            Self::DynamicFee { tip_cap, .. } => *tip_cap,
        }
    }

    pub fn is_dynamic_fee(&self) -> bool {
        matches!(self, Self::DynamicFee { .. })
    }
}

fn effective_price(fee_cap: U512, tip_cap: U512, base_fee: Option<U256>) -> U256 {
    let effective = match base_fee {
        Some(base) => core::cmp::min(tip_cap.saturating_add(widen(base)), fee_cap),
        None => fee_cap,
    };
    U256::try_from(effective).unwrap_or(U256::MAX)
}

/// A decoded transaction, immutable for the duration of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    /// `None` requests contract creation.
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub value: U256,
    pub pricing: Pricing,
    pub data: Bytes,
    /// `None` (no access list) is distinct from an empty list.
    pub access_list: Option<AccessList>,
    pub max_fee_per_data_gas: U256,
    /// Versioned hashes of the blobs the message references.
    pub data_hashes: Vec<Hash>,
    /// Simulation-only message: nonce and EOA checks are skipped.
    pub is_fake: bool,
}

impl Message {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    pub fn gas_price(&self) -> U256 {
        self.pricing.gas_price()
    }

    /// Data-gas units consumed by the referenced blobs, `None` on overflow.
    pub fn data_gas_used(&self) -> Option<u64> {
        u64::try_from(self.data_hashes.len())
            .ok()?
            .checked_mul(DATA_GAS_PER_BLOB)
    }

    /// Envelope type implied by the message shape.
    pub fn tx_type(&self) -> TxType {
        if !self.data_hashes.is_empty() {
            TxType::Blob
        } else if self.pricing.is_dynamic_fee() {
            TxType::DynamicFee
        } else if self.access_list.is_some() {
            TxType::AccessList
        } else {
            TxType::Legacy
        }
    }
}
