//! Core type aliases and constants for Meridian transaction execution.
//!
//! Wide integers come from `primitive-types`; fee caps are decoded into
//! [`U512`] so that oversized values can be rejected by validation instead of
//! being truncated at the decoding boundary.

pub use primitive_types::{H160, H256, U256, U512};

/// 20-byte account address.
pub type Address = H160;

/// 32-byte hash used for code hashes, blob versioned hashes, and randomness.
pub type Hash = H256;

/// Block number (monotonically increasing).
pub type BlockNumber = u64;

/// A zero-valued hash (32 zero bytes).
pub const ZERO_HASH: Hash = H256([0u8; 32]);

/// A zero-valued address (20 zero bytes).
pub const ZERO_ADDRESS: Address = H160([0u8; 20]);

/// Keccak-256 of the empty byte string, the code hash of every account
/// without code.
pub const EMPTY_CODE_HASH: Hash = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Build an address whose last byte is `n` (precompile addresses, fixtures).
pub const fn address_from_low_u8(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    H160(bytes)
}

/// Widen a `U256` into a `U512`.
pub fn widen(v: U256) -> U512 {
    U512::from(v)
}

/// Narrow a `U512` into a `U256`, returning `None` if it does not fit.
pub fn narrow(v: U512) -> Option<U256> {
    U256::try_from(v).ok()
}

/// A single entry of an access list: an address and the storage slots the
/// message declares it will touch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessTuple {
    pub address: Address,
    pub storage_keys: Vec<Hash>,
}

/// EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessList(pub Vec<AccessTuple>);

impl AccessList {
    /// Number of addresses in the list (duplicates included).
    pub fn addresses(&self) -> usize {
        self.0.len()
    }

    /// Total number of storage keys across all entries.
    pub fn storage_keys(&self) -> usize {
        self.0.iter().map(|t| t.storage_keys.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessTuple> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<AccessTuple>> for AccessList {
    fn from(tuples: Vec<AccessTuple>) -> Self {
        Self(tuples)
    }
}
