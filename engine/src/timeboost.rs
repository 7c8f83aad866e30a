//! Time-boost ordering of pending transactions.
//!
//! Each item's arrival timestamp is discounted by `bid * G / (bid + C)`
//! milliseconds, then items are ordered by the discounted timestamp. The
//! discount grows with the bid but never exceeds `G`.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// An item that can be reordered by its priority bid.
pub trait PriorityBid {
    fn priority_fee(&self) -> u64;

    /// Arrival time in milliseconds.
    fn timestamp_ms(&self) -> u64;

    /// Whether the timestamp already carries its discount.
    fn boosted(&self) -> bool;

    /// Store the discounted timestamp and mark the item boosted.
    fn apply_boost(&mut self, timestamp_ms: u64);
}

/// Boost curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBoostConfig {
    /// Upper bound on the discount, in milliseconds (`G`).
    pub max_boost_factor: u64,
    /// Bid at which the discount reaches half of `G` (`C`).
    pub denominator_constant: u64,
}

impl Default for TimeBoostConfig {
    fn default() -> Self {
        Self {
            max_boost_factor: 500,
            denominator_constant: 50,
        }
    }
}

impl TimeBoostConfig {
    /// Discount in milliseconds for a bid. Zero for a zero bid.
    pub fn boost_delta(&self, bid: u64) -> u64 {
        if bid == 0 {
            return 0;
        }
        let bid = u128::from(bid);
        let delta = bid * u128::from(self.max_boost_factor)
            / (bid + u128::from(self.denominator_constant));
        u64::try_from(delta).unwrap_or(self.max_boost_factor)
    }
}

/// A slice of items sortable by boosted timestamp.
pub struct TimeBoostable<'a, T> {
    items: &'a mut [T],
    config: TimeBoostConfig,
}

impl<'a, T: PriorityBid> TimeBoostable<'a, T> {
    pub fn new(items: &'a mut [T], config: TimeBoostConfig) -> Self {
        Self { items, config }
    }

    pub fn with_defaults(items: &'a mut [T]) -> Self {
        Self::new(items, TimeBoostConfig::default())
    }

    fn can_boost(item: &T) -> bool {
        !item.boosted() && item.priority_fee() != 0
    }

    /// Discount every eligible item once, then stable-sort by timestamp.
    ///
    /// Returns the number of items boosted by this call. Sorting again is a
    /// no-op.
    pub fn sort(&mut self) -> usize {
        let mut boosted = 0;
        for item in self.items.iter_mut() {
            if Self::can_boost(item) {
                let delta = self.config.boost_delta(item.priority_fee());
                item.apply_boost(item.timestamp_ms().saturating_sub(delta));
                boosted += 1;
            }
        }
        self.items.sort_by_key(|item| item.timestamp_ms());
        trace!(items = self.items.len(), boosted, "time boost applied");
        boosted
    }

    pub fn items(&self) -> &[T] {
        self.items
    }
}
