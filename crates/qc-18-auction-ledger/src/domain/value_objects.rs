//! # Domain Value Objects
//!
//! Immutable value types for the Auction Ledger.

use super::errors::{Address, ZERO_ADDRESS};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Auction identifier. Allocated from 1 upward; 0 is never a valid id.
pub type AuctionId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Reference to a unique asset held in an external registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    /// Registry identity.
    pub registry: Address,
    /// Asset id within the registry.
    pub asset_id: U256,
}

impl AssetRef {
    /// Create a new asset reference.
    pub fn new(registry: Address, asset_id: U256) -> Self {
        Self { registry, asset_id }
    }

    /// True when the registry identity is the null address.
    pub fn is_null(&self) -> bool {
        self.registry == ZERO_ADDRESS
    }
}

/// Bidding window, fixed once the seller starts the auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiddingWindow {
    /// Time `start` was called.
    pub start_time: Timestamp,
    /// `start_time + duration`.
    pub end_time: Timestamp,
}

impl BiddingWindow {
    /// Open a window at `start_time` lasting `duration` seconds.
    ///
    /// Returns `None` if the end time overflows.
    pub fn open(start_time: Timestamp, duration: u64) -> Option<Self> {
        start_time.checked_add(duration).map(|end_time| Self {
            start_time,
            end_time,
        })
    }

    /// Bids are accepted strictly inside the window.
    pub fn accepts_bids_at(&self, now: Timestamp) -> bool {
        self.start_time < now && now < self.end_time
    }

    /// Settlement is allowed from `end_time` on.
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }
}

/// Lifecycle phase derived from the record and the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Asset escrowed, `start` not yet called.
    Created,
    /// Window open.
    Active,
    /// Window closed, awaiting (or partway through) settlement.
    Ended,
    /// Asset and proceeds delivered.
    Settled,
}

/// Progress of the settlement step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    /// `end` has not succeeded yet.
    #[default]
    Pending,
    /// Seller proceeds paid; asset delivery still outstanding.
    ProceedsPaid,
    /// Asset delivered; terminal.
    Complete,
}

/// Public per-auction state snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    /// Auction id.
    pub id: AuctionId,
    /// Seller identity.
    pub seller: Address,
    /// Escrowed asset.
    pub asset: AssetRef,
    /// Minimum acceptable bid.
    pub minimum_bid: U256,
    /// Highest bid (0 after settlement).
    pub highest_bid: U256,
    /// Current leader or winner.
    pub highest_bidder: Option<Address>,
    /// 0 until started.
    ///
    /// A start at clock time 0 also reports 0 here; `phase` is `Created`
    /// only for an auction that was never started.
    pub start_time: Timestamp,
    /// 0 until started (and always `start_time + duration` after).
    pub end_time: Timestamp,
    /// Phase at the time of the snapshot.
    pub phase: AuctionPhase,
    /// Settlement progress.
    pub settlement: Settlement,
    /// Winning bid once proceeds are paid, otherwise 0.
    pub sale_price: U256,
    /// Number of distinct bidders with an escrow entry.
    pub bidder_count: usize,
}

/// Running counters exposed by the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Auctions created.
    pub auctions_created: u64,
    /// Bids accepted.
    pub bids_placed: u64,
    /// Auctions fully settled.
    pub settlements: u64,
    /// Successful withdrawals.
    pub withdrawals: u64,
    /// Total fees swept by the admin.
    pub fees_swept: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_ref_null() {
        assert!(AssetRef::new(ZERO_ADDRESS, U256::from(1u64)).is_null());
        assert!(!AssetRef::new([1u8; 20], U256::zero()).is_null());
    }

    #[test]
    fn test_window_bounds_are_strict() {
        let window = BiddingWindow::open(1000, 1000).unwrap();
        assert_eq!(window.end_time, 2000);
        assert!(!window.accepts_bids_at(1000));
        assert!(window.accepts_bids_at(1001));
        assert!(window.accepts_bids_at(1999));
        assert!(!window.accepts_bids_at(2000));
    }

    #[test]
    fn test_window_has_ended() {
        let window = BiddingWindow::open(1000, 10).unwrap();
        assert!(!window.has_ended(1009));
        assert!(window.has_ended(1010));
    }

    #[test]
    fn test_window_overflow() {
        assert!(BiddingWindow::open(u64::MAX, 1).is_none());
    }

    #[test]
    fn test_settlement_default_pending() {
        assert_eq!(Settlement::default(), Settlement::Pending);
    }
}
