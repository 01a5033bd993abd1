//! # Domain Entities
//!
//! The auction record and its lifecycle transitions. All checks here are
//! pure; moving assets and funds is the service's job.

use super::errors::{Address, AuctionError};
use super::value_objects::{
    AssetRef, AuctionId, AuctionPhase, AuctionSnapshot, BiddingWindow, Settlement, Timestamp,
};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for creating an auction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuctionParams {
    /// Seller identity.
    pub seller: Address,
    /// Escrowed asset.
    pub asset: AssetRef,
    /// Minimum acceptable bid.
    pub minimum_bid: U256,
}

/// A single auction record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auction {
    /// Unique identifier.
    pub id: AuctionId,
    /// Seller; immutable.
    pub seller: Address,
    /// Escrowed asset; immutable.
    pub asset: AssetRef,
    /// Minimum acceptable bid; immutable.
    pub minimum_bid: U256,
    /// Highest accepted bid amount. Reset to 0 once proceeds are paid.
    pub highest_bid: U256,
    /// Leader while active, winner after settlement.
    pub highest_bidder: Option<Address>,
    /// Set exactly once by `start`.
    pub window: Option<BiddingWindow>,
    /// Cumulative escrow per bidder. Entries are kept after withdrawal.
    pub bids: HashMap<Address, U256>,
    /// Settlement progress.
    pub settlement: Settlement,
    /// Winning bid, recorded when proceeds are paid.
    pub sale_price: U256,
    /// Set while an `end` call is talking to the registry or fund channel.
    pub settling: bool,
}

impl Auction {
    /// Create a new, not yet started auction.
    pub fn new(id: AuctionId, params: AuctionParams) -> Self {
        Self {
            id,
            seller: params.seller,
            asset: params.asset,
            minimum_bid: params.minimum_bid,
            highest_bid: U256::zero(),
            highest_bidder: None,
            window: None,
            bids: HashMap::new(),
            settlement: Settlement::Pending,
            sale_price: U256::zero(),
            settling: false,
        }
    }

    /// Phase at `now`.
    pub fn phase(&self, now: Timestamp) -> AuctionPhase {
        match (self.settlement, self.window) {
            (Settlement::Complete, _) => AuctionPhase::Settled,
            (_, None) => AuctionPhase::Created,
            (_, Some(window)) if window.has_ended(now) => AuctionPhase::Ended,
            (_, Some(_)) => AuctionPhase::Active,
        }
    }

    /// Seller check shared by `start` and `end`.
    pub fn ensure_seller(&self, caller: &Address) -> Result<(), AuctionError> {
        if *caller != self.seller {
            return Err(AuctionError::NotOwner {
                auction_id: self.id,
                caller: *caller,
            });
        }
        Ok(())
    }

    /// Open the bidding window.
    pub fn start(
        &mut self,
        caller: &Address,
        now: Timestamp,
        duration: u64,
    ) -> Result<BiddingWindow, AuctionError> {
        self.ensure_seller(caller)?;
        if self.window.is_some() {
            return Err(AuctionError::AlreadyStarted(self.id));
        }
        let window =
            BiddingWindow::open(now, duration).ok_or(AuctionError::InvalidDuration(duration))?;
        self.window = Some(window);
        Ok(window)
    }

    /// Check a bid against the current state without changing anything.
    pub fn validate_bid(
        &self,
        bidder: &Address,
        amount: U256,
        now: Timestamp,
    ) -> Result<(), AuctionError> {
        let window = self
            .window
            .ok_or(AuctionError::AuctionNotStarted(self.id))?;
        if now <= window.start_time {
            return Err(AuctionError::AuctionNotStarted(self.id));
        }
        if !window.accepts_bids_at(now) {
            return Err(AuctionError::AuctionExpired {
                auction_id: self.id,
                end_time: window.end_time,
            });
        }
        if self.highest_bidder.as_ref() == Some(bidder) {
            return Err(AuctionError::SelfOutbid {
                auction_id: self.id,
                bidder: *bidder,
            });
        }
        if amount <= self.highest_bid || amount < self.minimum_bid {
            return Err(AuctionError::BidTooLow {
                amount,
                highest: self.highest_bid,
                minimum: self.minimum_bid,
            });
        }
        Ok(())
    }

    /// Record an already validated bid. Returns the bidder's cumulative escrow.
    ///
    /// Earlier escrow of the same bidder is not refunded: the new amount is
    /// added on top.
    pub fn record_bid(&mut self, bidder: Address, amount: U256) -> U256 {
        let escrow = self.bids.entry(bidder).or_insert_with(U256::zero);
        *escrow = escrow.saturating_add(amount);
        let total = *escrow;
        if amount > self.highest_bid {
            self.highest_bid = amount;
            self.highest_bidder = Some(bidder);
        }
        total
    }

    /// Check that `caller` may settle at `now`.
    pub fn validate_end(&self, caller: &Address, now: Timestamp) -> Result<(), AuctionError> {
        self.ensure_seller(caller)?;
        let window = self
            .window
            .ok_or(AuctionError::AuctionNotStarted(self.id))?;
        if !window.has_ended(now) {
            return Err(AuctionError::AuctionNotYetEnded {
                auction_id: self.id,
                now,
                end_time: window.end_time,
            });
        }
        if self.settlement == Settlement::Complete {
            return Err(AuctionError::AlreadySettled(self.id));
        }
        if self.settling {
            return Err(AuctionError::SettlementInProgress(self.id));
        }
        Ok(())
    }

    /// Cumulative escrow of `bidder` (0 if none).
    pub fn escrow_of(&self, bidder: &Address) -> U256 {
        self.bids.get(bidder).copied().unwrap_or_default()
    }

    /// Zero the escrow of a non-leading bidder and return what was held.
    pub fn take_escrow(&mut self, bidder: &Address) -> Result<U256, AuctionError> {
        let balance = self.escrow_of(bidder);
        if balance.is_zero() {
            return Err(AuctionError::NoBid {
                auction_id: self.id,
                bidder: *bidder,
            });
        }
        if self.highest_bidder.as_ref() == Some(bidder) {
            return Err(AuctionError::CannotWithdrawAsLeader(self.id));
        }
        self.bids.insert(*bidder, U256::zero());
        Ok(balance)
    }

    /// Put back escrow taken by a withdrawal whose payout failed.
    pub fn restore_escrow(&mut self, bidder: Address, amount: U256) {
        let escrow = self.bids.entry(bidder).or_insert_with(U256::zero);
        *escrow = escrow.saturating_add(amount);
    }

    /// Public snapshot at `now`.
    pub fn snapshot(&self, now: Timestamp) -> AuctionSnapshot {
        AuctionSnapshot {
            id: self.id,
            seller: self.seller,
            asset: self.asset,
            minimum_bid: self.minimum_bid,
            highest_bid: self.highest_bid,
            highest_bidder: self.highest_bidder,
            start_time: self.window.map_or(0, |w| w.start_time),
            end_time: self.window.map_or(0, |w| w.end_time),
            phase: self.phase(now),
            settlement: self.settlement,
            sale_price: self.sale_price,
            bidder_count: self.bids.len(),
        }
    }
}
