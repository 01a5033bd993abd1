//! # Domain Invariants
//!
//! Escrow and settlement rules checked by the service after every commit
//! (debug builds) and by the test suite.

use super::entities::Auction;
use super::value_objects::{BiddingWindow, Settlement};
use primitive_types::U256;

/// Invariant: leader consistency.
///
/// Before proceeds are paid, either nobody has bid (`highest_bid == 0`, no
/// leader) or the leader exists and its cumulative escrow covers
/// `highest_bid`.
pub fn invariant_leader_consistent(auction: &Auction) -> bool {
    if auction.settlement != Settlement::Pending {
        return auction.highest_bid.is_zero();
    }
    match auction.highest_bidder {
        None => auction.highest_bid.is_zero(),
        Some(leader) => {
            !auction.highest_bid.is_zero() && auction.escrow_of(&leader) >= auction.highest_bid
        }
    }
}

/// Invariant: the bidding window never changes once set.
pub fn invariant_window_fixed(
    before: Option<BiddingWindow>,
    after: Option<BiddingWindow>,
) -> bool {
    match before {
        None => true,
        Some(window) => after == Some(window),
    }
}

/// Invariant: the ledger holds enough value to cover every obligation.
///
/// `held` is the value the ledger has collected and not yet paid out;
/// obligations are all escrow balances that are still refundable or payable
/// plus the fee pool.
pub fn invariant_solvent<'a>(
    held: U256,
    auctions: impl IntoIterator<Item = &'a Auction>,
    fee_pool: U256,
) -> bool {
    let mut owed = fee_pool;
    for auction in auctions {
        for (bidder, balance) in &auction.bids {
            // The winner's escrow stops being owed once proceeds are paid.
            let settled_winner = auction.settlement != Settlement::Pending
                && auction.highest_bidder.as_ref() == Some(bidder);
            if !settled_winner {
                owed = owed.saturating_add(*balance);
            }
        }
    }
    held >= owed
}
