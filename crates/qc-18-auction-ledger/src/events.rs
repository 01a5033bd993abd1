//! # Event Schema
//!
//! Events the ledger publishes through the `EventSink` port. An event is
//! published only after its operation committed; failed operations publish
//! nothing.
//!
//! | Event | Emitted by |
//! |-------|------------|
//! | `AuctionCreated` | `create` |
//! | `AuctionStarted` | `start` |
//! | `BidPlaced` | `bid` |
//! | `AuctionEnded` | `end` (once, when settlement completes) |
//! | `Withdrawn` | `withdraw` |
//! | `FeesSwept` | `sweep_fees` |

use crate::domain::{Address, AssetRef, AuctionId, Timestamp};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Ledger event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    /// Asset escrowed and auction registered.
    AuctionCreated {
        /// Auction id.
        id: AuctionId,
        /// Seller.
        owner: Address,
        /// Escrowed asset.
        asset: AssetRef,
        /// Minimum acceptable bid.
        minimum_bid: U256,
    },
    /// Bidding window opened.
    AuctionStarted {
        /// Auction id.
        id: AuctionId,
        /// Window start.
        start_time: Timestamp,
    },
    /// Bid accepted. `amount` is the full bid, not the escrow delta.
    BidPlaced {
        /// Auction id.
        id: AuctionId,
        /// Bidder.
        bidder: Address,
        /// Bid amount.
        amount: U256,
    },
    /// Settlement completed.
    AuctionEnded {
        /// Auction id.
        id: AuctionId,
        /// Window end.
        end_time: Timestamp,
        /// Winner, if anyone bid.
        winner: Option<Address>,
        /// Winning bid (0 without a winner).
        winning_bid: U256,
        /// Amount paid to the seller.
        seller_proceeds: U256,
    },
    /// Escrow refunded to a non-winning bidder.
    Withdrawn {
        /// Auction id.
        id: AuctionId,
        /// Bidder.
        bidder: Address,
        /// Amount refunded.
        amount: U256,
    },
    /// Fee pool paid to the admin.
    FeesSwept {
        /// Admin.
        admin: Address,
        /// Amount swept.
        amount: U256,
    },
}

impl AuctionEvent {
    /// Auction the event belongs to, if any.
    pub fn auction_id(&self) -> Option<AuctionId> {
        match self {
            Self::AuctionCreated { id, .. }
            | Self::AuctionStarted { id, .. }
            | Self::BidPlaced { id, .. }
            | Self::AuctionEnded { id, .. }
            | Self::Withdrawn { id, .. } => Some(*id),
            Self::FeesSwept { .. } => None,
        }
    }
}
