//! # Inbound Ports
//!
//! API trait defining what the Auction Ledger can do, plus the custody
//! callback the ledger exposes to asset registries.
//!
//! ## Authorization
//!
//! | Method | Authorized Caller |
//! |--------|-------------------|
//! | `create` | Asset owner that approved the custodian |
//! | `start`, `end` | Auction seller |
//! | `bid`, `withdraw` | Anyone |
//! | `sweep_fees`, `fee_pool` | Ledger admin |

use crate::domain::{
    Address, AssetRef, AuctionError, AuctionId, AuctionSnapshot, LedgerStats,
};
use primitive_types::U256;

/// Acknowledgement a custody receiver returns for an accepted asset.
///
/// Same 4-byte value ERC-721 receivers return (`onERC721Received` selector).
pub const CUSTODY_ACCEPTED: [u8; 4] = [0x15, 0x0b, 0x7a, 0x02];

/// Auction Ledger API - inbound port.
///
/// Each call runs to completion as one unit of work. Failed calls leave the
/// ledger exactly as it was, with one exception: when `end` paid the seller
/// but could not deliver the asset, the auction stays in
/// `Settlement::ProceedsPaid` and the next `end` only retries delivery.
pub trait AuctionLedgerApi: Send + Sync {
    /// Escrow `asset` and register a new auction. Returns its id.
    ///
    /// # Errors
    /// - `InvalidAsset`: null registry
    /// - `NotAuthorized`: caller does not own the asset or has not approved the ledger
    /// - `RegistryQueryFailed`: ownership or approval lookup failed
    /// - `TransferFailed`: the registry transfer into custody failed
    fn create(
        &self,
        caller: Address,
        asset: AssetRef,
        minimum_bid: U256,
    ) -> Result<AuctionId, AuctionError>;

    /// Open the bidding window for `duration` seconds from now.
    ///
    /// # Errors
    /// - `NotOwner`, `AlreadyStarted`, `AuctionOutOfRange`, `InvalidDuration`
    fn start(
        &self,
        caller: Address,
        auction_id: AuctionId,
        duration: u64,
    ) -> Result<(), AuctionError>;

    /// Escrow `amount` from `caller` as a bid.
    ///
    /// # Errors
    /// - `AuctionOutOfRange`, `AuctionNotStarted`, `AuctionExpired`
    /// - `BidTooLow`, `SelfOutbid`, `EscrowFailed`
    fn bid(&self, caller: Address, auction_id: AuctionId, amount: U256)
        -> Result<(), AuctionError>;

    /// Settle an auction whose window has closed.
    ///
    /// # Errors
    /// - `NotOwner`, `AuctionNotStarted`, `AuctionNotYetEnded`, `AlreadySettled`
    /// - `SettlementInProgress`: re-entered while another `end` is running
    /// - `FeeExceedsBid`, `AssetTransferFailed`, `FundTransferFailed`
    fn end(&self, caller: Address, auction_id: AuctionId) -> Result<(), AuctionError>;

    /// Refund the caller's full escrow. Returns the amount sent.
    ///
    /// # Errors
    /// - `NoBid`, `CannotWithdrawAsLeader`, `FundTransferFailed`
    fn withdraw(&self, caller: Address, auction_id: AuctionId) -> Result<U256, AuctionError>;

    /// Pay the whole fee pool to the admin. Returns the amount sent.
    ///
    /// # Errors
    /// - `NotAdmin`, `FundTransferFailed`
    fn sweep_fees(&self, caller: Address) -> Result<U256, AuctionError>;

    /// Current fee pool (admin only).
    fn fee_pool(&self, caller: Address) -> Result<U256, AuctionError>;

    /// Public snapshot of one auction.
    fn auction(&self, auction_id: AuctionId) -> Result<AuctionSnapshot, AuctionError>;

    /// Cumulative escrow of `bidder` in `auction_id`.
    fn escrow_of(&self, auction_id: AuctionId, bidder: Address) -> Result<U256, AuctionError>;

    /// Number of auctions created so far (also the highest valid id).
    fn auction_count(&self) -> u64;

    /// Running counters.
    fn stats(&self) -> LedgerStats;
}

/// Custody callback invoked by a registry's safe transfer.
///
/// Returning anything other than [`CUSTODY_ACCEPTED`] makes the registry
/// abort the transfer.
pub trait CustodyReceiver: Send + Sync {
    /// Called after `asset` was transferred from `from` to this receiver.
    fn on_custody_received(&self, operator: Address, from: Address, asset: AssetRef) -> [u8; 4];
}
