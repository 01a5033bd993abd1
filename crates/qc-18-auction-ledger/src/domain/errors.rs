//! # Domain Errors
//!
//! Error types for the Auction Ledger and its outbound collaborators.

use super::value_objects::AuctionId;
use primitive_types::U256;
use thiserror::Error;

/// Address type (20-byte identity).
pub type Address = [u8; 20];

/// The null identity.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Hex rendering used by error messages and logs.
pub fn fmt_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Coarse classification of every ledger failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong caller role (not seller, not admin, not asset owner).
    Authorization,
    /// Operation invalid for the current lifecycle state.
    State,
    /// Bad input value.
    Value,
    /// The asset registry or fund channel reported failure.
    ExternalCall,
}

/// Auction Ledger error types.
///
/// Every error aborts the whole operation; no partial state survives it.
#[derive(Debug, Error)]
pub enum AuctionError {
    /// Asset reference points at the null registry.
    #[error("Invalid asset: registry address is null")]
    InvalidAsset,

    /// Caller does not own the asset or has not approved the custodian.
    #[error("Not authorized: {} cannot hand asset {asset_id} to the ledger", fmt_address(.caller))]
    NotAuthorized {
        /// Calling identity
        caller: Address,
        /// Asset id within its registry
        asset_id: U256,
    },

    /// Caller is not the seller of the auction.
    #[error("Not owner of auction {auction_id}: {}", fmt_address(.caller))]
    NotOwner {
        /// Auction id
        auction_id: AuctionId,
        /// Calling identity
        caller: Address,
    },

    /// Caller is not the ledger administrator.
    #[error("Not admin: {}", fmt_address(.0))]
    NotAdmin(Address),

    /// `start` was already called.
    #[error("Auction {0} already started")]
    AlreadyStarted(AuctionId),

    /// Auction has not started (or the bidding window has not opened).
    #[error("Auction {0} not started")]
    AuctionNotStarted(AuctionId),

    /// No auction with this id.
    #[error("Auction {0} out of range")]
    AuctionOutOfRange(AuctionId),

    /// Bidding window has closed.
    #[error("Auction {auction_id} expired at {end_time}")]
    AuctionExpired {
        /// Auction id
        auction_id: AuctionId,
        /// Window end (Unix seconds)
        end_time: u64,
    },

    /// Settlement requested before the window closed.
    #[error("Auction {auction_id} not yet ended: {now} < {end_time}")]
    AuctionNotYetEnded {
        /// Auction id
        auction_id: AuctionId,
        /// Current time (Unix seconds)
        now: u64,
        /// Window end (Unix seconds)
        end_time: u64,
    },

    /// Settlement already completed.
    #[error("Auction {0} already settled")]
    AlreadySettled(AuctionId),

    /// Another `end` call on this auction is still running.
    #[error("Settlement of auction {0} already in progress")]
    SettlementInProgress(AuctionId),

    /// Bid does not beat the highest bid or the minimum.
    #[error("Bid too low: {amount} (highest {highest}, minimum {minimum})")]
    BidTooLow {
        /// Offered amount
        amount: U256,
        /// Current highest bid
        highest: U256,
        /// Auction minimum
        minimum: U256,
    },

    /// The leader tried to outbid themselves.
    #[error("Self outbid: {} already leads auction {auction_id}", fmt_address(.bidder))]
    SelfOutbid {
        /// Auction id
        auction_id: AuctionId,
        /// Leading bidder
        bidder: Address,
    },

    /// Caller has nothing escrowed.
    #[error("No bid from {} on auction {auction_id}", fmt_address(.bidder))]
    NoBid {
        /// Auction id
        auction_id: AuctionId,
        /// Calling identity
        bidder: Address,
    },

    /// The leader's escrow is locked into the sale.
    #[error("Cannot withdraw as leader of auction {0}")]
    CannotWithdrawAsLeader(AuctionId),

    /// Winning bid cannot cover the protocol fee.
    #[error("Fee {fee} exceeds winning bid {bid}")]
    FeeExceedsBid {
        /// Winning bid
        bid: U256,
        /// Protocol fee
        fee: U256,
    },

    /// Start time plus duration overflows.
    #[error("Invalid duration: {0}")]
    InvalidDuration(u64),

    /// Ownership/approval query against the registry failed.
    #[error("Registry query failed: {0}")]
    RegistryQueryFailed(#[source] RegistryError),

    /// Pulling the asset into custody failed at creation.
    #[error("Asset transfer into custody failed: {0}")]
    TransferFailed(#[source] RegistryError),

    /// Delivering the asset at settlement failed.
    #[error("Asset transfer failed for auction {auction_id}: {source}")]
    AssetTransferFailed {
        /// Auction id
        auction_id: AuctionId,
        /// Registry failure
        #[source]
        source: RegistryError,
    },

    /// Paying out value failed.
    #[error("Fund transfer failed: {0}")]
    FundTransferFailed(#[source] FundTransferError),

    /// Pulling bid funds into escrow failed.
    #[error("Escrow failed: {0}")]
    EscrowFailed(#[source] FundTransferError),
}

impl AuctionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthorized { .. } | Self::NotOwner { .. } | Self::NotAdmin(_) => {
                ErrorKind::Authorization
            }
            Self::AlreadyStarted(_)
            | Self::AuctionNotStarted(_)
            | Self::AuctionExpired { .. }
            | Self::AuctionNotYetEnded { .. }
            | Self::AlreadySettled(_)
            | Self::SettlementInProgress(_)
            | Self::CannotWithdrawAsLeader(_) => ErrorKind::State,
            Self::InvalidAsset
            | Self::AuctionOutOfRange(_)
            | Self::BidTooLow { .. }
            | Self::SelfOutbid { .. }
            | Self::NoBid { .. }
            | Self::FeeExceedsBid { .. }
            | Self::InvalidDuration(_) => ErrorKind::Value,
            Self::RegistryQueryFailed(_)
            | Self::TransferFailed(_)
            | Self::AssetTransferFailed { .. }
            | Self::FundTransferFailed(_)
            | Self::EscrowFailed(_) => ErrorKind::ExternalCall,
        }
    }
}

/// Asset registry failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry does not know the asset.
    #[error("unknown asset {0}")]
    UnknownAsset(U256),

    /// Transfer attempted by a party that does not hold the asset.
    #[error("unauthorized transfer of asset {asset_id} from {}", fmt_address(.from))]
    UnauthorizedTransfer {
        /// Asset id
        asset_id: U256,
        /// Claimed holder
        from: Address,
    },

    /// Recipient did not acknowledge custody.
    #[error("recipient {} rejected custody", fmt_address(.0))]
    RecipientRejected(Address),

    /// Registry unreachable or otherwise failed.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Fund transfer channel failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FundTransferError {
    /// Payer cannot cover the amount.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Requested amount
        required: U256,
        /// Available balance
        available: U256,
    },

    /// Recipient refused the payment.
    #[error("recipient {} rejected payment", fmt_address(.0))]
    Rejected(Address),

    /// Channel unreachable or otherwise failed.
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}
