//! # QC-18 Auction Ledger
//!
//! Sealed-asset auctions with escrowed bids and pull-based refunds.
//!
//! **Subsystem ID:** 18
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! A seller escrows a unique asset with the ledger and opens a timed
//! bidding window. Bidders escrow value; every accepted bid must beat the
//! current highest bid and the seller's minimum. Once the window closes the
//! seller settles: the winner gets the asset, the seller gets the winning
//! bid minus a flat protocol fee, and the fee accrues to a pool only the
//! admin can sweep. Outbid bidders pull their escrow back themselves.
//!
//! ## Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Leader consistency | No leader means `highest_bid == 0`; otherwise the leader's escrow covers it |
//! | Fixed window | `start_time`/`end_time` never change once set |
//! | Single settlement | Proceeds are paid at most once per auction |
//! | Solvency | Held value covers all refundable escrow plus the fee pool |
//! | Leader lock | The current leader (or winner) can never withdraw |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `AssetRegistry` | Ownership checks and asset transfers |
//! | `FundTransferChannel` | Collecting bids, paying refunds, proceeds and fees |
//! | `EventSink` | Publishing committed events |
//! | `TimeSource` | Current time in seconds |
//!
//! Any outbound call may re-enter the ledger. State is updated before the
//! call and compensated if it fails; the state lock is never held across it.
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-auction-ledger/
//! ├── domain/          # Auction, BiddingWindow, errors, invariants
//! ├── ports/           # AuctionLedgerApi, CustodyReceiver, outbound traits
//! ├── adapters/        # In-memory registry, fund channel, event log, clock
//! ├── config.rs        # LedgerConfig (env-driven)
//! ├── events.rs        # AuctionEvent schema
//! └── service.rs       # AuctionLedger
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryAssetRegistry, InMemoryEventLog, InMemoryFundChannel, ManualClock};
pub use config::{LedgerConfig, DEFAULT_PROTOCOL_FEE};
pub use domain::{
    fmt_address, invariant_leader_consistent, invariant_solvent, invariant_window_fixed,
    Address, AssetRef, Auction, AuctionError, AuctionId, AuctionParams, AuctionPhase,
    AuctionSnapshot, BiddingWindow, ErrorKind, FundTransferError, LedgerStats, RegistryError,
    Settlement, Timestamp, ZERO_ADDRESS,
};
pub use events::AuctionEvent;
pub use ports::{
    AssetRegistry, AuctionLedgerApi, CustodyReceiver, EventSink, FundTransferChannel,
    SystemTimeSource, TimeSource, CUSTODY_ACCEPTED,
};
pub use primitive_types::U256;
pub use service::AuctionLedger;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
