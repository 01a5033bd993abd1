//! # Outbound Ports
//!
//! Traits for external dependencies: the asset registry, the fund channel,
//! the event log, and the clock.
//!
//! Any outbound call may re-enter the ledger. The ledger never holds its
//! state lock across one of these calls.

use crate::domain::{Address, AssetRef, FundTransferError, RegistryError, Timestamp};
use crate::events::AuctionEvent;
use primitive_types::U256;

/// Asset registry - outbound port.
///
/// Custodies unique assets. Implementations route by `asset.registry`.
pub trait AssetRegistry: Send + Sync {
    /// Current holder of the asset.
    fn owner_of(&self, asset: &AssetRef) -> Result<Address, RegistryError>;

    /// Whether `custodian` may move the asset on the holder's behalf.
    fn is_approved_for_transfer(
        &self,
        asset: &AssetRef,
        custodian: &Address,
    ) -> Result<bool, RegistryError>;

    /// Move the asset. Fails on unauthorized transfers.
    fn transfer(&self, asset: &AssetRef, from: &Address, to: &Address)
        -> Result<(), RegistryError>;

    /// As `transfer`, but the recipient must acknowledge custody.
    fn safe_transfer(
        &self,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), RegistryError>;
}

/// Fund transfer channel - outbound port.
///
/// Best-effort value movement. Every failure is reported, never swallowed.
pub trait FundTransferChannel: Send + Sync {
    /// Push `amount` from ledger custody to `to`.
    fn send(&self, to: &Address, amount: U256) -> Result<(), FundTransferError>;

    /// Pull `amount` from `from` into ledger custody.
    fn collect(&self, from: &Address, amount: U256) -> Result<(), FundTransferError>;
}

/// Event sink - outbound port.
///
/// Receives an event only after the emitting operation committed.
pub trait EventSink: Send + Sync {
    /// Publish an event.
    fn publish(&self, event: AuctionEvent);
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current Unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
