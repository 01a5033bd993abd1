//! Asset Registry Adapter
//!
//! Implements the `AssetRegistry` port in memory. Holds any number of
//! registries, keyed by `AssetRef::registry`.

use crate::domain::{fmt_address, Address, AssetRef, RegistryError};
use crate::ports::inbound::{CustodyReceiver, CUSTODY_ACCEPTED};
use crate::ports::outbound::AssetRegistry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
struct AssetRecord {
    owner: Address,
    approved: Option<Address>,
}

/// In-memory asset registry.
///
/// Safe transfers to an address with a registered [`CustodyReceiver`] call
/// its callback after the move (outside any registry lock) and undo the move
/// unless the receiver acknowledges with [`CUSTODY_ACCEPTED`]. Addresses
/// without a receiver always accept.
#[derive(Default)]
pub struct InMemoryAssetRegistry {
    assets: RwLock<HashMap<AssetRef, AssetRecord>>,
    receivers: RwLock<HashMap<Address, Arc<dyn CustodyReceiver>>>,
    unavailable: AtomicBool,
}

impl InMemoryAssetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `asset` held by `owner`.
    pub fn mint(&self, asset: AssetRef, owner: Address) {
        self.assets.write().insert(
            asset,
            AssetRecord {
                owner,
                approved: None,
            },
        );
    }

    /// Approve `operator` to move `asset` on behalf of its holder `owner`.
    pub fn approve(
        &self,
        asset: &AssetRef,
        owner: &Address,
        operator: Address,
    ) -> Result<(), RegistryError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or(RegistryError::UnknownAsset(asset.asset_id))?;
        if record.owner != *owner {
            return Err(RegistryError::UnauthorizedTransfer {
                asset_id: asset.asset_id,
                from: *owner,
            });
        }
        record.approved = Some(operator);
        Ok(())
    }

    /// Register a custody callback for `address`.
    pub fn register_receiver(&self, address: Address, receiver: Arc<dyn CustodyReceiver>) {
        self.receivers.write().insert(address, receiver);
    }

    /// Make every call fail with `Unavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry offline".to_string()));
        }
        Ok(())
    }

    fn move_asset(
        &self,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), RegistryError> {
        let mut assets = self.assets.write();
        let record = assets
            .get_mut(asset)
            .ok_or(RegistryError::UnknownAsset(asset.asset_id))?;
        if record.owner != *from {
            return Err(RegistryError::UnauthorizedTransfer {
                asset_id: asset.asset_id,
                from: *from,
            });
        }
        record.owner = *to;
        record.approved = None;
        Ok(())
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn owner_of(&self, asset: &AssetRef) -> Result<Address, RegistryError> {
        self.ensure_available()?;
        self.assets
            .read()
            .get(asset)
            .map(|record| record.owner)
            .ok_or(RegistryError::UnknownAsset(asset.asset_id))
    }

    fn is_approved_for_transfer(
        &self,
        asset: &AssetRef,
        custodian: &Address,
    ) -> Result<bool, RegistryError> {
        self.ensure_available()?;
        self.assets
            .read()
            .get(asset)
            .map(|record| record.approved.as_ref() == Some(custodian))
            .ok_or(RegistryError::UnknownAsset(asset.asset_id))
    }

    fn transfer(
        &self,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), RegistryError> {
        self.ensure_available()?;
        debug!(
            asset_id = %asset.asset_id,
            from = %fmt_address(from),
            to = %fmt_address(to),
            "[qc-18] Registry transfer"
        );
        self.move_asset(asset, from, to)
    }

    fn safe_transfer(
        &self,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), RegistryError> {
        self.transfer(asset, from, to)?;

        let receiver = self.receivers.read().get(to).cloned();
        if let Some(receiver) = receiver {
            if receiver.on_custody_received(*from, *from, *asset) != CUSTODY_ACCEPTED {
                warn!(to = %fmt_address(to), "[qc-18] Recipient rejected custody, reverting");
                self.move_asset(asset, to, from)?;
                return Err(RegistryError::RecipientRejected(*to));
            }
        }
        Ok(())
    }
}
