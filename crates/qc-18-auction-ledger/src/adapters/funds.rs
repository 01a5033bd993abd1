//! Fund Channel Adapter
//!
//! Implements the `FundTransferChannel` port with in-memory balances.

use crate::domain::{fmt_address, Address, FundTransferError};
use crate::ports::outbound::FundTransferChannel;
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Default)]
struct Balances {
    accounts: HashMap<Address, U256>,
    custody: U256,
    rejecting: HashSet<Address>,
    unavailable: bool,
}

/// In-memory fund channel.
///
/// Tracks participant balances and the value held in ledger custody, so
/// tests can check exact payouts.
#[derive(Default)]
pub struct InMemoryFundChannel {
    inner: Mutex<Balances>,
}

impl InMemoryFundChannel {
    /// Create a channel with no balances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account`.
    pub fn deposit(&self, account: Address, amount: U256) {
        let mut inner = self.inner.lock();
        let balance = inner.accounts.entry(account).or_insert_with(U256::zero);
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.inner
            .lock()
            .accounts
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Value currently held in ledger custody.
    pub fn custody_balance(&self) -> U256 {
        self.inner.lock().custody
    }

    /// Make payments to `account` fail (or succeed again).
    pub fn set_rejecting(&self, account: Address, rejecting: bool) {
        let mut inner = self.inner.lock();
        if rejecting {
            inner.rejecting.insert(account);
        } else {
            inner.rejecting.remove(&account);
        }
    }

    /// Make every call fail with `Unavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }
}

impl FundTransferChannel for InMemoryFundChannel {
    fn send(&self, to: &Address, amount: U256) -> Result<(), FundTransferError> {
        let mut inner = self.inner.lock();
        if inner.unavailable {
            return Err(FundTransferError::Unavailable("channel offline".to_string()));
        }
        if inner.rejecting.contains(to) {
            return Err(FundTransferError::Rejected(*to));
        }
        if inner.custody < amount {
            return Err(FundTransferError::InsufficientFunds {
                required: amount,
                available: inner.custody,
            });
        }
        inner.custody -= amount;
        let balance = inner.accounts.entry(*to).or_insert_with(U256::zero);
        *balance = balance.saturating_add(amount);

        debug!(to = %fmt_address(to), %amount, "[qc-18] Funds sent");
        Ok(())
    }

    fn collect(&self, from: &Address, amount: U256) -> Result<(), FundTransferError> {
        let mut inner = self.inner.lock();
        if inner.unavailable {
            return Err(FundTransferError::Unavailable("channel offline".to_string()));
        }
        let available = inner.accounts.get(from).copied().unwrap_or_default();
        if available < amount {
            return Err(FundTransferError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        inner.accounts.insert(*from, available - amount);
        inner.custody = inner.custody.saturating_add(amount);

        debug!(from = %fmt_address(from), %amount, "[qc-18] Funds collected");
        Ok(())
    }
}
