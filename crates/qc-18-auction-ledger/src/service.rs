//! # Auction Ledger Service
//!
//! Wires the domain rules to the outbound ports.
//!
//! ## Call discipline
//!
//! - All ledger state sits behind one `parking_lot::Mutex`.
//! - The lock is never held across a registry or fund channel call. State
//!   is updated first (balances zeroed, settlement advanced) and put back
//!   if the call fails, so a re-entrant call sees the updated state.
//! - Events are published after the state change committed, outside the
//!   lock.

use crate::config::LedgerConfig;
use crate::domain::{
    fmt_address, invariant_leader_consistent, invariant_solvent, invariant_window_fixed, Address,
    AssetRef, Auction, AuctionError, AuctionId, AuctionParams, AuctionSnapshot, LedgerStats,
    Settlement, Timestamp,
};
use crate::events::AuctionEvent;
use crate::ports::inbound::{AuctionLedgerApi, CustodyReceiver, CUSTODY_ACCEPTED};
use crate::ports::outbound::{AssetRegistry, EventSink, FundTransferChannel, TimeSource};

use parking_lot::Mutex;
use primitive_types::U256;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Default)]
struct LedgerState {
    /// Arena of auctions; id `n` lives at index `n - 1`.
    auctions: Vec<Auction>,
    fee_pool: U256,
    /// Value collected into custody and not yet paid out.
    held: U256,
    stats: LedgerStats,
}

impl LedgerState {
    fn slot(auction_id: AuctionId) -> Option<usize> {
        auction_id
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
    }

    fn auction(&self, auction_id: AuctionId) -> Result<&Auction, AuctionError> {
        Self::slot(auction_id)
            .and_then(|index| self.auctions.get(index))
            .ok_or(AuctionError::AuctionOutOfRange(auction_id))
    }

    fn auction_mut(&mut self, auction_id: AuctionId) -> Result<&mut Auction, AuctionError> {
        Self::slot(auction_id)
            .and_then(|index| self.auctions.get_mut(index))
            .ok_or(AuctionError::AuctionOutOfRange(auction_id))
    }

    fn is_solvent(&self) -> bool {
        invariant_solvent(self.held, &self.auctions, self.fee_pool)
    }

    fn is_consistent(&self, auction_id: AuctionId) -> bool {
        self.auction(auction_id)
            .map_or(true, invariant_leader_consistent)
    }
}

/// What `end` has to do once the lock is released.
enum Settle {
    /// Nobody bid: hand the asset back.
    ReturnToSeller {
        seller: Address,
        asset: AssetRef,
        end_time: Timestamp,
    },
    /// Pay the seller, then deliver the asset.
    PayProceeds {
        seller: Address,
        winner: Address,
        asset: AssetRef,
        bid: U256,
        proceeds: U256,
        fee: U256,
        end_time: Timestamp,
    },
    /// Proceeds already paid by an earlier call; only delivery is left.
    Deliver {
        winner: Address,
        asset: AssetRef,
        bid: U256,
        proceeds: U256,
        end_time: Timestamp,
    },
}

/// The Auction Ledger.
///
/// Generic over its four outbound ports so embedders can plug in real
/// registries and payment rails; tests use the in-memory adapters.
pub struct AuctionLedger<R, F, E, T>
where
    R: AssetRegistry,
    F: FundTransferChannel,
    E: EventSink,
    T: TimeSource,
{
    config: LedgerConfig,
    registry: Arc<R>,
    funds: Arc<F>,
    events: Arc<E>,
    clock: Arc<T>,
    state: Mutex<LedgerState>,
}

impl<R, F, E, T> AuctionLedger<R, F, E, T>
where
    R: AssetRegistry,
    F: FundTransferChannel,
    E: EventSink,
    T: TimeSource,
{
    /// Create a ledger with no auctions and an empty fee pool.
    pub fn new(
        config: LedgerConfig,
        registry: Arc<R>,
        funds: Arc<F>,
        events: Arc<E>,
        clock: Arc<T>,
    ) -> Self {
        info!(
            custodian = %fmt_address(&config.custodian),
            admin = %fmt_address(&config.admin),
            protocol_fee = %config.protocol_fee,
            "[qc-18] Auction ledger initialized"
        );
        Self {
            config,
            registry,
            funds,
            events,
            clock,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Value the ledger holds in custody by its own accounting.
    pub fn custody_value(&self) -> U256 {
        self.state.lock().held
    }

    /// Refund a bid whose funds were collected but which lost its
    /// validity while the lock was released.
    fn refund_rejected_bid(&self, auction_id: AuctionId, bidder: Address, amount: U256) {
        if let Err(e) = self.funds.send(&bidder, amount) {
            // Keep the value withdrawable rather than losing track of it.
            error!(
                auction_id,
                bidder = %fmt_address(&bidder),
                %amount,
                error = %e,
                "[qc-18] Refund of rejected bid failed, crediting escrow"
            );
            let mut state = self.state.lock();
            if let Ok(auction) = state.auction_mut(auction_id) {
                auction.restore_escrow(bidder, amount);
            }
            state.held = state.held.saturating_add(amount);
        }
    }

    /// Clear the settlement guard after a failed delivery.
    fn abort_settlement(&self, auction_id: AuctionId) {
        if let Ok(auction) = self.state.lock().auction_mut(auction_id) {
            auction.settling = false;
        }
    }

    fn settle_unsold(
        &self,
        auction_id: AuctionId,
        seller: Address,
        asset: AssetRef,
        end_time: Timestamp,
    ) -> Result<(), AuctionError> {
        if let Err(source) = self
            .registry
            .safe_transfer(&asset, &self.config.custodian, &seller)
        {
            warn!(auction_id, error = %source, "[qc-18] Returning unsold asset failed");
            self.abort_settlement(auction_id);
            return Err(AuctionError::AssetTransferFailed { auction_id, source });
        }
        self.complete_settlement(auction_id, end_time, None, U256::zero(), U256::zero());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn pay_proceeds(
        &self,
        auction_id: AuctionId,
        seller: Address,
        winner: Address,
        asset: AssetRef,
        bid: U256,
        proceeds: U256,
        fee: U256,
        end_time: Timestamp,
    ) -> Result<(), AuctionError> {
        if let Err(e) = self.funds.send(&seller, proceeds) {
            warn!(
                auction_id,
                seller = %fmt_address(&seller),
                %proceeds,
                error = %e,
                "[qc-18] Seller payout failed, settlement reverted"
            );
            // Record and custody are restored in one critical section.
            let mut state = self.state.lock();
            if let Ok(auction) = state.auction_mut(auction_id) {
                auction.settling = false;
                auction.highest_bid = bid;
                auction.sale_price = U256::zero();
                auction.settlement = Settlement::Pending;
            }
            state.held = state.held.saturating_add(proceeds);
            debug_assert!(state.is_consistent(auction_id));
            debug_assert!(state.is_solvent());
            return Err(AuctionError::FundTransferFailed(e));
        }

        {
            let mut state = self.state.lock();
            state.fee_pool = state.fee_pool.saturating_add(fee);
            debug_assert!(state.is_solvent());
        }
        info!(
            auction_id,
            seller = %fmt_address(&seller),
            %proceeds,
            %fee,
            "[qc-18] Seller proceeds paid"
        );

        self.deliver(auction_id, winner, asset, bid, proceeds, end_time)
    }

    fn deliver(
        &self,
        auction_id: AuctionId,
        winner: Address,
        asset: AssetRef,
        bid: U256,
        proceeds: U256,
        end_time: Timestamp,
    ) -> Result<(), AuctionError> {
        if let Err(source) = self
            .registry
            .safe_transfer(&asset, &self.config.custodian, &winner)
        {
            // Proceeds stay paid; a later `end` retries delivery only.
            warn!(
                auction_id,
                winner = %fmt_address(&winner),
                error = %source,
                "[qc-18] Asset delivery failed"
            );
            self.abort_settlement(auction_id);
            return Err(AuctionError::AssetTransferFailed { auction_id, source });
        }
        self.complete_settlement(auction_id, end_time, Some(winner), bid, proceeds);
        Ok(())
    }

    fn complete_settlement(
        &self,
        auction_id: AuctionId,
        end_time: Timestamp,
        winner: Option<Address>,
        winning_bid: U256,
        seller_proceeds: U256,
    ) {
        {
            let mut state = self.state.lock();
            if let Ok(auction) = state.auction_mut(auction_id) {
                auction.settling = false;
                auction.settlement = Settlement::Complete;
            }
            state.stats.settlements += 1;
            debug_assert!(state.is_consistent(auction_id));
            debug_assert!(state.is_solvent());
        }

        info!(
            auction_id,
            winner = ?winner.as_ref().map(fmt_address),
            %winning_bid,
            %seller_proceeds,
            "[qc-18] Auction settled"
        );
        self.events.publish(AuctionEvent::AuctionEnded {
            id: auction_id,
            end_time,
            winner,
            winning_bid,
            seller_proceeds,
        });
    }
}

impl<R, F, E, T> AuctionLedgerApi for AuctionLedger<R, F, E, T>
where
    R: AssetRegistry,
    F: FundTransferChannel,
    E: EventSink,
    T: TimeSource,
{
    #[instrument(skip(self, caller, asset), fields(caller = %fmt_address(&caller), asset_id = %asset.asset_id))]
    fn create(
        &self,
        caller: Address,
        asset: AssetRef,
        minimum_bid: U256,
    ) -> Result<AuctionId, AuctionError> {
        if asset.is_null() {
            return Err(AuctionError::InvalidAsset);
        }

        let owner = self
            .registry
            .owner_of(&asset)
            .map_err(AuctionError::RegistryQueryFailed)?;
        let approved = self
            .registry
            .is_approved_for_transfer(&asset, &self.config.custodian)
            .map_err(AuctionError::RegistryQueryFailed)?;
        if owner != caller || !approved {
            debug!(owner = %fmt_address(&owner), approved, "[qc-18] Create rejected");
            return Err(AuctionError::NotAuthorized {
                caller,
                asset_id: asset.asset_id,
            });
        }

        // The record only exists once the asset is in custody.
        self.registry
            .transfer(&asset, &caller, &self.config.custodian)
            .map_err(|e| {
                warn!(error = %e, "[qc-18] Escrowing asset failed");
                AuctionError::TransferFailed(e)
            })?;

        let auction_id = {
            let mut state = self.state.lock();
            let auction_id = state.auctions.len() as AuctionId + 1;
            state.auctions.push(Auction::new(
                auction_id,
                AuctionParams {
                    seller: caller,
                    asset,
                    minimum_bid,
                },
            ));
            state.stats.auctions_created += 1;
            auction_id
        };

        info!(auction_id, %minimum_bid, "[qc-18] Auction created");
        self.events.publish(AuctionEvent::AuctionCreated {
            id: auction_id,
            owner: caller,
            asset,
            minimum_bid,
        });
        Ok(auction_id)
    }

    #[instrument(skip(self, caller), fields(caller = %fmt_address(&caller)))]
    fn start(
        &self,
        caller: Address,
        auction_id: AuctionId,
        duration: u64,
    ) -> Result<(), AuctionError> {
        let now = self.clock.now();
        let window = {
            let mut state = self.state.lock();
            let auction = state.auction_mut(auction_id)?;
            let before = auction.window;
            let window = auction.start(&caller, now, duration)?;
            debug_assert!(invariant_window_fixed(before, auction.window));
            window
        };

        info!(
            auction_id,
            start_time = window.start_time,
            end_time = window.end_time,
            "[qc-18] Auction started"
        );
        self.events.publish(AuctionEvent::AuctionStarted {
            id: auction_id,
            start_time: window.start_time,
        });
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller = %fmt_address(&caller)))]
    fn bid(&self, caller: Address, auction_id: AuctionId, amount: U256) -> Result<(), AuctionError> {
        let now = self.clock.now();
        self.state
            .lock()
            .auction(auction_id)?
            .validate_bid(&caller, amount, now)?;

        self.funds.collect(&caller, amount).map_err(|e| {
            debug!(error = %e, "[qc-18] Bid funds not collected");
            AuctionError::EscrowFailed(e)
        })?;

        // The lock was released during collection; check again.
        let now = self.clock.now();
        let recorded = {
            let mut state = self.state.lock();
            let outcome = state.auction_mut(auction_id).and_then(|auction| {
                auction.validate_bid(&caller, amount, now)?;
                Ok(auction.record_bid(caller, amount))
            });
            if outcome.is_ok() {
                state.held = state.held.saturating_add(amount);
                state.stats.bids_placed += 1;
                debug_assert!(state.is_consistent(auction_id));
                debug_assert!(state.is_solvent());
            }
            outcome
        };

        let escrow = match recorded {
            Ok(escrow) => escrow,
            Err(e) => {
                warn!(error = %e, "[qc-18] Bid invalidated during collection, refunding");
                self.refund_rejected_bid(auction_id, caller, amount);
                return Err(e);
            }
        };

        debug!(%escrow, "[qc-18] Bid accepted");
        self.events.publish(AuctionEvent::BidPlaced {
            id: auction_id,
            bidder: caller,
            amount,
        });
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller = %fmt_address(&caller)))]
    fn end(&self, caller: Address, auction_id: AuctionId) -> Result<(), AuctionError> {
        let now = self.clock.now();
        let fee = self.config.protocol_fee;

        let plan = {
            let mut state = self.state.lock();
            let plan = {
                let auction = state.auction_mut(auction_id)?;
                auction.validate_end(&caller, now)?;
                let end_time = auction.window.map_or(0, |w| w.end_time);
                let plan = match (auction.settlement, auction.highest_bidder) {
                    (_, None) => Settle::ReturnToSeller {
                        seller: auction.seller,
                        asset: auction.asset,
                        end_time,
                    },
                    (Settlement::Pending, Some(winner)) => {
                        let bid = auction.highest_bid;
                        let proceeds = bid
                            .checked_sub(fee)
                            .ok_or(AuctionError::FeeExceedsBid { bid, fee })?;
                        auction.highest_bid = U256::zero();
                        auction.sale_price = bid;
                        auction.settlement = Settlement::ProceedsPaid;
                        Settle::PayProceeds {
                            seller: auction.seller,
                            winner,
                            asset: auction.asset,
                            bid,
                            proceeds,
                            fee,
                            end_time,
                        }
                    }
                    (_, Some(winner)) => Settle::Deliver {
                        winner,
                        asset: auction.asset,
                        bid: auction.sale_price,
                        proceeds: auction.sale_price.saturating_sub(fee),
                        end_time,
                    },
                };
                auction.settling = true;
                plan
            };
            if let Settle::PayProceeds { proceeds, .. } = &plan {
                state.held = state.held.saturating_sub(*proceeds);
            }
            plan
        };

        match plan {
            Settle::ReturnToSeller {
                seller,
                asset,
                end_time,
            } => self.settle_unsold(auction_id, seller, asset, end_time),
            Settle::PayProceeds {
                seller,
                winner,
                asset,
                bid,
                proceeds,
                fee,
                end_time,
            } => self.pay_proceeds(
                auction_id, seller, winner, asset, bid, proceeds, fee, end_time,
            ),
            Settle::Deliver {
                winner,
                asset,
                bid,
                proceeds,
                end_time,
            } => {
                debug!("[qc-18] Retrying asset delivery");
                self.deliver(auction_id, winner, asset, bid, proceeds, end_time)
            }
        }
    }

    #[instrument(skip(self, caller), fields(caller = %fmt_address(&caller)))]
    fn withdraw(&self, caller: Address, auction_id: AuctionId) -> Result<U256, AuctionError> {
        let amount = {
            let mut state = self.state.lock();
            let amount = state.auction_mut(auction_id)?.take_escrow(&caller)?;
            state.held = state.held.saturating_sub(amount);
            amount
        };

        if let Err(e) = self.funds.send(&caller, amount) {
            warn!(%amount, error = %e, "[qc-18] Withdrawal payout failed, escrow restored");
            let mut state = self.state.lock();
            if let Ok(auction) = state.auction_mut(auction_id) {
                auction.restore_escrow(caller, amount);
            }
            state.held = state.held.saturating_add(amount);
            return Err(AuctionError::FundTransferFailed(e));
        }

        {
            let mut state = self.state.lock();
            state.stats.withdrawals += 1;
            debug_assert!(state.is_solvent());
        }
        info!(%amount, "[qc-18] Escrow withdrawn");
        self.events.publish(AuctionEvent::Withdrawn {
            id: auction_id,
            bidder: caller,
            amount,
        });
        Ok(amount)
    }

    #[instrument(skip(self, caller), fields(caller = %fmt_address(&caller)))]
    fn sweep_fees(&self, caller: Address) -> Result<U256, AuctionError> {
        if caller != self.config.admin {
            return Err(AuctionError::NotAdmin(caller));
        }

        let amount = {
            let mut state = self.state.lock();
            let amount = std::mem::take(&mut state.fee_pool);
            state.held = state.held.saturating_sub(amount);
            amount
        };

        if let Err(e) = self.funds.send(&caller, amount) {
            warn!(%amount, error = %e, "[qc-18] Fee sweep failed, pool restored");
            let mut state = self.state.lock();
            state.fee_pool = state.fee_pool.saturating_add(amount);
            state.held = state.held.saturating_add(amount);
            return Err(AuctionError::FundTransferFailed(e));
        }

        {
            let mut state = self.state.lock();
            state.stats.fees_swept = state.stats.fees_swept.saturating_add(amount);
        }
        info!(admin = %fmt_address(&caller), %amount, "[qc-18] Fees swept");
        self.events.publish(AuctionEvent::FeesSwept {
            admin: caller,
            amount,
        });
        Ok(amount)
    }

    fn fee_pool(&self, caller: Address) -> Result<U256, AuctionError> {
        if caller != self.config.admin {
            return Err(AuctionError::NotAdmin(caller));
        }
        Ok(self.state.lock().fee_pool)
    }

    fn auction(&self, auction_id: AuctionId) -> Result<AuctionSnapshot, AuctionError> {
        let now = self.clock.now();
        Ok(self.state.lock().auction(auction_id)?.snapshot(now))
    }

    fn escrow_of(&self, auction_id: AuctionId, bidder: Address) -> Result<U256, AuctionError> {
        Ok(self.state.lock().auction(auction_id)?.escrow_of(&bidder))
    }

    fn auction_count(&self) -> u64 {
        self.state.lock().auctions.len() as u64
    }

    fn stats(&self) -> LedgerStats {
        self.state.lock().stats.clone()
    }
}

impl<R, F, E, T> CustodyReceiver for AuctionLedger<R, F, E, T>
where
    R: AssetRegistry,
    F: FundTransferChannel,
    E: EventSink,
    T: TimeSource,
{
    fn on_custody_received(&self, operator: Address, from: Address, asset: AssetRef) -> [u8; 4] {
        debug!(
            operator = %fmt_address(&operator),
            from = %fmt_address(&from),
            asset_id = %asset.asset_id,
            "[qc-18] Custody received"
        );
        CUSTODY_ACCEPTED
    }
}
