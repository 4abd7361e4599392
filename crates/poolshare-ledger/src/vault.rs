//! The composed vault: registry, accrual, checkpoints, authorization and
//! access control behind a single-writer lock.
//!
//! Every mutating operation runs under one lock and an entry flag. The lock
//! serializes threads; the flag rejects re-entry from the same thread, which
//! can only happen through a collaborator callback (token transfer, event
//! sink). The flag is cleared on every exit path by a drop guard.
//!
//! Deposits pull value before the accumulator moves. Claims sync the
//! checkpoint (and consume the nonce, if delegated) before pushing value and
//! restore both if the push fails.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

use poolshare_core::eip712::Eip712Domain;
use poolshare_core::error::VaultError;
use poolshare_core::event::VaultEvent;
use poolshare_core::traits::{Clock, EventSink, TokenTransfer};
use poolshare_core::types::{Address, Amount, Capability, ClaimRequest, Hash256, Role, Weight};

use crate::access::{AccessController, PauseState, Roles};
use crate::accrual::{AccrualLedger, CheckpointStore, Settlement};
use crate::authorizer::ClaimAuthorizer;
use crate::clock::SystemClock;
use crate::config::{VaultConfig, VaultInit};
use crate::events::TracingSink;
use crate::registry::WeightRegistry;
use crate::snapshot::VaultSnapshot;

#[derive(Debug)]
struct VaultState {
    registry: WeightRegistry,
    ledger: AccrualLedger,
    checkpoints: CheckpointStore,
    authorizer: ClaimAuthorizer,
    access: AccessController,
}

impl VaultState {
    fn settle(&mut self, account: &Address) -> Result<Settlement, VaultError> {
        let acc = self.ledger.acc_per_weight();
        // Unregistered accounts are owed nothing and get no checkpoint;
        // `set_weights` opens one when they join.
        if !self.registry.contains(account) {
            return Ok(Settlement {
                account: *account,
                owed: 0,
                previous: None,
                synced_to: acc,
            });
        }
        let weight = self.registry.weight_of(account);
        Ok(self.checkpoints.settle(account, weight, acc)?)
    }

    fn snapshot(&self) -> VaultSnapshot {
        let roles = self.access.roles();
        VaultSnapshot {
            weights: self.registry.iter().map(|(a, w)| (*a, *w)).collect(),
            total_weight: self.registry.total_weight(),
            acc_per_weight: self.ledger.acc_per_weight(),
            checkpoints: self.checkpoints.iter().map(|(a, c)| (*a, *c)).collect(),
            nonces: self.authorizer.iter_nonces().map(|(a, n)| (*a, *n)).collect(),
            paused: self.access.is_paused(),
            guardian: roles.guardian,
            governor: roles.governor,
            authorized_upgrade: self.access.authorized_upgrade(),
        }
    }
}

struct VaultCell {
    entered: Cell<bool>,
    state: RefCell<VaultState>,
}

struct EntryGuard<'a>(&'a Cell<bool>);

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Who relayed a delegated claim and which nonce it consumed.
#[derive(Debug, Clone, Copy)]
struct Delegation {
    relayer: Address,
    nonce: u64,
}

/// A pooled-payout vault over a token, event sink and clock.
pub struct Vault<T, E = TracingSink, C = SystemClock> {
    inner: ReentrantMutex<VaultCell>,
    token: T,
    events: E,
    clock: C,
}

impl<T: TokenTransfer> Vault<T> {
    /// Initialize with the tracing event sink and the system clock.
    pub fn new(config: VaultConfig, init: VaultInit, token: T) -> Result<Self, VaultError> {
        Self::initialize(config, init, token, TracingSink, SystemClock)
    }
}

impl<T, E, C> Vault<T, E, C>
where
    T: TokenTransfer,
    E: EventSink,
    C: Clock,
{
    /// Create a vault with its roles and initial participants.
    ///
    /// Fails on a length mismatch, a repeated account, or a zero role or
    /// participant address.
    pub fn initialize(
        config: VaultConfig,
        init: VaultInit,
        token: T,
        events: E,
        clock: C,
    ) -> Result<Self, VaultError> {
        let roles = Roles::new(init.guardian, init.governor)?;
        let registry = WeightRegistry::from_batch(&init.accounts, &init.weights)?;
        let state = VaultState {
            registry,
            ledger: AccrualLedger::new(),
            checkpoints: CheckpointStore::new(),
            authorizer: ClaimAuthorizer::new(config.domain),
            access: AccessController::new(roles, config.pause_policy),
        };
        let participants = state.registry.len();
        let total_weight = state.registry.total_weight();
        let vault = Self::from_state(state, token, events, clock);

        info!(
            guardian = %roles.guardian,
            governor = %roles.governor,
            participants,
            total_weight,
            "vault initialized"
        );
        vault.events.emit(&VaultEvent::Initialized {
            guardian: roles.guardian,
            governor: roles.governor,
            participants,
            total_weight,
        });
        Ok(vault)
    }

    /// Resume from a snapshot after re-checking its invariants.
    pub fn restore(
        config: VaultConfig,
        snapshot: VaultSnapshot,
        token: T,
        events: E,
        clock: C,
    ) -> Result<Self, VaultError> {
        snapshot.validate()?;
        let roles = Roles::new(snapshot.guardian, snapshot.governor)?;
        let state = VaultState {
            registry: WeightRegistry::from_weights(snapshot.weights.into_iter().collect()),
            ledger: AccrualLedger::from_value(snapshot.acc_per_weight),
            checkpoints: CheckpointStore::from_checkpoints(snapshot.checkpoints.into_iter().collect()),
            authorizer: ClaimAuthorizer::with_nonces(config.domain, snapshot.nonces.into_iter().collect()),
            access: AccessController::restore(
                roles,
                config.pause_policy,
                snapshot.paused,
                snapshot.authorized_upgrade,
            ),
        };
        info!(participants = state.registry.len(), "vault restored");
        Ok(Self::from_state(state, token, events, clock))
    }

    fn from_state(state: VaultState, token: T, events: E, clock: C) -> Self {
        Self {
            inner: ReentrantMutex::new(VaultCell {
                entered: Cell::new(false),
                state: RefCell::new(state),
            }),
            token,
            events,
            clock,
        }
    }

    /// Run a mutating operation under the lock and entry flag.
    fn enter<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&VaultCell) -> Result<R, VaultError>,
    ) -> Result<R, VaultError> {
        let cell = self.inner.lock();
        if cell.entered.replace(true) {
            warn!(op, "re-entrant call rejected");
            return Err(VaultError::Reentrancy);
        }
        let _guard = EntryGuard(&cell.entered);
        f(&cell)
    }

    fn read<R>(&self, f: impl FnOnce(&VaultState) -> R) -> R {
        let cell = self.inner.lock();
        let state = cell.state.borrow();
        f(&state)
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    /// Pull `amount` from `depositor` and advance the accumulator.
    ///
    /// Returns the scaled accumulator delta.
    pub fn deposit(&self, depositor: &Address, amount: Amount) -> Result<u128, VaultError> {
        self.enter("deposit", |cell| {
            let (delta, next) = {
                let state = cell.state.borrow();
                state.access.require_active()?;
                state.ledger.preview(amount, state.registry.total_weight())?
            };

            if amount > 0 {
                self.token.pull(depositor, amount).inspect_err(|e| {
                    warn!(%depositor, amount, error = %e, "deposit pull failed");
                })?;
            }
            cell.state.borrow_mut().ledger.commit(next);

            info!(%depositor, amount, delta, acc_per_weight = next, "deposit");
            self.events.emit(&VaultEvent::Deposited {
                depositor: *depositor,
                amount,
                delta,
                acc_per_weight: next,
            });
            Ok(delta)
        })
    }

    /// Settle `caller` and push what they are owed to `recipient`.
    pub fn claim(&self, caller: &Address, recipient: &Address) -> Result<Amount, VaultError> {
        self.enter("claim", |cell| {
            let settlement = {
                let mut state = cell.state.borrow_mut();
                state.access.require_active()?;
                let beneficiary = state.authorizer.authorize_direct(caller);
                state.settle(&beneficiary)?
            };
            self.pay_out(cell, settlement, *recipient, None)
        })
    }

    /// Settle `request.beneficiary` on a relayer's behalf and push to
    /// `request.recipient`.
    pub fn claim_with_signature(
        &self,
        relayer: &Address,
        request: &ClaimRequest,
    ) -> Result<Amount, VaultError> {
        self.enter("claim_with_signature", |cell| {
            let now = self.clock.now();
            let (settlement, nonce) = {
                let mut state = cell.state.borrow_mut();
                state.access.require_active()?;
                let nonce = state.authorizer.authorize_delegated(request, now)?;
                match state.settle(&request.beneficiary) {
                    Ok(settlement) => (settlement, nonce),
                    Err(e) => {
                        state.authorizer.release(&request.beneficiary, nonce);
                        return Err(e);
                    }
                }
            };
            let delegation = Delegation {
                relayer: *relayer,
                nonce,
            };
            self.pay_out(cell, settlement, request.recipient, Some(delegation))
        })
    }

    fn pay_out(
        &self,
        cell: &VaultCell,
        settlement: Settlement,
        recipient: Address,
        delegation: Option<Delegation>,
    ) -> Result<Amount, VaultError> {
        let beneficiary = settlement.account;
        if settlement.owed > 0 {
            if let Err(e) = self.token.push(&recipient, settlement.owed) {
                let mut state = cell.state.borrow_mut();
                state.checkpoints.revert(&settlement);
                if let Some(d) = delegation {
                    state.authorizer.release(&beneficiary, d.nonce);
                }
                warn!(%beneficiary, %recipient, owed = settlement.owed, error = %e, "claim rolled back");
                return Err(e.into());
            }
        }

        info!(%beneficiary, %recipient, amount = settlement.owed, delegated = delegation.is_some(), "claim");
        self.events.emit(&VaultEvent::Claimed {
            beneficiary,
            recipient,
            amount: settlement.owed,
            relayer: delegation.map(|d| d.relayer),
            nonce: delegation.map(|d| d.nonce),
        });
        Ok(settlement.owed)
    }

    // ------------------------------------------------------------------
    // Administrative operations
    // ------------------------------------------------------------------

    /// Overwrite participant weights. Governor only.
    ///
    /// Does not settle anyone: unclaimed accrual is paid at the next claim
    /// using the new weight. Accounts seen for the first time start at the
    /// current accumulator.
    pub fn set_weights(
        &self,
        caller: &Address,
        accounts: &[Address],
        weights: &[Weight],
    ) -> Result<(), VaultError> {
        self.enter("set_weights", |cell| {
            let (changes, total_weight) = {
                let mut state = cell.state.borrow_mut();
                state.access.require_admin(caller, Capability::Configure)?;
                let changes = state.registry.set_weights(accounts, weights)?;
                let acc = state.ledger.acc_per_weight();
                for change in changes.iter().filter(|c| c.created) {
                    state.checkpoints.open(&change.account, acc);
                }
                (changes, state.registry.total_weight())
            };

            for change in &changes {
                debug!(account = %change.account, old = change.old, new = change.new, "weight changed");
                self.events.emit(&VaultEvent::WeightChanged {
                    account: change.account,
                    old: change.old,
                    new: change.new,
                    total: change.total,
                });
            }
            info!(%caller, updated = changes.len(), total_weight, "weights updated");
            Ok(())
        })
    }

    /// Stop deposits and claims. Guardian only.
    pub fn pause(&self, caller: &Address) -> Result<(), VaultError> {
        self.enter("pause", |cell| {
            cell.state.borrow_mut().access.pause(caller)?;
            info!(%caller, "vault paused");
            self.events.emit(&VaultEvent::Paused { by: *caller });
            Ok(())
        })
    }

    /// Resume deposits and claims. Guardian only.
    pub fn unpause(&self, caller: &Address) -> Result<(), VaultError> {
        self.enter("unpause", |cell| {
            cell.state.borrow_mut().access.unpause(caller)?;
            info!(%caller, "vault unpaused");
            self.events.emit(&VaultEvent::Unpaused { by: *caller });
            Ok(())
        })
    }

    /// Replace the guardian. Governor only.
    pub fn rotate_guardian(&self, caller: &Address, new_guardian: Address) -> Result<Address, VaultError> {
        self.rotate(caller, Role::Guardian, new_guardian)
    }

    /// Replace the governor. Governor only.
    pub fn rotate_governor(&self, caller: &Address, new_governor: Address) -> Result<Address, VaultError> {
        self.rotate(caller, Role::Governor, new_governor)
    }

    fn rotate(&self, caller: &Address, role: Role, current: Address) -> Result<Address, VaultError> {
        self.enter("rotate_role", |cell| {
            let previous = cell.state.borrow_mut().access.rotate(caller, role, current)?;
            info!(%role, %previous, %current, "role rotated");
            self.events.emit(&VaultEvent::RoleRotated {
                role,
                previous,
                current,
            });
            Ok(previous)
        })
    }

    /// Approve `implementation` as the next upgrade target. Governor only.
    pub fn authorize_upgrade(&self, caller: &Address, implementation: Address) -> Result<(), VaultError> {
        self.enter("authorize_upgrade", |cell| {
            cell.state
                .borrow_mut()
                .access
                .authorize_upgrade(caller, implementation)?;
            info!(%caller, %implementation, "upgrade authorized");
            self.events.emit(&VaultEvent::UpgradeAuthorized {
                by: *caller,
                implementation,
            });
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn weight_of(&self, account: &Address) -> Weight {
        self.read(|s| s.registry.weight_of(account))
    }

    pub fn total_weight(&self) -> u128 {
        self.read(|s| s.registry.total_weight())
    }

    pub fn participant_count(&self) -> usize {
        self.read(|s| s.registry.len())
    }

    pub fn acc_per_weight(&self) -> u128 {
        self.read(|s| s.ledger.acc_per_weight())
    }

    pub fn checkpoint_of(&self, account: &Address) -> u128 {
        self.read(|s| s.checkpoints.checkpoint_of(account))
    }

    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.read(|s| s.authorizer.nonce_of(account))
    }

    /// What `account` would receive if it claimed now.
    pub fn pending(&self, account: &Address) -> Result<Amount, VaultError> {
        self.read(|s| -> Result<Amount, VaultError> {
            let weight = s.registry.weight_of(account);
            Ok(s.checkpoints.pending(account, weight, s.ledger.acc_per_weight())?)
        })
    }

    pub fn pause_state(&self) -> PauseState {
        self.read(|s| s.access.state())
    }

    pub fn is_paused(&self) -> bool {
        self.read(|s| s.access.is_paused())
    }

    pub fn guardian(&self) -> Address {
        self.read(|s| s.access.roles().guardian)
    }

    pub fn governor(&self) -> Address {
        self.read(|s| s.access.roles().governor)
    }

    pub fn authorized_upgrade(&self) -> Option<Address> {
        self.read(|s| s.access.authorized_upgrade())
    }

    pub fn domain(&self) -> Eip712Domain {
        self.read(|s| s.authorizer.domain().clone())
    }

    pub fn domain_separator(&self) -> Hash256 {
        self.read(|s| s.authorizer.separator())
    }

    /// Digest a beneficiary must sign for a relayed claim.
    pub fn claim_digest(
        &self,
        beneficiary: Address,
        recipient: Address,
        nonce: u64,
        deadline: u64,
    ) -> Hash256 {
        self.read(|s| s.authorizer.digest(beneficiary, recipient, nonce, deadline))
    }

    /// All participant weights, ordered by address.
    pub fn weights(&self) -> BTreeMap<Address, Weight> {
        self.read(|s| s.registry.iter().map(|(a, w)| (*a, *w)).collect())
    }

    /// Copy of the durable state.
    pub fn snapshot(&self) -> VaultSnapshot {
        self.read(VaultState::snapshot)
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
