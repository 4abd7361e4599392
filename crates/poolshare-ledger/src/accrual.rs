//! Accumulator-based accrual and per-participant checkpoints.
//!
//! A deposit of `amount` against total weight `W` advances the global
//! accumulator by `amount * SCALE / W`. A participant with weight `w` and
//! checkpoint `c` is owed `w * (acc - c) / SCALE`. Both are O(1): nothing
//! ever iterates the participant set.
//!
//! Both divisions truncate. The remainder is dust and stays in the vault.

use std::collections::HashMap;

use poolshare_core::constants::SCALE;
use poolshare_core::error::StateError;
use poolshare_core::types::{Address, Amount, Weight};

/// Accumulator advance for a deposit of `amount` against `total_weight`.
pub fn scaled_delta(amount: Amount, total_weight: u128) -> Result<u128, StateError> {
    if total_weight == 0 {
        return Err(StateError::ZeroTotalWeight);
    }
    amount
        .checked_mul(SCALE)
        .map(|scaled| scaled / total_weight)
        .ok_or(StateError::ArithmeticOverflow)
}

/// Scaled remainder a deposit loses to truncation, in `1 / SCALE` token units.
///
/// Always below `total_weight`; zero exactly when `amount * SCALE` divides evenly.
pub fn deposit_dust(amount: Amount, total_weight: u128) -> Result<u128, StateError> {
    if total_weight == 0 {
        return Err(StateError::ZeroTotalWeight);
    }
    amount
        .checked_mul(SCALE)
        .map(|scaled| scaled % total_weight)
        .ok_or(StateError::ArithmeticOverflow)
}

/// Amount owed to a participant of `weight` whose checkpoint is `checkpoint`.
pub fn owed(weight: Weight, acc_per_weight: u128, checkpoint: u128) -> Result<Amount, StateError> {
    let unsynced = acc_per_weight
        .checked_sub(checkpoint)
        .ok_or(StateError::ArithmeticOverflow)?;
    (weight as u128)
        .checked_mul(unsynced)
        .map(|v| v / SCALE)
        .ok_or(StateError::ArithmeticOverflow)
}

/// The global per-weight accumulator. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccrualLedger {
    acc_per_weight: u128,
}

impl AccrualLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a stored accumulator value.
    pub fn from_value(acc_per_weight: u128) -> Self {
        Self { acc_per_weight }
    }

    pub fn acc_per_weight(&self) -> u128 {
        self.acc_per_weight
    }

    /// Compute the advance a deposit would cause, without applying it.
    ///
    /// Returns `(delta, new_acc_per_weight)`.
    pub fn preview(&self, amount: Amount, total_weight: u128) -> Result<(u128, u128), StateError> {
        let delta = scaled_delta(amount, total_weight)?;
        let next = self
            .acc_per_weight
            .checked_add(delta)
            .ok_or(StateError::ArithmeticOverflow)?;
        Ok((delta, next))
    }

    /// Commit a value produced by [`preview`](Self::preview).
    pub(crate) fn commit(&mut self, next: u128) {
        debug_assert!(next >= self.acc_per_weight);
        self.acc_per_weight = next;
    }

    /// Advance by a deposit in one step.
    pub fn advance(&mut self, amount: Amount, total_weight: u128) -> Result<u128, StateError> {
        let (delta, next) = self.preview(amount, total_weight)?;
        self.commit(next);
        Ok(delta)
    }
}

/// The result of settling one participant, kept so it can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub account: Address,
    pub owed: Amount,
    /// Checkpoint before settlement; `None` if the account had none.
    pub previous: Option<u128>,
    /// Checkpoint after settlement (the accumulator value at the time).
    pub synced_to: u128,
}

/// Per-participant snapshot of the accumulator as of their last settlement.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    checkpoints: HashMap<Address, u128>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_checkpoints(checkpoints: HashMap<Address, u128>) -> Self {
        Self { checkpoints }
    }

    /// Checkpoint of `account`; zero if never set.
    pub fn checkpoint_of(&self, account: &Address) -> u128 {
        self.checkpoints.get(account).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.checkpoints.iter()
    }

    /// What `account` would receive if settled now.
    pub fn pending(&self, account: &Address, weight: Weight, acc_per_weight: u128) -> Result<Amount, StateError> {
        let checkpoint = self.checkpoint_of(account);
        if checkpoint > acc_per_weight {
            return Err(StateError::CheckpointAhead { account: *account });
        }
        owed(weight, acc_per_weight, checkpoint)
    }

    /// Compute what `account` is owed and sync its checkpoint to `acc_per_weight`.
    pub fn settle(&mut self, account: &Address, weight: Weight, acc_per_weight: u128) -> Result<Settlement, StateError> {
        let owed = self.pending(account, weight, acc_per_weight)?;
        let previous = self.checkpoints.insert(*account, acc_per_weight);
        Ok(Settlement {
            account: *account,
            owed,
            previous,
            synced_to: acc_per_weight,
        })
    }

    /// Start a new participant's checkpoint at the current accumulator, so
    /// accrual from before they joined is not owed to them.
    pub fn open(&mut self, account: &Address, acc_per_weight: u128) -> Option<u128> {
        self.checkpoints.insert(*account, acc_per_weight)
    }

    /// Restore the checkpoint recorded before `settlement`.
    pub fn revert(&mut self, settlement: &Settlement) {
        self.restore(&settlement.account, settlement.previous);
    }

    pub(crate) fn restore(&mut self, account: &Address, previous: Option<u128>) {
        match previous {
            Some(value) => {
                self.checkpoints.insert(*account, value);
            }
            None => {
                self.checkpoints.remove(account);
            }
        }
    }
}
