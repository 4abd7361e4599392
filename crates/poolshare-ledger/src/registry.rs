//! Weighted participant registry.
//!
//! Holds each participant's weight and the running total. The total is
//! adjusted incrementally on every write, so `total_weight` always equals
//! the sum of all weights without ever iterating the map.

use std::collections::{HashMap, HashSet};

use poolshare_core::error::{StateError, ValidationError, VaultError};
use poolshare_core::types::{Address, Weight};

/// One applied weight overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightChange {
    pub account: Address,
    pub old: Weight,
    pub new: Weight,
    /// Total weight after this change.
    pub total: u128,
    /// The account had never been assigned a weight before.
    pub created: bool,
}

/// Participant weights and their running total.
#[derive(Debug, Clone, Default)]
pub struct WeightRegistry {
    weights: HashMap<Address, Weight>,
    total_weight: u128,
}

impl WeightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial registry.
    ///
    /// Unlike [`set_weights`](Self::set_weights), a repeated account in the
    /// initial batch is rejected outright.
    pub fn from_batch(accounts: &[Address], weights: &[Weight]) -> Result<Self, VaultError> {
        check_lengths(accounts, weights)?;
        let mut seen = HashSet::with_capacity(accounts.len());
        for account in accounts {
            if !seen.insert(*account) {
                return Err(ValidationError::DuplicateAccount(*account).into());
            }
        }
        let mut registry = Self::new();
        registry.set_weights(accounts, weights)?;
        Ok(registry)
    }

    /// Rebuild a registry from stored weights, recomputing the total.
    pub fn from_weights(weights: HashMap<Address, Weight>) -> Self {
        let total_weight = weights.values().map(|w| *w as u128).sum();
        Self {
            weights,
            total_weight,
        }
    }

    /// Current weight of `account`; zero for unknown accounts.
    pub fn weight_of(&self, account: &Address) -> Weight {
        self.weights.get(account).copied().unwrap_or(0)
    }

    pub fn total_weight(&self) -> u128 {
        self.total_weight
    }

    /// Whether `account` has ever been assigned a weight (including zero).
    pub fn contains(&self, account: &Address) -> bool {
        self.weights.contains_key(account)
    }

    /// Number of registered participants, including soft-removed ones.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Weight)> {
        self.weights.iter()
    }

    /// Overwrite weights pairwise, in order.
    ///
    /// Each pair reads the then-current weight, so an account repeated in
    /// one batch ends at its last value and the total stays consistent.
    /// The batch is all-or-nothing.
    pub fn set_weights(
        &mut self,
        accounts: &[Address],
        weights: &[Weight],
    ) -> Result<Vec<WeightChange>, VaultError> {
        check_lengths(accounts, weights)?;
        if accounts.iter().any(Address::is_zero) {
            return Err(ValidationError::ZeroAddress.into());
        }

        let mut applied: Vec<WeightChange> = Vec::with_capacity(accounts.len());
        for (account, weight) in accounts.iter().zip(weights) {
            match self.set_weight(*account, *weight) {
                Ok(change) => applied.push(change),
                Err(e) => {
                    for change in applied.iter().rev() {
                        self.undo(change);
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(applied)
    }

    fn set_weight(&mut self, account: Address, new: Weight) -> Result<WeightChange, StateError> {
        let created = !self.weights.contains_key(&account);
        let old = self.weight_of(&account);
        let total = self
            .total_weight
            .checked_sub(old as u128)
            .and_then(|t| t.checked_add(new as u128))
            .ok_or(StateError::ArithmeticOverflow)?;
        self.weights.insert(account, new);
        self.total_weight = total;
        Ok(WeightChange {
            account,
            old,
            new,
            total,
            created,
        })
    }

    fn undo(&mut self, change: &WeightChange) {
        self.total_weight = self.total_weight - change.new as u128 + change.old as u128;
        if change.created {
            self.weights.remove(&change.account);
        } else {
            self.weights.insert(change.account, change.old);
        }
    }
}

fn check_lengths(accounts: &[Address], weights: &[Weight]) -> Result<(), ValidationError> {
    if accounts.len() != weights.len() {
        return Err(ValidationError::LengthMismatch {
            accounts: accounts.len(),
            weights: weights.len(),
        });
    }
    Ok(())
}
