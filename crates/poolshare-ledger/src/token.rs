//! In-memory value-transfer service.
//!
//! Stores balances and allowances in `HashMap`s with no persistence. Used by
//! the simulator and tests; can be told to fail the next pull or push.

use std::collections::HashMap;

use parking_lot::Mutex;

use poolshare_core::error::TransferError;
use poolshare_core::traits::TokenTransfer;
use poolshare_core::types::{Address, Amount};

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<Address, Amount>,
    /// Owner → amount the vault may pull.
    allowances: HashMap<Address, Amount>,
    vault_balance: Amount,
    fail_next_pull: Option<String>,
    fail_next_push: Option<String>,
}

/// Balance ledger whose vault account is the [`TokenTransfer`] target.
#[derive(Debug, Default)]
pub struct MemoryToken {
    state: Mutex<TokenState>,
}

impl MemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `to` out of thin air.
    pub fn mint(&self, to: &Address, amount: Amount) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(*to).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Set how much the vault may pull from `owner`.
    pub fn approve(&self, owner: &Address, amount: Amount) {
        self.state.lock().allowances.insert(*owner, amount);
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.lock().balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address) -> Amount {
        self.state.lock().allowances.get(owner).copied().unwrap_or(0)
    }

    /// Every non-vault holder and its balance.
    pub fn balances(&self) -> Vec<(Address, Amount)> {
        self.state.lock().balances.iter().map(|(a, b)| (*a, *b)).collect()
    }

    /// Balance held by the vault.
    pub fn vault_balance(&self) -> Amount {
        self.state.lock().vault_balance
    }

    /// Make the next `pull` fail with `reason`.
    pub fn fail_next_pull(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_pull = Some(reason.into());
    }

    /// Make the next `push` fail with `reason`.
    pub fn fail_next_push(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_push = Some(reason.into());
    }
}

impl TokenTransfer for MemoryToken {
    fn pull(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_pull.take() {
            return Err(TransferError::Rejected(reason));
        }
        let allowance = state.allowances.get(from).copied().unwrap_or(0);
        if allowance < amount {
            return Err(TransferError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }
        let balance = state.balances.get(from).copied().unwrap_or(0);
        if balance < amount {
            return Err(TransferError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let vault_balance = state
            .vault_balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("vault balance overflow".into()))?;

        state.balances.insert(*from, balance - amount);
        state.allowances.insert(*from, allowance - amount);
        state.vault_balance = vault_balance;
        Ok(())
    }

    fn push(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_push.take() {
            return Err(TransferError::Rejected(reason));
        }
        if state.vault_balance < amount {
            return Err(TransferError::InsufficientBalance {
                have: state.vault_balance,
                need: amount,
            });
        }
        state.vault_balance -= amount;
        let balance = state.balances.entry(*to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    #[test]
    fn pull_requires_allowance_and_balance() {
        let token = MemoryToken::new();
        token.mint(&alice(), 100);
        assert_eq!(
            token.pull(&alice(), 10),
            Err(TransferError::InsufficientAllowance { have: 0, need: 10 })
        );
        token.approve(&alice(), 1_000);
        assert_eq!(
            token.pull(&alice(), 101),
            Err(TransferError::InsufficientBalance { have: 100, need: 101 })
        );
        token.pull(&alice(), 60).unwrap();
        assert_eq!(token.balance_of(&alice()), 40);
        assert_eq!(token.allowance(&alice()), 940);
        assert_eq!(token.vault_balance(), 60);
    }

    #[test]
    fn push_moves_from_vault() {
        let token = MemoryToken::new();
        token.mint(&alice(), 50);
        token.approve(&alice(), 50);
        token.pull(&alice(), 50).unwrap();
        let bob = Address::repeat_byte(0xb0);
        token.push(&bob, 20).unwrap();
        assert_eq!(token.balance_of(&bob), 20);
        assert_eq!(token.vault_balance(), 30);
        assert!(token.push(&bob, 31).is_err());
        let mut holders = token.balances();
        holders.sort();
        assert_eq!(holders, vec![(alice(), 0), (bob, 20)]);
    }

    #[test]
    fn injected_failure_fires_once() {
        let token = MemoryToken::new();
        token.fail_next_push("blocked recipient");
        assert_eq!(
            token.push(&alice(), 0),
            Err(TransferError::Rejected("blocked recipient".into()))
        );
        assert!(token.push(&alice(), 0).is_ok());
    }

    #[test]
    fn failed_pull_leaves_balances() {
        let token = MemoryToken::new();
        token.mint(&alice(), 5);
        token.approve(&alice(), 5);
        token.fail_next_pull("frozen");
        assert!(token.pull(&alice(), 5).is_err());
        assert_eq!(token.balance_of(&alice()), 5);
        assert_eq!(token.vault_balance(), 0);
    }
}
