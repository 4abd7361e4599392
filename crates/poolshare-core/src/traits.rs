//! Trait interfaces for the vault's external collaborators.
//!
//! - [`TokenTransfer`]: the value-transfer service (pull on deposit, push on claim)
//! - [`EventSink`]: fire-and-forget notification sink
//! - [`Clock`]: wall-clock source for delegated-claim deadlines
//!
//! These are the only points where control leaves the ledger.

use crate::error::TransferError;
use crate::event::VaultEvent;
use crate::types::{Address, Amount};

/// Moves the distributed asset between accounts and the vault.
///
/// Both calls are all-or-nothing: on `Err` no value has moved.
pub trait TokenTransfer: Send + Sync {
    /// Pull `amount` from `from` into the vault.
    fn pull(&self, from: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Push `amount` from the vault to `to`.
    fn push(&self, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// Receives committed vault events. Has no way to affect ledger logic.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &VaultEvent);
}

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

impl<T: TokenTransfer + ?Sized> TokenTransfer for std::sync::Arc<T> {
    fn pull(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        (**self).pull(from, amount)
    }

    fn push(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        (**self).push(to, amount)
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &VaultEvent) {
        (**self).emit(event)
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
