//! Error types for the PoolShare ledger.
//!
//! Every error aborts the triggering operation as a whole; callers never
//! observe a partially applied mutation.
use thiserror::Error;

use crate::types::{Address, Capability};

/// Malformed operation inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("length mismatch: {accounts} accounts, {weights} weights")] LengthMismatch { accounts: usize, weights: usize },
    #[error("duplicate account in batch: {0}")] DuplicateAccount(Address),
    #[error("zero address not allowed")] ZeroAddress,
    #[error("invalid hex: {0}")] InvalidHex(String),
}

/// Reasons a delegated-claim signature is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature bytes")] Malformed,
    #[error("invalid recovery byte: {0}")] InvalidRecoveryByte(u8),
    #[error("non-canonical signature (high s)")] NonCanonical,
    #[error("public key recovery failed")] RecoveryFailed,
    #[error("signer {recovered} is not beneficiary {expected}")] SignerMismatch { expected: Address, recovered: Address },
}

/// Operations that are well-formed but not valid in the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("total weight is zero")] ZeroTotalWeight,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("already paused")] AlreadyPaused,
    #[error("not paused")] NotPaused,
    #[error("checkpoint of {account} is ahead of the accumulator")] CheckpointAhead { account: Address },
    #[error("total weight {recorded} does not match weight sum {computed}")] TotalWeightMismatch { recorded: u128, computed: u128 },
}

/// Failures reported by the external value-transfer service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u128, need: u128 },
    #[error("transfer rejected: {0}")] Rejected(String),
}

/// Top-level error for every vault operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error("{actor} lacks the {capability} capability")] Unauthorized { actor: Address, capability: Capability },
    #[error("vault is paused")] Paused,
    #[error("request expired: deadline {deadline}, now {now}")] ExpiredRequest { deadline: u64, now: u64 },
    #[error("bad signature: {0}")] BadSignature(#[from] SignatureError),
    #[error("invalid state: {0}")] InvalidState(#[from] StateError),
    #[error("transfer failed: {0}")] Transfer(#[from] TransferError),
    #[error("re-entrant call rejected")] Reentrancy,
}
