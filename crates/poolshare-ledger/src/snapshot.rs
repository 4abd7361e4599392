//! Durable vault state.
//!
//! A [`VaultSnapshot`] holds exactly the state needed to resume a vault:
//! weights, total weight, accumulator, checkpoints, nonces, pause flag, the
//! two role identities and any pending upgrade approval. Maps are ordered so
//! the binary encoding is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use poolshare_core::error::{StateError, ValidationError, VaultError};
use poolshare_core::types::{Address, Weight};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("{0} trailing bytes after snapshot")] TrailingBytes(usize),
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
pub struct VaultSnapshot {
    pub weights: BTreeMap<Address, Weight>,
    pub total_weight: u128,
    pub acc_per_weight: u128,
    pub checkpoints: BTreeMap<Address, u128>,
    pub nonces: BTreeMap<Address, u64>,
    pub paused: bool,
    pub guardian: Address,
    pub governor: Address,
    #[serde(default)]
    pub authorized_upgrade: Option<Address>,
}

impl VaultSnapshot {
    /// Encode with bincode's standard configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(SnapshotError::TrailingBytes(bytes.len() - read));
        }
        Ok(snapshot)
    }

    /// Check the ledger invariants a live vault maintains.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.guardian.is_zero() || self.governor.is_zero() {
            return Err(ValidationError::ZeroAddress.into());
        }

        let computed: u128 = self.weights.values().map(|w| *w as u128).sum();
        if computed != self.total_weight {
            return Err(StateError::TotalWeightMismatch {
                recorded: self.total_weight,
                computed,
            }
            .into());
        }

        if let Some((account, _)) = self
            .checkpoints
            .iter()
            .find(|(_, cp)| **cp > self.acc_per_weight)
        {
            return Err(StateError::CheckpointAhead { account: *account }.into());
        }
        Ok(())
    }
}
