//! Notifications emitted after a vault operation commits.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Role, Weight};

/// A committed state change, handed to the [`EventSink`](crate::traits::EventSink).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEvent {
    /// The vault was created with its initial roles and registry.
    Initialized {
        guardian: Address,
        governor: Address,
        participants: usize,
        total_weight: u128,
    },
    /// Value was pulled in and the accumulator advanced by `delta`.
    Deposited {
        depositor: Address,
        amount: Amount,
        delta: u128,
        acc_per_weight: u128,
    },
    /// A participant was settled and `amount` pushed to `recipient`.
    ///
    /// `relayer` and `nonce` are set for delegated claims only.
    Claimed {
        beneficiary: Address,
        recipient: Address,
        amount: Amount,
        relayer: Option<Address>,
        nonce: Option<u64>,
    },
    /// A participant's weight was overwritten.
    WeightChanged {
        account: Address,
        old: Weight,
        new: Weight,
        total: u128,
    },
    Paused { by: Address },
    Unpaused { by: Address },
    /// A role identity was replaced.
    RoleRotated {
        role: Role,
        previous: Address,
        current: Address,
    },
    /// The governor approved a new implementation identity.
    UpgradeAuthorized { by: Address, implementation: Address },
}

impl VaultEvent {
    /// Short, stable name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::Deposited { .. } => "deposited",
            Self::Claimed { .. } => "claimed",
            Self::WeightChanged { .. } => "weight_changed",
            Self::Paused { .. } => "paused",
            Self::Unpaused { .. } => "unpaused",
            Self::RoleRotated { .. } => "role_rotated",
            Self::UpgradeAuthorized { .. } => "upgrade_authorized",
        }
    }
}
