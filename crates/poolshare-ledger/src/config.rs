//! Vault configuration.
//!
//! Provides [`VaultConfig`] with defaults for the signing domain and pause
//! policy. Every field may be omitted from a JSON config.

use serde::{Deserialize, Serialize};

use poolshare_core::eip712::Eip712Domain;
use poolshare_core::types::{Address, Weight};

use crate::access::PausePolicy;

/// Per-instance configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// EIP-712 domain delegated-claim signatures are bound to.
    pub domain: Eip712Domain,
    /// Whether pause also blocks governance operations.
    pub pause_policy: PausePolicy,
}

impl VaultConfig {
    /// Parse a JSON config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The identity signatures are bound to.
    pub fn verifying_contract(&self) -> Address {
        self.domain.verifying_contract
    }
}

/// Initial roles and registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInit {
    pub guardian: Address,
    pub governor: Address,
    #[serde(default)]
    pub accounts: Vec<Address>,
    #[serde(default)]
    pub weights: Vec<Weight>,
}

impl VaultInit {
    pub fn new(guardian: Address, governor: Address) -> Self {
        Self {
            guardian,
            governor,
            accounts: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Append an initial participant.
    pub fn with_participant(mut self, account: Address, weight: Weight) -> Self {
        self.accounts.push(account);
        self.weights.push(weight);
        self
    }
}
