//! Two-role access control and the pause state machine.
//!
//! The guardian holds [`Capability::Pause`]; the governor holds
//! [`Capability::Configure`] and [`Capability::Upgrade`]. User-facing
//! operations require [`PauseState::Active`]. Whether administrative
//! operations are also blocked while paused is a [`PausePolicy`] choice.

use serde::{Deserialize, Serialize};

use poolshare_core::error::{StateError, ValidationError, VaultError};
use poolshare_core::types::{Address, Capability, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PauseState {
    #[default]
    Active,
    Paused,
}

/// Whether pause also blocks governance operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PausePolicy {
    /// When set, `set_weights`, role rotation and upgrade authorization fail
    /// with [`VaultError::Paused`] while paused.
    #[serde(default)]
    pub gate_admin: bool,
}

/// The two role identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub guardian: Address,
    pub governor: Address,
}

impl Roles {
    pub fn new(guardian: Address, governor: Address) -> Result<Self, ValidationError> {
        if guardian.is_zero() || governor.is_zero() {
            return Err(ValidationError::ZeroAddress);
        }
        Ok(Self { guardian, governor })
    }

    pub fn holder(&self, role: Role) -> Address {
        match role {
            Role::Guardian => self.guardian,
            Role::Governor => self.governor,
        }
    }

    /// Whether `actor` holds `capability`.
    pub fn authorize(&self, actor: &Address, capability: Capability) -> bool {
        self.holder(capability.role()) == *actor
    }
}

/// Roles, pause state and policy for one vault.
#[derive(Debug, Clone)]
pub struct AccessController {
    roles: Roles,
    state: PauseState,
    policy: PausePolicy,
    authorized_upgrade: Option<Address>,
}

impl AccessController {
    pub fn new(roles: Roles, policy: PausePolicy) -> Self {
        Self {
            roles,
            state: PauseState::Active,
            policy,
            authorized_upgrade: None,
        }
    }

    /// Resume with a stored pause flag and upgrade approval.
    pub fn restore(roles: Roles, policy: PausePolicy, paused: bool, authorized_upgrade: Option<Address>) -> Self {
        Self {
            roles,
            state: if paused { PauseState::Paused } else { PauseState::Active },
            policy,
            authorized_upgrade,
        }
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PauseState::Paused
    }

    pub fn policy(&self) -> PausePolicy {
        self.policy
    }

    pub fn authorized_upgrade(&self) -> Option<Address> {
        self.authorized_upgrade
    }

    pub fn require(&self, actor: &Address, capability: Capability) -> Result<(), VaultError> {
        if self.roles.authorize(actor, capability) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized {
                actor: *actor,
                capability,
            })
        }
    }

    /// Gate for deposit and claim operations.
    pub fn require_active(&self) -> Result<(), VaultError> {
        match self.state {
            PauseState::Active => Ok(()),
            PauseState::Paused => Err(VaultError::Paused),
        }
    }

    /// Role check plus the policy gate for governance operations.
    pub fn require_admin(&self, actor: &Address, capability: Capability) -> Result<(), VaultError> {
        self.require(actor, capability)?;
        if self.policy.gate_admin {
            self.require_active()?;
        }
        Ok(())
    }

    pub fn pause(&mut self, actor: &Address) -> Result<(), VaultError> {
        self.require(actor, Capability::Pause)?;
        if self.state == PauseState::Paused {
            return Err(StateError::AlreadyPaused.into());
        }
        self.state = PauseState::Paused;
        Ok(())
    }

    pub fn unpause(&mut self, actor: &Address) -> Result<(), VaultError> {
        self.require(actor, Capability::Pause)?;
        if self.state == PauseState::Active {
            return Err(StateError::NotPaused.into());
        }
        self.state = PauseState::Active;
        Ok(())
    }

    /// Replace the holder of `role`; returns the previous holder.
    pub fn rotate(&mut self, actor: &Address, role: Role, new_holder: Address) -> Result<Address, VaultError> {
        self.require_admin(actor, Capability::Configure)?;
        if new_holder.is_zero() {
            return Err(ValidationError::ZeroAddress.into());
        }
        let slot = match role {
            Role::Guardian => &mut self.roles.guardian,
            Role::Governor => &mut self.roles.governor,
        };
        Ok(std::mem::replace(slot, new_holder))
    }

    /// Record governor approval of a new implementation identity.
    pub fn authorize_upgrade(&mut self, actor: &Address, implementation: Address) -> Result<(), VaultError> {
        self.require_admin(actor, Capability::Upgrade)?;
        if implementation.is_zero() {
            return Err(ValidationError::ZeroAddress.into());
        }
        self.authorized_upgrade = Some(implementation);
        Ok(())
    }
}
