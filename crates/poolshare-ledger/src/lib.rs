//! # poolshare-ledger
//! Pooled payout vault: a weight registry, a global per-weight accumulator
//! with per-account checkpoints, signed claim relaying and role-gated
//! administration.
//!
//! Deposits cost O(1) regardless of how many participants are registered.
//! Each participant's share is materialized lazily when it claims.

pub mod access;
pub mod accrual;
pub mod authorizer;
pub mod clock;
pub mod config;
pub mod events;
pub mod registry;
pub mod snapshot;
pub mod token;
pub mod vault;

pub use access::{AccessController, PausePolicy, PauseState, Roles};
pub use accrual::{AccrualLedger, CheckpointStore, Settlement};
pub use authorizer::ClaimAuthorizer;
pub use clock::{ManualClock, SystemClock};
pub use config::{VaultConfig, VaultInit};
pub use events::{RecordingSink, TracingSink};
pub use registry::{WeightChange, WeightRegistry};
pub use snapshot::{SnapshotError, VaultSnapshot};
pub use token::MemoryToken;
pub use vault::Vault;
