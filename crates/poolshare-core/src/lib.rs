//! # poolshare-core
//! Foundation types, traits, and signing primitives for the PoolShare ledger.

pub mod constants;
pub mod crypto;
pub mod eip712;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;
