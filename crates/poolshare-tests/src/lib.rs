//! Adversarial and scenario test suite for the PoolShare vault.
//!
//! Integration tests drive a fully wired vault (in-memory token, recording
//! event sink, manual clock) through the documented scenarios and attempt
//! to break conservation, replay protection and re-entry exclusion.

pub mod helpers;
