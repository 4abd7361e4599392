//! Claim authorization: direct (caller is beneficiary) or delegated (signed).
//!
//! A delegated request is checked in a fixed order:
//! 1. `now > deadline` → [`VaultError::ExpiredRequest`]
//! 2. build the typed-data digest over the beneficiary's *live* nonce
//! 3. recover the signer; it must equal the beneficiary
//! 4. consume the nonce
//!
//! Because the digest embeds the live nonce, a signature is dead the moment
//! the nonce it was made for is consumed. There is no revocation list.

use std::collections::HashMap;

use tracing::{debug, warn};

use poolshare_core::crypto;
use poolshare_core::eip712::{ClaimMessage, Eip712Domain};
use poolshare_core::error::{SignatureError, StateError, VaultError};
use poolshare_core::types::{Address, ClaimRequest, Hash256};

/// Signing domain plus per-identity nonce counters.
#[derive(Debug, Clone)]
pub struct ClaimAuthorizer {
    domain: Eip712Domain,
    separator: Hash256,
    nonces: HashMap<Address, u64>,
}

impl ClaimAuthorizer {
    pub fn new(domain: Eip712Domain) -> Self {
        Self::with_nonces(domain, HashMap::new())
    }

    /// Resume with stored nonce counters.
    pub fn with_nonces(domain: Eip712Domain, nonces: HashMap<Address, u64>) -> Self {
        let separator = domain.separator();
        Self {
            domain,
            separator,
            nonces,
        }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Cached domain separator.
    pub fn separator(&self) -> Hash256 {
        self.separator
    }

    /// Next unused nonce of `account`.
    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    pub fn iter_nonces(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.nonces.iter()
    }

    /// Digest a beneficiary signs to authorize a relayed claim.
    pub fn digest(&self, beneficiary: Address, recipient: Address, nonce: u64, deadline: u64) -> Hash256 {
        ClaimMessage {
            beneficiary,
            recipient,
            nonce,
            deadline,
        }
        .digest(&self.separator)
    }

    /// Direct claims need no signature: the caller settles their own share.
    pub fn authorize_direct(&self, caller: &Address) -> Address {
        *caller
    }

    /// Check a delegated request against the live nonce without consuming it.
    ///
    /// Returns the nonce the signature was verified over.
    pub fn verify(&self, request: &ClaimRequest, now: u64) -> Result<u64, VaultError> {
        if now > request.deadline {
            return Err(VaultError::ExpiredRequest {
                deadline: request.deadline,
                now,
            });
        }

        let nonce = self.nonce_of(&request.beneficiary);
        let digest = self.digest(request.beneficiary, request.recipient, nonce, request.deadline);
        let signer = crypto::recover(&digest, &request.signature)?;
        if signer != request.beneficiary {
            return Err(SignatureError::SignerMismatch {
                expected: request.beneficiary,
                recovered: signer,
            }
            .into());
        }
        Ok(nonce)
    }

    /// Verify and consume: the beneficiary's nonce moves past the returned value.
    pub fn authorize_delegated(&mut self, request: &ClaimRequest, now: u64) -> Result<u64, VaultError> {
        let nonce = self.verify(request, now).inspect_err(|e| {
            warn!(beneficiary = %request.beneficiary, error = %e, "delegated claim rejected");
        })?;
        self.consume(&request.beneficiary)?;
        debug!(beneficiary = %request.beneficiary, nonce, "nonce consumed");
        Ok(nonce)
    }

    /// Increment `account`'s nonce, returning the consumed value.
    pub fn consume(&mut self, account: &Address) -> Result<u64, StateError> {
        let current = self.nonce_of(account);
        let next = current.checked_add(1).ok_or(StateError::ArithmeticOverflow)?;
        self.nonces.insert(*account, next);
        Ok(current)
    }

    /// Undo [`consume`](Self::consume) after the claim it authorized failed.
    pub fn release(&mut self, account: &Address, consumed: u64) {
        if consumed == 0 {
            self.nonces.remove(account);
        } else {
            self.nonces.insert(*account, consumed);
        }
    }
}
