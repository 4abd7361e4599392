//! EIP-712 structured-data hashing for delegated claims.
//!
//! ```text
//! domainSeparator = keccak256(abi.encode(
//!     keccak256(EIP712_DOMAIN_TYPE), keccak256(name), keccak256(version),
//!     chainId, verifyingContract))
//! structHash      = keccak256(abi.encode(
//!     keccak256(CLAIM_TYPE), beneficiary, recipient, nonce, deadline))
//! digest          = keccak256(0x19 0x01 || domainSeparator || structHash)
//! ```
//!
//! Every field is encoded as a 32-byte big-endian ABI word, so digests are
//! bit-identical to those produced by standard typed-data signers.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CLAIM_TYPE, DEFAULT_CHAIN_ID, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, EIP712_DOMAIN_TYPE,
    EIP712_PREFIX,
};
use crate::crypto::{keccak256, keccak256_concat};
use crate::types::{Address, Hash256};

/// Left-pad an unsigned integer to a 32-byte ABI word.
pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// The signing domain a vault instance binds its signatures to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for Eip712Domain {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: Address::ZERO,
        }
    }
}

impl Eip712Domain {
    /// keccak-256 of the domain's ABI encoding.
    pub fn separator(&self) -> Hash256 {
        let type_hash = keccak256(EIP712_DOMAIN_TYPE.as_bytes());
        let name_hash = keccak256(self.name.as_bytes());
        let version_hash = keccak256(self.version.as_bytes());
        keccak256_concat(&[
            type_hash.as_bytes(),
            name_hash.as_bytes(),
            version_hash.as_bytes(),
            &u64_word(self.chain_id),
            &self.verifying_contract.to_word(),
        ])
    }
}

/// The message a beneficiary signs to authorize a relayed claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMessage {
    pub beneficiary: Address,
    pub recipient: Address,
    pub nonce: u64,
    pub deadline: u64,
}

impl ClaimMessage {
    /// keccak-256 of the message's ABI encoding, prefixed by its type hash.
    pub fn struct_hash(&self) -> Hash256 {
        let type_hash = keccak256(CLAIM_TYPE.as_bytes());
        keccak256_concat(&[
            type_hash.as_bytes(),
            &self.beneficiary.to_word(),
            &self.recipient.to_word(),
            &u64_word(self.nonce),
            &u64_word(self.deadline),
        ])
    }

    /// The digest to sign under `separator`.
    pub fn digest(&self, separator: &Hash256) -> Hash256 {
        typed_data_digest(separator, &self.struct_hash())
    }
}

/// `keccak256(0x19 0x01 || separator || struct_hash)`.
pub fn typed_data_digest(separator: &Hash256, struct_hash: &Hash256) -> Hash256 {
    keccak256_concat(&[&EIP712_PREFIX, separator.as_bytes(), struct_hash.as_bytes()])
}
