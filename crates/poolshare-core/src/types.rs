//! Core ledger types: account identities, digests, roles, claim requests.
//!
//! Amounts, weights and accumulator values are plain integers; see
//! [`constants`](crate::constants) for the fixed-point scale.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::EcdsaSignature;
use crate::error::ValidationError;

/// Token amount in the smallest unit of the distributed asset.
pub type Amount = u128;

/// A participant's share multiplier.
pub type Weight = u64;

/// A 32-byte hash value (keccak-256 digests, struct hashes, domain separators).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let bytes = decode_prefixed_hex::<32>(&s).map_err(serde::de::Error::custom)?;
            Ok(Self(bytes))
        } else {
            Ok(Self(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

/// A 20-byte account identity.
///
/// Derived from a secp256k1 public key as the last 20 bytes of the keccak-256
/// hash of the uncompressed point (see [`crypto::address_of`](crate::crypto::address_of)),
/// so externally produced signatures recover to the same identity.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid role holder or participant.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministic test/demo address: every byte set to `seed`.
    pub fn repeat_byte(seed: u8) -> Self {
        Self([seed; 20])
    }

    /// Left-pad to a 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed_hex::<20>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            Ok(Self(<[u8; 20]>::deserialize(deserializer)?))
        }
    }
}

/// Decode an optionally `0x`-prefixed hex string into exactly `N` bytes.
pub(crate) fn decode_prefixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ValidationError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| ValidationError::InvalidHex(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| ValidationError::InvalidHex(format!("expected {N} bytes, got {}", v.len())))
}

/// The two administrative role identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Emergency-pause role.
    Guardian,
    /// Configuration / upgrade role.
    Governor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guardian => write!(f, "guardian"),
            Self::Governor => write!(f, "governor"),
        }
    }
}

/// An operation class gated by a role.
///
/// Each capability belongs to exactly one role; the two sets are disjoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `pause` / `unpause`.
    Pause,
    /// `set_weights` and role rotation.
    Configure,
    /// Upgrade authorization.
    Upgrade,
}

impl Capability {
    /// The role that holds this capability.
    pub fn role(&self) -> Role {
        match self {
            Self::Pause => Role::Guardian,
            Self::Configure | Self::Upgrade => Role::Governor,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::Configure => write!(f, "configure"),
            Self::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// A relayed claim submitted on a beneficiary's behalf.
///
/// Not stored: the nonce it was signed over is read from the live counter
/// when the request is checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Whose accrued share is settled. Must be the signer.
    pub beneficiary: Address,
    /// Who receives the settled amount.
    pub recipient: Address,
    /// Unix seconds after which the request is rejected.
    pub deadline: u64,
    /// 65-byte `r || s || v` signature over the EIP-712 digest.
    pub signature: EcdsaSignature,
}
