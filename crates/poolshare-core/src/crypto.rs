//! secp256k1 / keccak-256 primitives for delegated claims.
//!
//! Identities are 20-byte addresses derived from secp256k1 public keys the
//! same way external wallets derive them, so a signature produced by any
//! standard typed-data signer recovers to the beneficiary's address.
//!
//! # Signature encoding
//!
//! Signatures are 65 bytes: `r (32) || s (32) || v (1)`. `v` may be the raw
//! recovery id (`0`/`1`) or the offset form (`27`/`28`). Signatures with a
//! high `s` value are rejected so each authorization has exactly one valid
//! encoding.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::constants::SIGNATURE_LEN;
use crate::error::{SignatureError, ValidationError};
use crate::types::{decode_prefixed_hex, Address, Hash256};

/// keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash256 {
    Hash256(Keccak256::digest(data).into())
}

/// keccak-256 over the concatenation of several byte slices.
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash256(hasher.finalize().into())
}

/// Address of a secp256k1 public key: last 20 bytes of the keccak-256 of the
/// uncompressed point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.0[12..]);
    Address(out)
}

/// A 65-byte recoverable ECDSA signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature(pub [u8; SIGNATURE_LEN]);

impl EcdsaSignature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The trailing recovery byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl From<[u8; SIGNATURE_LEN]> for EcdsaSignature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for EcdsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcdsaSignature({self})")
    }
}

impl fmt::Display for EcdsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for EcdsaSignature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed_hex::<SIGNATURE_LEN>(s).map(Self)
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Recover the signer address of a prehashed 32-byte digest.
pub fn recover(digest: &Hash256, signature: &EcdsaSignature) -> Result<Address, SignatureError> {
    let bytes = signature.as_bytes();
    let sig = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;
    if sig.normalize_s().is_some() {
        return Err(SignatureError::NonCanonical);
    }

    let v = signature.v();
    let recid = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::InvalidRecoveryByte(other)),
    };
    let recid = RecoveryId::from_byte(recid).ok_or(SignatureError::InvalidRecoveryByte(v))?;

    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recid)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_of(&key))
}

/// secp256k1 keypair for signing delegated claims.
///
/// Wraps [`k256::ecdsa::SigningKey`]; the secret scalar is zeroized on drop
/// by the underlying library.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::random(&mut csprng),
        }
    }

    /// Create a keypair from 32-byte secret key material.
    ///
    /// Fails if the bytes are zero or not below the curve order.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| SignatureError::Malformed)?;
        Ok(Self { signing_key })
    }

    /// The address this keypair signs as.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a prehashed digest, returning `r || s || v` with `v ∈ {27, 28}`.
    pub fn sign_prehash(&self, digest: &Hash256) -> Result<EcdsaSignature, SignatureError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(EcdsaSignature(out))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(seed: u8) -> Hash256 {
        keccak256(&[seed; 7])
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"").0),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak_concat_matches_single_buffer() {
        assert_eq!(keccak256_concat(&[b"ab", b"cd"]), keccak256(b"abcd"));
    }

    #[test]
    fn address_of_well_known_key() {
        // Secret key 1 is the generator point.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let kp = KeyPair::from_secret_bytes(secret).unwrap();
        assert_eq!(
            kp.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(KeyPair::from_secret_bytes([0u8; 32]).is_err());
    }

    #[test]
    fn sign_then_recover_yields_signer() {
        let kp = KeyPair::generate();
        let d = digest(1);
        let sig = kp.sign_prehash(&d).unwrap();
        assert!(sig.v() == 27 || sig.v() == 28);
        assert_eq!(recover(&d, &sig).unwrap(), kp.address());
    }

    #[test]
    fn raw_recovery_id_is_accepted() {
        let kp = KeyPair::generate();
        let d = digest(2);
        let mut sig = kp.sign_prehash(&d).unwrap();
        sig.0[64] -= 27;
        assert_eq!(recover(&d, &sig).unwrap(), kp.address());
    }

    #[test]
    fn other_digest_recovers_someone_else() {
        let kp = KeyPair::generate();
        let sig = kp.sign_prehash(&digest(3)).unwrap();
        match recover(&digest(4), &sig) {
            Ok(addr) => assert_ne!(addr, kp.address()),
            Err(e) => assert_eq!(e, SignatureError::RecoveryFailed),
        }
    }

    #[test]
    fn bad_recovery_byte_is_rejected() {
        let kp = KeyPair::generate();
        let d = digest(5);
        let mut sig = kp.sign_prehash(&d).unwrap();
        sig.0[64] = 29;
        assert_eq!(recover(&d, &sig), Err(SignatureError::InvalidRecoveryByte(29)));
    }

    #[test]
    fn zero_signature_is_malformed() {
        let sig = EcdsaSignature([0u8; SIGNATURE_LEN]);
        assert_eq!(recover(&digest(6), &sig), Err(SignatureError::Malformed));
    }

    #[test]
    fn high_s_is_rejected() {
        let kp = KeyPair::generate();
        let d = digest(7);
        let sig = kp.sign_prehash(&d).unwrap();

        // (r, n - s) verifies under the flipped recovery id.
        const ORDER: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];
        let mut bytes = sig.0;
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = ORDER[i] as i16 - sig.0[32 + i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            bytes[32 + i] = diff.rem_euclid(256) as u8;
        }
        bytes[64] = if sig.v() == 27 { 28 } else { 27 };
        assert_eq!(
            recover(&d, &EcdsaSignature(bytes)),
            Err(SignatureError::NonCanonical)
        );
    }

    #[test]
    fn signature_hex_roundtrip() {
        let kp = KeyPair::generate();
        let sig = kp.sign_prehash(&digest(8)).unwrap();
        let parsed: EcdsaSignature = sig.to_string().parse().unwrap();
        assert_eq!(parsed, sig);
    }
}
