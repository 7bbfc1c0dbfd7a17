// Copyright (C) 2015-2025 The Neo Project.
//
// ecc.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Elliptic-curve keys and ECDSA over secp256r1 (and secp256k1 for the
//! CryptoLib interop surface).

use crate::{CryptoError, CryptoResult};
use lru::LruCache;
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use once_cell::sync::Lazy;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as P256Signature, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroUsize;

/// Compressed point length.
pub const ECPOINT_SIZE: usize = 33;
/// Signature length (r ‖ s, 32 bytes each).
pub const SIGNATURE_SIZE: usize = 64;

/// Capacity of the validated-encoding cache.
const POINT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Decompressing a point costs a field square root, and the same
/// committee and candidate keys recur on every block, so validation
/// results are memoized. Shared read-only across worker threads.
static POINT_CACHE: Lazy<Mutex<LruCache<[u8; ECPOINT_SIZE], bool>>> =
    Lazy::new(|| Mutex::new(LruCache::new(POINT_CACHE_CAPACITY)));

/// The curves the verification syscalls accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secp256Curve {
    /// secp256r1 / NIST P-256, the curve of consensus and witnesses.
    R1,
    /// secp256k1, accepted for cross-chain interop.
    K1,
}

/// A compressed secp256r1 public key.
///
/// Kept in compressed encoding; decompression happens on use. Ordering is
/// by X coordinate and then prefix, which keeps committee sorting stable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ECPoint([u8; ECPOINT_SIZE]);

impl ECPoint {
    /// Wraps a compressed encoding, validating it is a curve point.
    ///
    /// Validation outcomes are memoized in a bounded LRU keyed by the
    /// encoding, so repeated committee/candidate keys skip the curve
    /// arithmetic.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; ECPOINT_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPoint(format!("length {}", bytes.len())))?;
        if array[0] != 0x02 && array[0] != 0x03 {
            return Err(CryptoError::InvalidPoint(format!(
                "invalid prefix 0x{:02x}",
                array[0]
            )));
        }
        let cached = POINT_CACHE.lock().get(&array).copied();
        let valid = match cached {
            Some(valid) => valid,
            None => {
                let valid = VerifyingKey::from_sec1_bytes(&array).is_ok();
                POINT_CACHE.lock().put(array, valid);
                valid
            }
        };
        if !valid {
            return Err(CryptoError::InvalidPoint("not on curve".into()));
        }
        Ok(Self(array))
    }

    /// Parses the hex form used in configuration files.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes =
            hex::decode(s).map_err(|_| CryptoError::InvalidPoint("invalid hex".into()))?;
        Self::from_bytes(&bytes)
    }

    /// The compressed encoding.
    pub fn as_bytes(&self) -> &[u8; ECPOINT_SIZE] {
        &self.0
    }

    /// Copies out the compressed encoding.
    pub fn to_array(&self) -> [u8; ECPOINT_SIZE] {
        self.0
    }

    /// Hex form of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The verifying key for signature checks.
    pub fn verifying_key(&self) -> CryptoResult<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidPoint("not on curve".into()))
    }

    /// Verifies a 64-byte signature over sha256(`message`).
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify_signature(Secp256Curve::R1, message, signature, &self.0)
    }
}

impl Ord for ECPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0[1..].cmp(&other.0[1..]) {
            Ordering::Equal => self.0[0].cmp(&other.0[0]),
            ordering => ordering,
        }
    }
}

impl PartialOrd for ECPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECPoint({})", self.to_hex())
    }
}

impl Serializable for ECPoint {
    fn size(&self) -> usize {
        ECPOINT_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let bytes = reader.read_bytes(ECPOINT_SIZE)?;
        Self::from_bytes(&bytes).map_err(|e| IoError::InvalidFormat(e.to_string()))
    }
}

impl Serialize for ECPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ECPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A secp256r1 key pair used by consensus signing.
#[derive(Clone)]
pub struct KeyPair {
    private_key: [u8; 32],
    signing_key: SigningKey,
    public_key: ECPoint,
}

impl KeyPair {
    /// Builds a key pair from a 32-byte private key.
    pub fn from_private_key(private_key: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; 32] = private_key
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let verifying = VerifyingKey::from(&signing_key);
        let encoded = verifying.to_encoded_point(true);
        let public_key = ECPoint::from_bytes(encoded.as_bytes())?;
        Ok(Self {
            private_key: bytes,
            signing_key,
            public_key,
        })
    }

    /// Generates a random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let private: [u8; 32] = signing_key.to_bytes().into();
        // A freshly generated key always round-trips.
        Self::from_private_key(&private).expect("generated key is valid")
    }

    /// The raw private key bytes.
    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// The compressed public key.
    pub fn public_key(&self) -> &ECPoint {
        &self.public_key
    }

    /// Signs sha256(`message`), returning r ‖ s.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        let digest = neo3_core::sha256(message);
        let signature: P256Signature = self
            .signing_key
            .sign_prehash(&digest)
            .expect("prehash signing cannot fail for a 32-byte digest");
        let normalized = signature.normalize_s().unwrap_or(signature);
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes.copy_from_slice(&normalized.to_bytes());
        bytes
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the private key.
        write!(f, "KeyPair({})", self.public_key.to_hex())
    }
}

/// Verifies a 64-byte r ‖ s signature over sha256(`message`) with the given
/// compressed public key on `curve`.
pub fn verify_signature(curve: Secp256Curve, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    if signature.len() != SIGNATURE_SIZE {
        return false;
    }
    let digest = neo3_core::sha256(message);
    match curve {
        Secp256Curve::R1 => {
            let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
                return false;
            };
            let Ok(sig) = P256Signature::from_slice(signature) else {
                return false;
            };
            let sig = sig.normalize_s().unwrap_or(sig);
            key.verify_prehash(&digest, &sig).is_ok()
        }
        Secp256Curve::K1 => {
            use k256::ecdsa::{Signature as K256Signature, VerifyingKey as K256VerifyingKey};
            let Ok(key) = K256VerifyingKey::from_sec1_bytes(public_key) else {
                return false;
            };
            let Ok(sig) = K256Signature::from_slice(signature) else {
                return false;
            };
            let sig = sig.normalize_s().unwrap_or(sig);
            key.verify_prehash(&digest, &sig).is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let pair = KeyPair::generate();
        let message = b"consensus payload";
        let signature = pair.sign(message);
        assert!(pair.public_key().verify(message, &signature));
    }

    #[test]
    fn test_flipped_bit_fails() {
        let pair = KeyPair::generate();
        let message = b"payload";
        let mut signature = pair.sign(message);
        signature[10] ^= 0x01;
        assert!(!pair.public_key().verify(message, &signature));
    }

    #[test]
    fn test_wrong_key_fails() {
        let pair = KeyPair::generate();
        let other = KeyPair::generate();
        let signature = pair.sign(b"payload");
        assert!(!other.public_key().verify(b"payload", &signature));
    }

    #[test]
    fn test_point_parsing() {
        let pair = KeyPair::generate();
        let hex_form = pair.public_key().to_hex();
        let parsed = ECPoint::from_hex(&hex_form).unwrap();
        assert_eq!(&parsed, pair.public_key());
        assert!(ECPoint::from_hex("00").is_err());
    }

    #[test]
    fn test_point_cache_is_consistent() {
        // A valid encoding decodes the same way on the cached path.
        let pair = KeyPair::generate();
        let bytes = pair.public_key().to_array();
        let first = ECPoint::from_bytes(&bytes).unwrap();
        let second = ECPoint::from_bytes(&bytes).unwrap();
        assert_eq!(first, second);

        // An off-curve encoding stays rejected once memoized.
        let mut bad = bytes;
        bad[1] ^= 0xFF;
        let outcomes: Vec<bool> = (0..2).map(|_| ECPoint::from_bytes(&bad).is_ok()).collect();
        assert_eq!(outcomes[0], outcomes[1]);
    }

    #[test]
    fn test_ordering_by_x_coordinate() {
        let mut points: Vec<ECPoint> = (0..8).map(|_| *KeyPair::generate().public_key()).collect();
        points.sort();
        for pair in points.windows(2) {
            assert!(pair[0].as_bytes()[1..] <= pair[1].as_bytes()[1..]);
        }
    }

    #[test]
    fn test_k1_verify() {
        use k256::ecdsa::signature::hazmat::PrehashSigner;
        use k256::ecdsa::{Signature, SigningKey};
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let message = b"cross-chain";
        let digest = neo3_core::sha256(message);
        let signature: Signature = signing_key.sign_prehash(&digest).unwrap();
        let public = signing_key.verifying_key().to_encoded_point(true);
        assert!(verify_signature(
            Secp256Curve::K1,
            message,
            &signature.to_bytes(),
            public.as_bytes()
        ));
    }
}
