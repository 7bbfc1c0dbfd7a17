// Copyright (C) 2015-2025 The Neo Project.
//
// hash.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Hash functions used across the protocol.

pub use neo3_core::{hash160, hash256, sha256};

use ripemd::Ripemd160;
use sha2::{Digest, Sha512};

/// RIPEMD-160 of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-512 of `data` (CryptoLib exposes it alongside sha256).
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keyed sha256 as used by syscall name hashing: the interop descriptor id
/// is the first four little-endian bytes of sha256 over the ASCII name.
pub fn interop_method_hash(name: &str) -> u32 {
    let digest = sha256(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ripemd160_vector() {
        assert_eq!(
            hex::encode(ripemd160(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn test_hash160_composition() {
        assert_eq!(hash160(b"abc"), ripemd160(&sha256(b"abc")));
    }

    #[test]
    fn test_interop_method_hash() {
        // System.Runtime.Platform is a stable anchor for the hash scheme.
        let id = interop_method_hash("System.Runtime.Platform");
        assert_eq!(id, interop_method_hash("System.Runtime.Platform"));
        assert_ne!(id, interop_method_hash("System.Runtime.GetTrigger"));
    }
}
