// Copyright (C) 2015-2025 The Neo Project.
//
// base58.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Base58 with the 4-byte double-sha256 checksum used by addresses and WIF.

use crate::{CryptoError, CryptoResult};
use neo3_core::hash256;

/// Encodes `data` with an appended 4-byte checksum.
pub fn base58check_encode(data: &[u8]) -> String {
    let checksum = hash256(data);
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

/// Decodes a Base58Check string, verifying and stripping the checksum.
pub fn base58check_decode(input: &str) -> CryptoResult<Vec<u8>> {
    let decoded = bs58::decode(input)
        .into_vec()
        .map_err(|_| CryptoError::InvalidFormat("invalid base58".into()))?;
    if decoded.len() < 4 {
        return Err(CryptoError::InvalidFormat("base58check input too short".into()));
    }
    let (data, checksum) = decoded.split_at(decoded.len() - 4);
    if hash256(data)[..4] != *checksum {
        return Err(CryptoError::InvalidFormat("base58check checksum mismatch".into()));
    }
    Ok(data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"neo base58 payload";
        let encoded = base58check_encode(data);
        assert_eq!(base58check_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut encoded = base58check_encode(b"payload");
        let last = encoded.pop().unwrap();
        encoded.push(if last == '1' { '2' } else { '1' });
        assert!(base58check_decode(&encoded).is_err());
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(base58check_decode("1").is_err());
    }
}
