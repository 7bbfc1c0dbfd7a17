// Copyright (C) 2015-2025 The Neo Project.
//
// compression.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! LZ4 payload compression.

use crate::{NetworkError, NetworkResult};
use lz4_flex::block::{compress_prepend_size, decompress_size_prepended};

/// Payloads below this size are never compressed.
pub const COMPRESSION_MIN_SIZE: usize = 128;
/// Compression must save at least this many bytes to be used.
pub const COMPRESSION_THRESHOLD: usize = 64;

/// Compresses `data` when it pays off; `None` means send uncompressed.
pub fn try_compress(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < COMPRESSION_MIN_SIZE {
        return None;
    }
    let compressed = compress_prepend_size(data);
    if data.len() > compressed.len() + COMPRESSION_THRESHOLD {
        Some(compressed)
    } else {
        None
    }
}

/// Decompresses a payload, enforcing the decompressed-size cap.
pub fn decompress(data: &[u8], max_size: usize) -> NetworkResult<Vec<u8>> {
    let decompressed = decompress_size_prepended(data)
        .map_err(|e| NetworkError::Malformed(format!("lz4: {e}")))?;
    if decompressed.len() > max_size {
        return Err(NetworkError::PayloadTooLarge {
            size: decompressed.len(),
            max: max_size,
        });
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payloads_stay_uncompressed() {
        assert!(try_compress(&[0u8; 64]).is_none());
    }

    #[test]
    fn test_compressible_payload_roundtrip() {
        let data = vec![0xABu8; 4096];
        let compressed = try_compress(&data).expect("highly compressible");
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed, 1 << 20).unwrap(), data);
    }

    #[test]
    fn test_decompression_bound_enforced() {
        let data = vec![0u8; 4096];
        let compressed = try_compress(&data).unwrap();
        assert!(matches!(
            decompress(&compressed, 1024),
            Err(NetworkError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_incompressible_payload_skipped() {
        let data: Vec<u8> = (0..256u32).flat_map(|i| i.to_le_bytes()).collect();
        // Random-ish short data rarely compresses past the threshold.
        let _ = try_compress(&data);
    }
}
