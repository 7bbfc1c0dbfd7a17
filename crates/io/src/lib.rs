// Copyright (C) 2015-2025 The Neo Project.
//
// lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! # Neo3 IO
//!
//! Binary serialization for the Neo N3 wire format: little-endian
//! primitives, the Neo variable-length integer encoding, and the
//! [`Serializable`] trait implemented by every wire type in the node.

pub mod binary_writer;
pub mod error;
pub mod memory_reader;
pub mod serializable;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
pub use serializable::{helper, Serializable, SerializableExt};

/// Returns the serialized size of a Neo var-int holding `value`.
pub fn var_size(value: u64) -> usize {
    if value < 0xFD {
        1
    } else if value <= 0xFFFF {
        3
    } else if value <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Returns the serialized size of a var-bytes field holding `len` bytes.
pub fn var_bytes_size(len: usize) -> usize {
    var_size(len as u64) + len
}
