// Copyright (C) 2015-2025 The Neo Project.
//
// binary_writer.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Little-endian binary writer for the Neo wire format.

use crate::{IoError, IoResult};

/// Writes primitives, var-ints and byte runs into a growable buffer.
///
/// All multi-byte integers are written little-endian.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consumes the writer and returns the underlying buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns a copy of the written bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Borrows the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_u8(&mut self, value: u8) -> IoResult<()> {
        self.buffer.push(value);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> IoResult<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> IoResult<()> {
        self.write_u8(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> IoResult<()> {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a Neo var-int: one byte below 0xFD, otherwise a
    /// 0xFD/0xFE/0xFF marker followed by a u16/u32/u64.
    pub fn write_var_int(&mut self, value: u64) -> IoResult<()> {
        if value < 0xFD {
            self.write_u8(value as u8)
        } else if value <= 0xFFFF {
            self.write_u8(0xFD)?;
            self.write_u16(value as u16)
        } else if value <= 0xFFFF_FFFF {
            self.write_u8(0xFE)?;
            self.write_u32(value as u32)
        } else {
            self.write_u8(0xFF)?;
            self.write_u64(value)
        }
    }

    /// Writes a var-int length prefix followed by the bytes.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.write_var_int(bytes.len() as u64)?;
        self.write_bytes(bytes)
    }

    /// Writes a UTF-8 string as var-bytes.
    pub fn write_var_string(&mut self, value: &str) -> IoResult<()> {
        self.write_var_bytes(value.as_bytes())
    }

    /// Writes a string into a fixed-width field, zero-padded.
    ///
    /// Fails if the encoded string does not fit.
    pub fn write_fixed_string(&mut self, value: &str, length: usize) -> IoResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > length {
            return Err(IoError::InvalidData(format!(
                "string of {} bytes does not fit in {} byte field",
                bytes.len(),
                length
            )));
        }
        self.buffer.extend_from_slice(bytes);
        self.buffer.extend(std::iter::repeat(0u8).take(length - bytes.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x01).unwrap();
        writer.write_u16(0x0302).unwrap();
        writer.write_u32(0x07060504).unwrap();
        assert_eq!(writer.to_bytes(), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_write_var_int_boundaries() {
        let mut writer = BinaryWriter::new();
        writer.write_var_int(0xFC).unwrap();
        assert_eq!(writer.to_bytes(), vec![0xFC]);

        let mut writer = BinaryWriter::new();
        writer.write_var_int(0xFD).unwrap();
        assert_eq!(writer.to_bytes(), vec![0xFD, 0xFD, 0x00]);

        let mut writer = BinaryWriter::new();
        writer.write_var_int(0x10000).unwrap();
        assert_eq!(writer.to_bytes(), vec![0xFE, 0x00, 0x00, 0x01, 0x00]);

        let mut writer = BinaryWriter::new();
        writer.write_var_int(0x1_0000_0000).unwrap();
        assert_eq!(
            writer.to_bytes(),
            vec![0xFF, 0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_write_var_bytes() {
        let mut writer = BinaryWriter::new();
        writer.write_var_bytes(&[0xAA, 0xBB]).unwrap();
        assert_eq!(writer.to_bytes(), vec![0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn test_fixed_string_padding() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("neo", 5).unwrap();
        assert_eq!(writer.to_bytes(), vec![b'n', b'e', b'o', 0, 0]);
        assert!(writer.write_fixed_string("too long", 4).is_err());
    }
}
