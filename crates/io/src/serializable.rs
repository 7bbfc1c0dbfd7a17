// Copyright (C) 2015-2025 The Neo Project.
//
// serializable.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The [`Serializable`] trait implemented by every Neo wire type.

use crate::{BinaryWriter, IoResult, MemoryReader};

/// A type with a canonical Neo binary encoding.
pub trait Serializable {
    /// The exact number of bytes `serialize` will produce.
    fn size(&self) -> usize;

    /// Writes the canonical encoding into `writer`.
    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()>;

    /// Reads a value from its canonical encoding.
    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self>
    where
        Self: Sized;
}

/// Byte-array conveniences for any [`Serializable`].
pub trait SerializableExt: Serializable {
    /// Serializes into a fresh byte vector.
    fn to_array(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        // Writing into a Vec cannot fail.
        let _ = self.serialize(&mut writer);
        writer.into_bytes()
    }

    /// Deserializes from a byte slice, requiring full consumption.
    fn from_array(data: &[u8]) -> IoResult<Self>
    where
        Self: Sized,
    {
        let mut reader = MemoryReader::new(data);
        let value = Self::deserialize(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(crate::IoError::InvalidFormat(format!(
                "{} trailing bytes after deserialization",
                reader.remaining()
            )));
        }
        Ok(value)
    }
}

impl<T: Serializable> SerializableExt for T {}

/// Array (de)serialization helpers shared by wire types.
pub mod helper {
    use super::Serializable;
    use crate::{BinaryWriter, IoResult, MemoryReader};

    /// Writes a var-int count followed by each element.
    pub fn serialize_array<T: Serializable>(
        items: &[T],
        writer: &mut BinaryWriter,
    ) -> IoResult<()> {
        writer.write_var_int(items.len() as u64)?;
        for item in items {
            item.serialize(writer)?;
        }
        Ok(())
    }

    /// Reads a var-int count (≤ `max`) followed by that many elements.
    pub fn deserialize_array<T: Serializable>(
        reader: &mut MemoryReader<'_>,
        max: usize,
    ) -> IoResult<Vec<T>> {
        let count = reader.read_var_int(max as u64)? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(T::deserialize(reader)?);
        }
        Ok(items)
    }

    /// Serialized size of a counted array.
    pub fn array_size<T: Serializable>(items: &[T]) -> usize {
        crate::var_size(items.len() as u64) + items.iter().map(Serializable::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryWriter, IoResult, MemoryReader, SerializableExt};

    #[derive(Debug, PartialEq)]
    struct Sample {
        value: u32,
    }

    impl Serializable for Sample {
        fn size(&self) -> usize {
            4
        }

        fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
            writer.write_u32(self.value)
        }

        fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
            Ok(Sample {
                value: reader.read_u32()?,
            })
        }
    }

    #[test]
    fn test_roundtrip() {
        let original = Sample { value: 0x12345678 };
        let bytes = original.to_array();
        assert_eq!(bytes.len(), original.size());
        assert_eq!(Sample::from_array(&bytes).unwrap(), original);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Sample { value: 7 }.to_array();
        bytes.push(0xFF);
        assert!(Sample::from_array(&bytes).is_err());
    }

    #[test]
    fn test_array_roundtrip() {
        let items = vec![Sample { value: 1 }, Sample { value: 2 }];
        let mut writer = BinaryWriter::new();
        helper::serialize_array(&items, &mut writer).unwrap();
        assert_eq!(writer.len(), helper::array_size(&items));

        let bytes = writer.into_bytes();
        let mut reader = MemoryReader::new(&bytes);
        let back: Vec<Sample> = helper::deserialize_array(&mut reader, 16).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_array_count_bound() {
        let items = vec![Sample { value: 1 }, Sample { value: 2 }];
        let mut writer = BinaryWriter::new();
        helper::serialize_array(&items, &mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = MemoryReader::new(&bytes);
        assert!(helper::deserialize_array::<Sample>(&mut reader, 1).is_err());
    }
}
