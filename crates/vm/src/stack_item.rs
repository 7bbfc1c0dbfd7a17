//! Typed stack items.
//!
//! Compound items (`Array`, `Struct`, `Map`) and `Buffer` share mutable
//! bodies through `Rc<RefCell<…>>`, so a mutation through one reference is
//! visible through every other, matching reference semantics. The
//! engine's [`crate::ReferenceCounter`] tracks how many references exist
//! and enforces the global item budget.

use crate::error::{VmError, VmResult};
use crate::limits::ExecutionEngineLimits;
use crate::script::Script;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Maximum byte width of an integer item (two's complement).
pub const MAX_INTEGER_SIZE: usize = 32;

/// Wire/type bytes used by `ISTYPE`, `CONVERT` and the serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StackItemType {
    Any = 0x00,
    Pointer = 0x10,
    Boolean = 0x20,
    Integer = 0x21,
    ByteString = 0x28,
    Buffer = 0x30,
    Array = 0x40,
    Struct = 0x41,
    Map = 0x48,
    InteropInterface = 0x60,
}

impl StackItemType {
    /// Decodes a type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Any),
            0x10 => Some(Self::Pointer),
            0x20 => Some(Self::Boolean),
            0x21 => Some(Self::Integer),
            0x28 => Some(Self::ByteString),
            0x30 => Some(Self::Buffer),
            0x40 => Some(Self::Array),
            0x41 => Some(Self::Struct),
            0x48 => Some(Self::Map),
            0x60 => Some(Self::InteropInterface),
            _ => None,
        }
    }

    /// Whether items of this type are primitives.
    pub fn is_primitive(self) -> bool {
        matches!(self, Self::Boolean | Self::Integer | Self::ByteString)
    }

    /// Whether items of this type are reference-counted compounds.
    pub fn is_compound(self) -> bool {
        matches!(self, Self::Array | Self::Struct | Self::Map)
    }
}

/// A host object carried on the stack as an `InteropInterface` item.
///
/// Hosts that need mutation (iterators) use interior mutability.
pub trait InteropValue: Any + fmt::Debug {
    /// Downcasting access for syscall handlers.
    fn as_any(&self) -> &dyn Any;
}

/// Shared body of an array or struct.
pub type ArrayRef = Rc<RefCell<Vec<StackItem>>>;
/// Shared body of a map: insertion-ordered key/value pairs.
pub type MapRef = Rc<RefCell<Vec<(StackItem, StackItem)>>>;
/// Shared body of a buffer.
pub type BufferRef = Rc<RefCell<Vec<u8>>>;

/// A value on the evaluation stack.
#[derive(Clone)]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(BigInt),
    ByteString(Rc<Vec<u8>>),
    Buffer(BufferRef),
    Array(ArrayRef),
    Struct(ArrayRef),
    Map(MapRef),
    Pointer { script: Rc<Script>, position: usize },
    InteropInterface(Rc<dyn InteropValue>),
}

impl StackItem {
    /// The null singleton.
    pub fn null() -> Self {
        StackItem::Null
    }

    pub fn from_bool(value: bool) -> Self {
        StackItem::Boolean(value)
    }

    pub fn from_int<T: Into<BigInt>>(value: T) -> Self {
        StackItem::Integer(value.into())
    }

    pub fn from_byte_string<T: Into<Vec<u8>>>(value: T) -> Self {
        StackItem::ByteString(Rc::new(value.into()))
    }

    pub fn from_buffer<T: Into<Vec<u8>>>(value: T) -> Self {
        StackItem::Buffer(Rc::new(RefCell::new(value.into())))
    }

    pub fn new_array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_struct(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Rc::new(RefCell::new(items)))
    }

    pub fn new_map() -> Self {
        StackItem::Map(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn from_interface(value: Rc<dyn InteropValue>) -> Self {
        StackItem::InteropInterface(value)
    }

    pub fn pointer(script: Rc<Script>, position: usize) -> Self {
        StackItem::Pointer { script, position }
    }

    /// The item's type byte.
    pub fn item_type(&self) -> StackItemType {
        match self {
            StackItem::Null => StackItemType::Any,
            StackItem::Boolean(_) => StackItemType::Boolean,
            StackItem::Integer(_) => StackItemType::Integer,
            StackItem::ByteString(_) => StackItemType::ByteString,
            StackItem::Buffer(_) => StackItemType::Buffer,
            StackItem::Array(_) => StackItemType::Array,
            StackItem::Struct(_) => StackItemType::Struct,
            StackItem::Map(_) => StackItemType::Map,
            StackItem::Pointer { .. } => StackItemType::Pointer,
            StackItem::InteropInterface(_) => StackItemType::InteropInterface,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StackItem::Null)
    }

    /// Minimal little-endian two's-complement encoding of an integer;
    /// zero encodes as the empty run.
    pub fn int_to_bytes(value: &BigInt) -> Vec<u8> {
        if value.is_zero() {
            Vec::new()
        } else {
            value.to_signed_bytes_le()
        }
    }

    /// The truth value.
    pub fn as_bool(&self) -> VmResult<bool> {
        match self {
            StackItem::Null => Ok(false),
            StackItem::Boolean(value) => Ok(*value),
            StackItem::Integer(value) => Ok(!value.is_zero()),
            StackItem::ByteString(bytes) => {
                if bytes.len() > MAX_INTEGER_SIZE {
                    return Err(VmError::InvalidType(
                        "byte string too large for a truth value".into(),
                    ));
                }
                Ok(bytes.iter().any(|&b| b != 0))
            }
            // Buffers and every reference type are truthy.
            _ => Ok(true),
        }
    }

    /// The numeric value; byte runs wider than 32 bytes are rejected.
    pub fn as_int(&self) -> VmResult<BigInt> {
        match self {
            StackItem::Boolean(value) => Ok(BigInt::from(i32::from(*value))),
            StackItem::Integer(value) => Ok(value.clone()),
            StackItem::ByteString(bytes) => bytes_to_int(bytes),
            StackItem::Buffer(buffer) => bytes_to_int(&buffer.borrow()),
            other => Err(VmError::InvalidType(format!(
                "{:?} cannot be converted to an integer",
                other.item_type()
            ))),
        }
    }

    /// The value as a `usize` index, rejecting negatives and overflow.
    pub fn as_index(&self) -> VmResult<usize> {
        let value = self.as_int()?;
        value
            .to_usize()
            .ok_or_else(|| VmError::InvalidOperation(format!("index {value} out of range")))
    }

    /// The byte-run view of a primitive or buffer.
    pub fn as_bytes(&self) -> VmResult<Vec<u8>> {
        match self {
            StackItem::Boolean(value) => Ok(vec![u8::from(*value)]),
            StackItem::Integer(value) => Ok(Self::int_to_bytes(value)),
            StackItem::ByteString(bytes) => Ok(bytes.as_ref().clone()),
            StackItem::Buffer(buffer) => Ok(buffer.borrow().clone()),
            other => Err(VmError::InvalidType(format!(
                "{:?} has no byte representation",
                other.item_type()
            ))),
        }
    }

    /// Item size in bytes (primitives and buffers only).
    pub fn byte_len(&self) -> VmResult<usize> {
        match self {
            StackItem::Boolean(_) => Ok(1),
            StackItem::Integer(value) => Ok(Self::int_to_bytes(value).len()),
            StackItem::ByteString(bytes) => Ok(bytes.len()),
            StackItem::Buffer(buffer) => Ok(buffer.borrow().len()),
            other => Err(VmError::InvalidType(format!(
                "{:?} has no size",
                other.item_type()
            ))),
        }
    }

    /// Number of direct sub-items counted against the reference budget.
    pub fn sub_item_count(&self) -> usize {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
            StackItem::Map(entries) => entries.borrow().len() * 2,
            _ => 0,
        }
    }

    /// Value equality, as observed by `EQUAL`.
    ///
    /// Primitives compare by their byte encodings (so `true` equals
    /// integer 1); buffers, arrays, maps and interop handles compare by
    /// identity; structs compare element-wise within the comparison
    /// budget.
    pub fn equals(&self, other: &StackItem, limits: &ExecutionEngineLimits) -> VmResult<bool> {
        let mut budget = limits.max_comparable_size;
        self.equals_inner(other, limits, &mut budget)
    }

    fn equals_inner(
        &self,
        other: &StackItem,
        limits: &ExecutionEngineLimits,
        budget: &mut usize,
    ) -> VmResult<bool> {
        match (self, other) {
            (StackItem::Null, StackItem::Null) => Ok(true),
            (StackItem::Null, _) | (_, StackItem::Null) => Ok(false),
            (StackItem::Buffer(a), StackItem::Buffer(b)) => Ok(Rc::ptr_eq(a, b)),
            (StackItem::Array(a), StackItem::Array(b)) => Ok(Rc::ptr_eq(a, b)),
            (StackItem::Map(a), StackItem::Map(b)) => Ok(Rc::ptr_eq(a, b)),
            (StackItem::InteropInterface(a), StackItem::InteropInterface(b)) => {
                Ok(Rc::ptr_eq(a, b))
            }
            (
                StackItem::Pointer { script, position },
                StackItem::Pointer {
                    script: other_script,
                    position: other_position,
                },
            ) => Ok(Rc::ptr_eq(script, other_script) && position == other_position),
            (StackItem::Struct(a), StackItem::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let left = a.borrow();
                let right = b.borrow();
                if left.len() != right.len() {
                    return Ok(false);
                }
                for (x, y) in left.iter().zip(right.iter()) {
                    if !x.equals_inner(y, limits, budget)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (a, b) if a.item_type().is_primitive() && b.item_type().is_primitive() => {
                let left = a.as_bytes()?;
                let right = b.as_bytes()?;
                let cost = left.len().max(right.len()).max(1);
                if *budget < cost {
                    return Err(VmError::LimitExceeded(
                        "comparison exceeds the comparable-size budget".into(),
                    ));
                }
                *budget -= cost;
                Ok(left == right)
            }
            _ => Ok(false),
        }
    }

    /// Deep copy with struct semantics: nested structs are cloned,
    /// everything else is copied by reference.
    pub fn clone_struct(&self, limits: &ExecutionEngineLimits) -> VmResult<StackItem> {
        let mut count = 0usize;
        self.clone_struct_inner(limits, &mut count)
    }

    fn clone_struct_inner(
        &self,
        limits: &ExecutionEngineLimits,
        count: &mut usize,
    ) -> VmResult<StackItem> {
        match self {
            StackItem::Struct(items) => {
                let source = items.borrow();
                *count += source.len();
                if *count > limits.max_stack_size {
                    return Err(VmError::LimitExceeded("struct clone too large".into()));
                }
                let mut cloned = Vec::with_capacity(source.len());
                for item in source.iter() {
                    cloned.push(item.clone_struct_inner(limits, count)?);
                }
                Ok(StackItem::new_struct(cloned))
            }
            other => Ok(other.clone()),
        }
    }

    /// The `CONVERT` operation.
    pub fn convert_to(
        &self,
        target: StackItemType,
        limits: &ExecutionEngineLimits,
    ) -> VmResult<StackItem> {
        if self.item_type() == target {
            return Ok(self.clone());
        }
        let fail = || {
            Err(VmError::InvalidType(format!(
                "cannot convert {:?} to {:?}",
                self.item_type(),
                target
            )))
        };
        match target {
            StackItemType::Any => fail(),
            StackItemType::Boolean => Ok(StackItem::Boolean(self.as_bool()?)),
            StackItemType::Integer => Ok(StackItem::Integer(self.as_int()?)),
            StackItemType::ByteString => Ok(StackItem::from_byte_string(self.as_bytes()?)),
            StackItemType::Buffer => Ok(StackItem::from_buffer(self.as_bytes()?)),
            StackItemType::Array => match self {
                StackItem::Struct(items) => Ok(StackItem::new_array(items.borrow().clone())),
                _ => fail(),
            },
            StackItemType::Struct => match self {
                StackItem::Array(items) => {
                    StackItem::new_struct(items.borrow().clone()).clone_struct(limits)
                }
                _ => fail(),
            },
            StackItemType::Map | StackItemType::Pointer | StackItemType::InteropInterface => {
                fail()
            }
        }
    }

    /// Looks up a map entry by primitive key.
    pub fn map_find(
        entries: &[(StackItem, StackItem)],
        key: &StackItem,
        limits: &ExecutionEngineLimits,
    ) -> VmResult<Option<usize>> {
        if !key.item_type().is_primitive() {
            return Err(VmError::InvalidType("map keys must be primitive".into()));
        }
        for (index, (existing, _)) in entries.iter().enumerate() {
            if existing.equals(key, limits)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Downcasts an interop interface to a concrete host type.
    pub fn as_interface<T: 'static>(&self) -> VmResult<Rc<dyn InteropValue>> {
        match self {
            StackItem::InteropInterface(value) if value.as_any().is::<T>() => Ok(Rc::clone(value)),
            StackItem::InteropInterface(_) => {
                Err(VmError::InvalidType("unexpected interop interface type".into()))
            }
            other => Err(VmError::InvalidType(format!(
                "{:?} is not an interop interface",
                other.item_type()
            ))),
        }
    }
}

fn bytes_to_int(bytes: &[u8]) -> VmResult<BigInt> {
    if bytes.len() > MAX_INTEGER_SIZE {
        return Err(VmError::InvalidType(format!(
            "byte run of {} bytes exceeds the integer width",
            bytes.len()
        )));
    }
    if bytes.is_empty() {
        return Ok(BigInt::zero());
    }
    Ok(BigInt::from_signed_bytes_le(bytes))
}

/// Validates that an arithmetic result stays within the integer width:
/// |value| may not exceed 2^255.
pub fn check_integer_width(value: &BigInt) -> VmResult<()> {
    if value.abs().bits() <= MAX_INTEGER_SIZE as u64 * 8 - 1
        || value.abs() == BigInt::from(1) << (MAX_INTEGER_SIZE * 8 - 1)
    {
        Ok(())
    } else {
        Err(VmError::InvalidOperation(format!(
            "integer exceeds {MAX_INTEGER_SIZE}-byte width"
        )))
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::Null => write!(f, "Null"),
            StackItem::Boolean(value) => write!(f, "Boolean({value})"),
            StackItem::Integer(value) => write!(f, "Integer({value})"),
            StackItem::ByteString(bytes) => write!(f, "ByteString({} bytes)", bytes.len()),
            StackItem::Buffer(buffer) => write!(f, "Buffer({} bytes)", buffer.borrow().len()),
            StackItem::Array(items) => write!(f, "Array({} items)", items.borrow().len()),
            StackItem::Struct(items) => write!(f, "Struct({} items)", items.borrow().len()),
            StackItem::Map(entries) => write!(f, "Map({} entries)", entries.borrow().len()),
            StackItem::Pointer { position, .. } => write!(f, "Pointer({position})"),
            StackItem::InteropInterface(value) => write!(f, "InteropInterface({value:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ExecutionEngineLimits {
        ExecutionEngineLimits::default()
    }

    #[test]
    fn test_primitive_equality_crosses_types() {
        let one_int = StackItem::from_int(1);
        let one_bool = StackItem::from_bool(true);
        let one_bytes = StackItem::from_byte_string(vec![1]);
        assert!(one_int.equals(&one_bool, &limits()).unwrap());
        assert!(one_int.equals(&one_bytes, &limits()).unwrap());

        // false is [0]; integer zero is the empty run.
        let zero_int = StackItem::from_int(0);
        let false_bool = StackItem::from_bool(false);
        assert!(!zero_int.equals(&false_bool, &limits()).unwrap());
    }

    #[test]
    fn test_compound_equality_is_identity() {
        let a = StackItem::new_array(vec![StackItem::from_int(1)]);
        let b = StackItem::new_array(vec![StackItem::from_int(1)]);
        assert!(!a.equals(&b, &limits()).unwrap());
        assert!(a.equals(&a.clone(), &limits()).unwrap());
    }

    #[test]
    fn test_struct_equality_is_structural() {
        let a = StackItem::new_struct(vec![StackItem::from_int(1), StackItem::from_int(2)]);
        let b = StackItem::new_struct(vec![StackItem::from_int(1), StackItem::from_int(2)]);
        let c = StackItem::new_struct(vec![StackItem::from_int(1), StackItem::from_int(3)]);
        assert!(a.equals(&b, &limits()).unwrap());
        assert!(!a.equals(&c, &limits()).unwrap());
    }

    #[test]
    fn test_shared_mutation_is_visible() {
        let array = StackItem::new_array(vec![]);
        let alias = array.clone();
        if let StackItem::Array(items) = &array {
            items.borrow_mut().push(StackItem::from_int(7));
        }
        if let StackItem::Array(items) = &alias {
            assert_eq!(items.borrow().len(), 1);
        } else {
            panic!("alias changed type");
        }
    }

    #[test]
    fn test_integer_byte_roundtrip() {
        for value in [0i64, 1, -1, 127, 128, -128, -129, 255, 256] {
            let item = StackItem::from_int(value);
            let bytes = item.as_bytes().unwrap();
            let back = StackItem::from_byte_string(bytes).as_int().unwrap();
            assert_eq!(back, BigInt::from(value));
        }
    }

    #[test]
    fn test_oversized_bytes_do_not_convert() {
        let wide = StackItem::from_byte_string(vec![1u8; 33]);
        assert!(wide.as_int().is_err());
        assert!(wide.as_bool().is_err());
    }

    #[test]
    fn test_convert_array_to_struct_deep_clones() {
        let inner = StackItem::new_struct(vec![StackItem::from_int(5)]);
        let array = StackItem::new_array(vec![inner.clone()]);
        let converted = array.convert_to(StackItemType::Struct, &limits()).unwrap();
        let StackItem::Struct(items) = &converted else {
            panic!("conversion produced {converted:?}");
        };
        // Nested struct was cloned, not aliased.
        let nested = items.borrow()[0].clone();
        if let (StackItem::Struct(a), StackItem::Struct(b)) = (&inner, &nested) {
            assert!(!Rc::ptr_eq(a, b));
        } else {
            panic!("nested item is not a struct");
        }
    }

    #[test]
    fn test_integer_width_boundary() {
        let limit = BigInt::from(1) << 255;
        assert!(check_integer_width(&limit).is_ok());
        assert!(check_integer_width(&(-limit.clone())).is_ok());
        assert!(check_integer_width(&(limit + 1)).is_err());
    }

    #[test]
    fn test_buffer_is_always_truthy() {
        assert!(StackItem::from_buffer(vec![0, 0]).as_bool().unwrap());
        assert!(!StackItem::from_byte_string(vec![0, 0]).as_bool().unwrap());
    }
}
