//! Variable slots for statics, locals and arguments.

use crate::error::{VmError, VmResult};
use crate::reference_counter::ReferenceCounter;
use crate::stack_item::StackItem;

/// A fixed-size run of variables, initialized to null.
#[derive(Debug)]
pub struct Slot {
    items: Vec<StackItem>,
    reference_counter: ReferenceCounter,
}

impl Slot {
    /// A slot of `count` null entries.
    pub fn new(count: usize, reference_counter: ReferenceCounter) -> Self {
        let items = vec![StackItem::Null; count];
        for item in &items {
            reference_counter.add_stack_reference(item);
        }
        Self {
            items,
            reference_counter,
        }
    }

    /// A slot seeded with `items` (used for call arguments).
    pub fn with_items(items: Vec<StackItem>, reference_counter: ReferenceCounter) -> Self {
        for item in &items {
            reference_counter.add_stack_reference(item);
        }
        Self {
            items,
            reference_counter,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> VmResult<StackItem> {
        self.items
            .get(index)
            .cloned()
            .ok_or_else(|| VmError::InvalidOperation(format!("slot index {index} out of range")))
    }

    pub fn set(&mut self, index: usize, item: StackItem) -> VmResult<()> {
        let target = self
            .items
            .get_mut(index)
            .ok_or_else(|| VmError::InvalidOperation(format!("slot index {index} out of range")))?;
        self.reference_counter.add_stack_reference(&item);
        let previous = std::mem::replace(target, item);
        self.reference_counter.remove_stack_reference(&previous);
        Ok(())
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        for item in &self.items {
            self.reference_counter.remove_stack_reference(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_to_null() {
        let slot = Slot::new(3, ReferenceCounter::new());
        assert!(slot.get(0).unwrap().is_null());
        assert!(slot.get(2).unwrap().is_null());
        assert!(slot.get(3).is_err());
    }

    #[test]
    fn test_set_swaps_references() {
        let rc = ReferenceCounter::new();
        let mut slot = Slot::new(1, rc.clone());
        assert_eq!(rc.count(), 1);
        slot.set(0, StackItem::from_int(5)).unwrap();
        assert_eq!(rc.count(), 1);
        assert_eq!(slot.get(0).unwrap().as_int().unwrap(), 5.into());
        drop(slot);
        assert_eq!(rc.count(), 0);
    }
}
