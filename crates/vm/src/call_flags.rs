//! Call flags controlling what a loaded context may do.

use bitflags::bitflags;

bitflags! {
    /// Permissions granted to an execution context. Syscall descriptors
    /// declare the flags they require; invoking one from a context whose
    /// flags do not cover them faults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallFlags: u8 {
        const NONE = 0;
        const READ_STATES = 0b0000_0001;
        const WRITE_STATES = 0b0000_0010;
        const ALLOW_CALL = 0b0000_0100;
        const ALLOW_NOTIFY = 0b0000_1000;
        const STATES = Self::READ_STATES.bits() | Self::WRITE_STATES.bits();
        const READ_ONLY = Self::READ_STATES.bits() | Self::ALLOW_CALL.bits();
        const ALL = Self::STATES.bits() | Self::ALLOW_CALL.bits() | Self::ALLOW_NOTIFY.bits();
    }
}

impl CallFlags {
    /// Decodes flags from a byte, rejecting undefined bits.
    pub fn from_byte(value: u8) -> Option<Self> {
        Self::from_bits(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(CallFlags::ALL.bits(), 0b1111);
        assert!(CallFlags::ALL.contains(CallFlags::READ_ONLY));
        assert!(CallFlags::READ_ONLY.contains(CallFlags::READ_STATES));
        assert!(!CallFlags::READ_ONLY.contains(CallFlags::WRITE_STATES));
    }

    #[test]
    fn test_undefined_bits_rejected() {
        assert!(CallFlags::from_byte(0b1_0000).is_none());
    }
}
