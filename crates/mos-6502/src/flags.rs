//! Processor status register (P).

/// Carry.
pub const C: u8 = 0x01;

/// Zero.
pub const Z: u8 = 0x02;

/// Interrupt disable. While set, IRQ is ignored. NMI is not affected.
pub const I: u8 = 0x04;

/// Decimal mode. Stored and restored like any flag, but the 2A03 has no
/// BCD adder so it never changes ADC/SBC results.
pub const D: u8 = 0x08;

/// Break. Not a real latch: it only exists in the byte pushed to the
/// stack, set by BRK/PHP and clear for IRQ/NMI.
pub const B: u8 = 0x10;

/// Unused bit, always reads as 1.
pub const U: u8 = 0x20;

/// Overflow.
pub const V: u8 = 0x40;

/// Negative.
pub const N: u8 = 0x80;

/// Processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    #[must_use]
    pub const fn new() -> Self {
        Self(U)
    }

    /// Status loaded from the stack by PLP/RTI. B does not exist in the
    /// register and U always reads as set.
    #[must_use]
    pub const fn from_pulled(value: u8) -> Self {
        Self((value & !B) | U)
    }

    /// Byte pushed by BRK and PHP.
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.0 | U | B
    }

    /// Byte pushed by IRQ and NMI.
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        (self.0 | U) & !B
    }

    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z from a result byte.
    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }
}
