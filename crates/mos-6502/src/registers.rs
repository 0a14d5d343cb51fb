//! CPU register file.

use crate::flags::{I, U};
use crate::Status;

/// Programmer-visible registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer into page 1.
    pub s: u8,
    /// Program counter.
    pub pc: u16,
    /// Processor status.
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// The power-on image: A, X, Y cleared, S at $FD, only U and I set.
    /// PC is filled in from the reset vector by the reset sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status(U | I),
        }
    }

    /// Address to write a pushed byte to. Decrements S.
    pub fn push(&mut self) -> u16 {
        let addr = self.stack_addr();
        self.s = self.s.wrapping_sub(1);
        addr
    }

    /// Address to read a pulled byte from. Increments S first.
    pub fn pop(&mut self) -> u16 {
        self.s = self.s.wrapping_add(1);
        self.stack_addr()
    }

    /// Current stack slot without moving S.
    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        0x0100 | (self.s as u16)
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut dyn emu_core::Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }
}
