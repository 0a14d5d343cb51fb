//! Cartridge-side contract.

use crate::{AddressSpace, BusError};

/// Raw cartridge contents, already split out of whatever container file
/// they came in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomImage {
    /// Program ROM, seen by the CPU.
    pub prg: Vec<u8>,
    /// Character ROM, seen by the PPU. Empty means the board has CHR RAM.
    pub chr: Vec<u8>,
}

impl RomImage {
    #[must_use]
    pub fn new(prg: Vec<u8>, chr: Vec<u8>) -> Self {
        Self { prg, chr }
    }
}

/// A cartridge mapper.
///
/// `S` is the board type the handlers are written against. The mapper
/// normally lives inside `S`, and its handlers reach it through the board.
pub trait Mapper<S> {
    /// Take ownership of the ROM contents and validate their sizes.
    fn init_with_rom(&mut self, rom: &RomImage) -> Result<(), BusError>;

    /// Install bank-aware handlers on both address spaces. Called once
    /// before emulation starts and again whenever banks change.
    fn apply_map(
        &self,
        cpu_bus: &mut AddressSpace<S>,
        chr_bus: &mut AddressSpace<S>,
    ) -> Result<(), BusError>;
}
