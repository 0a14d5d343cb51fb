//! NROM (mapper 0): no bank switching.
//!
//! 16 KiB of PRG is mirrored into both halves of `$8000-$FFFF`; 32 KiB
//! fills it. CHR is 8 KiB of ROM, or 8 KiB of RAM when the image has none.

use log::debug;
use nes_bus::{Access, AddressSpace, BusError, Mapper, RomImage};

use crate::board::Board;

const PRG_BANK: usize = 0x4000;
const CHR_SIZE: usize = 0x2000;
const PRG_WINDOW: std::ops::RangeInclusive<u16> = 0x8000..=0xFFFF;
const CHR_WINDOW: std::ops::RangeInclusive<u16> = 0x0000..=0x1FFF;

#[derive(Debug, Clone, Default)]
pub struct Nrom {
    prg: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
}

impl Nrom {
    #[must_use]
    pub fn prg_len(&self) -> usize {
        self.prg.len()
    }

    #[must_use]
    pub fn chr_is_ram(&self) -> bool {
        self.chr_is_ram
    }

    /// PRG byte the CPU sees at `address`, without a bus access.
    #[must_use]
    pub fn peek_prg(&self, address: u16) -> Option<u8> {
        if !PRG_WINDOW.contains(&address) || self.prg.is_empty() {
            return None;
        }
        let offset = usize::from(address - PRG_WINDOW.start()) % self.prg.len();
        self.prg.get(offset).copied()
    }

    /// Clear CHR RAM. CHR ROM is left alone.
    pub(crate) fn reset_to_known(&mut self) {
        if self.chr_is_ram {
            self.chr.fill(0);
        }
    }
}

fn prg_read(board: &mut Board, access: Access) -> u8 {
    board
        .cartridge
        .prg
        .get(usize::from(access.param))
        .copied()
        .unwrap_or(access.open_bus)
}

fn chr_read(board: &mut Board, access: Access) -> u8 {
    board
        .cartridge
        .chr
        .get(usize::from(access.param))
        .copied()
        .unwrap_or(access.open_bus)
}

fn chr_ram_write(board: &mut Board, access: Access, value: u8) {
    if let Some(byte) = board.cartridge.chr.get_mut(usize::from(access.param)) {
        *byte = value;
    }
}

impl Mapper<Board> for Nrom {
    fn init_with_rom(&mut self, rom: &RomImage) -> Result<(), BusError> {
        if rom.prg.len() != PRG_BANK && rom.prg.len() != 2 * PRG_BANK {
            return Err(BusError::InvalidRom(format!(
                "NROM needs 16 or 32 KiB of PRG, got {} bytes",
                rom.prg.len()
            )));
        }
        self.chr_is_ram = rom.chr.is_empty();
        self.chr = if self.chr_is_ram {
            vec![0; CHR_SIZE]
        } else if rom.chr.len() == CHR_SIZE {
            rom.chr.clone()
        } else {
            return Err(BusError::InvalidRom(format!(
                "NROM needs 8 KiB of CHR, got {} bytes",
                rom.chr.len()
            )));
        };
        self.prg = rom.prg.clone();
        Ok(())
    }

    fn apply_map(
        &self,
        cpu_bus: &mut AddressSpace<Board>,
        chr_bus: &mut AddressSpace<Board>,
    ) -> Result<(), BusError> {
        let prg = cpu_bus.register_device("NROM PRG")?;
        let mask = (self.prg.len().max(1) - 1) as u16;
        cpu_bus.register_read_range(PRG_WINDOW, prg_read, prg, |address| {
            (address - 0x8000) & mask
        })?;

        let chr = chr_bus.register_device("NROM CHR")?;
        chr_bus.register_read_range(CHR_WINDOW, chr_read, chr, |address| address)?;
        if self.chr_is_ram {
            chr_bus.register_write_range(CHR_WINDOW, chr_ram_write, chr, |address| address)?;
        }
        debug!(
            "NROM mapped: {} KiB PRG, 8 KiB CHR {}",
            self.prg.len() / 1024,
            if self.chr_is_ram { "RAM" } else { "ROM" }
        );
        Ok(())
    }
}
