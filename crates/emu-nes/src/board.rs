//! The device container every bus handler is written against.

use nes_bus::{Access, AddressSpace, BusError, DeviceId};
use ricoh_apu_2a03::Apu;

use crate::nrom::Nrom;

/// Internal work RAM: 2 KiB, mirrored four times across `$0000-$1FFF`.
pub const RAM_SIZE: usize = 0x0800;

const RAM_WINDOW_END: u16 = 0x1FFF;
const RAM_MASK: u16 = (RAM_SIZE - 1) as u16;

pub struct Board {
    pub(crate) ram: [u8; RAM_SIZE],
    pub(crate) apu: Apu,
    pub(crate) cartridge: Nrom,
}

impl Board {
    #[must_use]
    pub fn new(apu: Apu, cartridge: Nrom) -> Self {
        Self {
            ram: [0; RAM_SIZE],
            apu,
            cartridge,
        }
    }

    #[must_use]
    pub fn ram(&self) -> &[u8; RAM_SIZE] {
        &self.ram
    }

    #[must_use]
    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    #[must_use]
    pub fn cartridge(&self) -> &Nrom {
        &self.cartridge
    }

    /// Read RAM through the mirror without touching the bus.
    #[must_use]
    pub fn peek_ram(&self, address: u16) -> u8 {
        self.ram[usize::from(address & RAM_MASK)]
    }

    /// Side-effect free view of RAM and PRG. Register space has no
    /// stable value and reads as `None`.
    #[must_use]
    pub fn peek(&self, address: u16) -> Option<u8> {
        match address {
            0x0000..=RAM_WINDOW_END => Some(self.peek_ram(address)),
            _ => self.cartridge.peek_prg(address),
        }
    }
}

impl AsMut<Apu> for Board {
    fn as_mut(&mut self) -> &mut Apu {
        &mut self.apu
    }
}

fn ram_read(board: &mut Board, access: Access) -> u8 {
    board.ram[usize::from(access.param)]
}

fn ram_write(board: &mut Board, access: Access, value: u8) {
    board.ram[usize::from(access.param)] = value;
}

/// Bind work RAM with the mirrored offset as each address's parameter.
pub fn install_ram(space: &mut AddressSpace<Board>) -> Result<DeviceId, BusError> {
    let device = space.register_device("RAM")?;
    let offset = |address: u16| address & RAM_MASK;
    space.register_read_range(0x0000..=RAM_WINDOW_END, ram_read, device, offset)?;
    space.register_write_range(0x0000..=RAM_WINDOW_END, ram_write, device, offset)?;
    Ok(device)
}
