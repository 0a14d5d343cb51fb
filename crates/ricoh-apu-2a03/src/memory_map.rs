//! CPU bus bindings for the APU registers.

use log::debug;
use nes_bus::{Access, AddressSpace, BusError, DeviceId};

use crate::apu::{Apu, reg};

/// Base of the APU register window.
pub const APU_BASE: u16 = 0x4000;

/// Device name registered on the CPU bus.
pub const DEVICE_NAME: &str = "APU";

fn write_register<S: AsMut<Apu>>(state: &mut S, access: Access, value: u8) {
    state.as_mut().write_register(access.param, value);
}

fn read_status<S: AsMut<Apu>>(state: &mut S, access: Access) -> u8 {
    state.as_mut().read_status(access.open_bus)
}

fn unreadable<S>(_: &mut S, access: Access) -> u8 {
    access.open_bus
}

/// Bind the APU into `space`.
///
/// `$4000-$4007`, `$4015` and `$4017` writes reach the APU with the
/// register offset as the parameter. `$4015` is the only readable
/// register; the other APU addresses up to `$4013` read as open bus.
/// `$4014` and `$4016` are left untouched for the DMA unit and the
/// controller ports.
pub fn apply_memory_map<S: AsMut<Apu>>(space: &mut AddressSpace<S>) -> Result<DeviceId, BusError> {
    let device = space.register_device(DEVICE_NAME)?;

    let offset = |address: u16| address - APU_BASE;
    space.register_write_range(
        APU_BASE + reg::PULSE1_CONTROL..=APU_BASE + reg::PULSE2_TIMER_HIGH,
        write_register::<S>,
        device,
        offset,
    )?;
    for register in [reg::STATUS, reg::FRAME_COUNTER] {
        space.register_write(APU_BASE + register, write_register::<S>, device, register)?;
    }

    space.register_read_range(APU_BASE..=0x4013, unreadable::<S>, device, offset)?;
    space.register_read(APU_BASE + reg::STATUS, read_status::<S>, device, reg::STATUS)?;

    debug!("APU mapped at ${APU_BASE:04X}-${:04X}", APU_BASE + reg::FRAME_COUNTER);
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::Bus;

    #[derive(Default)]
    struct Board {
        apu: Apu,
    }

    impl AsMut<Apu> for Board {
        fn as_mut(&mut self) -> &mut Apu {
            &mut self.apu
        }
    }

    fn mapped() -> (AddressSpace<Board>, Board, DeviceId) {
        let mut space = AddressSpace::new("cpu");
        let device = apply_memory_map(&mut space).expect("APU maps");
        (space, Board::default(), device)
    }

    #[test]
    fn register_writes_carry_offsets() {
        let (space, _, device) = mapped();
        for address in 0x4000..=0x4007 {
            assert_eq!(space.write_owner(address), device);
            assert_eq!(space.write_param(address), address - 0x4000);
        }
        assert_eq!(space.write_param(0x4017), 0x17);
        assert_eq!(space.write_owner(0x4014), DeviceId::OPEN_BUS);
        assert_eq!(space.write_owner(0x4016), DeviceId::OPEN_BUS);
        assert_eq!(space.write_owner(0x4008), DeviceId::OPEN_BUS);
    }

    #[test]
    fn writes_reach_the_apu() {
        let (mut space, mut board, _) = mapped();
        {
            let mut bus = space.attach(&mut board);
            bus.write(0x4015, 0x01);
            bus.write(0x4003, 0x08);
            assert_eq!(bus.read(0x4015) & 0x01, 0x01);
        }
        assert_eq!(board.apu.pulse1().length().counter(), 254);
    }

    #[test]
    fn non_status_reads_float() {
        let (mut space, mut board, device) = mapped();
        space.write(&mut board, 0x4000, 0xA5);
        assert_eq!(space.read(&mut board, 0x4000), 0xA5);
        assert_eq!(space.read_owner(0x4000), device);
        assert_eq!(space.read_owner(0x4016), DeviceId::OPEN_BUS);
    }

    #[test]
    fn remapping_is_idempotent() {
        let (mut space, _, first) = mapped();
        let second = apply_memory_map(&mut space).expect("APU maps again");
        assert_eq!(first, second);
        assert_eq!(space.device_count(), 2);
    }
}
