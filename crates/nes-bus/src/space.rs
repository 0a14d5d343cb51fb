//! The 64K dispatch table.

use std::ops::RangeInclusive;

use emu_core::Bus;
use log::debug;

use crate::{BusError, DeviceId};

const ADDRESS_COUNT: usize = 0x1_0000;

/// Everything a handler learns about the access it is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Full 16-bit address on the bus.
    pub address: u16,
    /// Device the binding was registered for.
    pub device: DeviceId,
    /// Per-address parameter chosen at registration.
    pub param: u16,
    /// Last value driven on the data bus, for devices that leave bits floating.
    pub open_bus: u8,
}

/// Read handler. Returns the byte driven on the data bus.
pub type ReadFn<S> = fn(&mut S, Access) -> u8;

/// Write handler.
pub type WriteFn<S> = fn(&mut S, Access, u8);

#[derive(Clone, Copy)]
struct Binding<H> {
    handler: H,
    device: DeviceId,
    param: u16,
}

fn open_bus_read<S>(_: &mut S, access: Access) -> u8 {
    access.open_bus
}

fn open_bus_write<S>(_: &mut S, _: Access, _: u8) {}

/// One address space: a read binding and a write binding per address.
///
/// Registering a binding replaces whatever was there before. Boards and
/// mappers rely on this to remap windows at reset or on bank switches.
pub struct AddressSpace<S> {
    name: &'static str,
    reads: Box<[Binding<ReadFn<S>>]>,
    writes: Box<[Binding<WriteFn<S>>]>,
    devices: Vec<&'static str>,
    open_bus: u8,
}

impl<S> AddressSpace<S> {
    /// Create a space where every address is open bus.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let read = Binding {
            handler: open_bus_read::<S> as ReadFn<S>,
            device: DeviceId::OPEN_BUS,
            param: 0,
        };
        let write = Binding {
            handler: open_bus_write::<S> as WriteFn<S>,
            device: DeviceId::OPEN_BUS,
            param: 0,
        };
        Self {
            name,
            reads: vec![read; ADDRESS_COUNT].into_boxed_slice(),
            writes: vec![write; ADDRESS_COUNT].into_boxed_slice(),
            devices: vec!["open bus"],
            open_bus: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a device by name. Registering the same name again returns
    /// the id it already has.
    pub fn register_device(&mut self, name: &'static str) -> Result<DeviceId, BusError> {
        if let Some(index) = self.devices.iter().position(|&n| n == name) {
            return Ok(DeviceId(index as u16));
        }
        let max = usize::from(u16::MAX);
        if self.devices.len() > max {
            return Err(BusError::TooManyDevices {
                space: self.name,
                max,
            });
        }
        let id = DeviceId(self.devices.len() as u16);
        self.devices.push(name);
        debug!("{} bus: registered device {name} as {id}", self.name);
        Ok(id)
    }

    #[must_use]
    pub fn device_name(&self, device: DeviceId) -> Option<&'static str> {
        self.devices.get(device.index()).copied()
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn check_device(&self, device: DeviceId) -> Result<(), BusError> {
        if device.index() < self.devices.len() {
            Ok(())
        } else {
            Err(BusError::UnknownDevice {
                space: self.name,
                device,
            })
        }
    }

    /// Bind `handler` as the reader of `address`.
    pub fn register_read(
        &mut self,
        address: u16,
        handler: ReadFn<S>,
        device: DeviceId,
        param: u16,
    ) -> Result<(), BusError> {
        self.check_device(device)?;
        self.reads[address as usize] = Binding {
            handler,
            device,
            param,
        };
        Ok(())
    }

    /// Bind `handler` as the writer of `address`.
    pub fn register_write(
        &mut self,
        address: u16,
        handler: WriteFn<S>,
        device: DeviceId,
        param: u16,
    ) -> Result<(), BusError> {
        self.check_device(device)?;
        self.writes[address as usize] = Binding {
            handler,
            device,
            param,
        };
        Ok(())
    }

    /// Bind `handler` as the reader of every address in `range`, with
    /// `param(address)` as each address's parameter.
    pub fn register_read_range(
        &mut self,
        range: RangeInclusive<u16>,
        handler: ReadFn<S>,
        device: DeviceId,
        param: impl Fn(u16) -> u16,
    ) -> Result<(), BusError> {
        self.check_device(device)?;
        for address in range {
            self.reads[address as usize] = Binding {
                handler,
                device,
                param: param(address),
            };
        }
        Ok(())
    }

    /// Bind `handler` as the writer of every address in `range`.
    pub fn register_write_range(
        &mut self,
        range: RangeInclusive<u16>,
        handler: WriteFn<S>,
        device: DeviceId,
        param: impl Fn(u16) -> u16,
    ) -> Result<(), BusError> {
        self.check_device(device)?;
        for address in range {
            self.writes[address as usize] = Binding {
                handler,
                device,
                param: param(address),
            };
        }
        Ok(())
    }

    /// Return every address in `range` to open bus, for reads and writes.
    pub fn unmap_range(&mut self, range: RangeInclusive<u16>) {
        for address in range {
            self.reads[address as usize] = Binding {
                handler: open_bus_read::<S>,
                device: DeviceId::OPEN_BUS,
                param: 0,
            };
            self.writes[address as usize] = Binding {
                handler: open_bus_write::<S>,
                device: DeviceId::OPEN_BUS,
                param: 0,
            };
        }
    }

    /// Dispatch a read.
    pub fn read(&mut self, state: &mut S, address: u16) -> u8 {
        let binding = self.reads[address as usize];
        let value = (binding.handler)(
            state,
            Access {
                address,
                device: binding.device,
                param: binding.param,
                open_bus: self.open_bus,
            },
        );
        self.open_bus = value;
        value
    }

    /// Dispatch a write.
    pub fn write(&mut self, state: &mut S, address: u16, value: u8) {
        let binding = self.writes[address as usize];
        self.open_bus = value;
        (binding.handler)(
            state,
            Access {
                address,
                device: binding.device,
                param: binding.param,
                open_bus: value,
            },
            value,
        );
    }

    /// Last value seen on the data bus.
    #[must_use]
    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    #[must_use]
    pub fn read_owner(&self, address: u16) -> DeviceId {
        self.reads[address as usize].device
    }

    #[must_use]
    pub fn write_owner(&self, address: u16) -> DeviceId {
        self.writes[address as usize].device
    }

    #[must_use]
    pub fn read_param(&self, address: u16) -> u16 {
        self.reads[address as usize].param
    }

    #[must_use]
    pub fn write_param(&self, address: u16) -> u16 {
        self.writes[address as usize].param
    }

    /// Pair this space with its device container so a CPU can drive it
    /// through [`Bus`].
    pub fn attach<'a>(&'a mut self, state: &'a mut S) -> Attached<'a, S> {
        Attached { space: self, state }
    }
}

/// An address space bound to the devices it dispatches to.
pub struct Attached<'a, S> {
    space: &'a mut AddressSpace<S>,
    state: &'a mut S,
}

impl<S> Bus for Attached<'_, S> {
    fn read(&mut self, address: u16) -> u8 {
        self.space.read(self.state, address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.space.write(self.state, address, value);
    }
}
