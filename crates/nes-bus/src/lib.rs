//! Address-space dispatch for the NES.
//!
//! Every one of the 65,536 addresses carries one read binding and one
//! write binding. A binding is a plain handler function, the id of the
//! device that owns the address, and a per-address parameter (a mirrored
//! RAM offset, a bank-relative ROM offset, a register index). Lookup is a
//! single index into a boxed slice, with no range checks on the access
//! path.
//!
//! Handlers receive the typed device container `S` (the board) by
//! mutable reference, so there is no type erasure anywhere on the bus.

mod device;
mod error;
mod mapper;
mod space;

pub use device::DeviceId;
pub use error::BusError;
pub use mapper::{Mapper, RomImage};
pub use space::{Access, AddressSpace, Attached, ReadFn, WriteFn};
