//! Setup-time bus errors.

use thiserror::Error;

use crate::DeviceId;

/// Errors raised while building an address space.
///
/// All of these are host configuration problems. Once emulation starts the
/// tables are total and no access can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("device {device} is not registered on the {space} bus")]
    UnknownDevice {
        space: &'static str,
        device: DeviceId,
    },

    #[error("{space} bus cannot hold more than {max} devices")]
    TooManyDevices { space: &'static str, max: usize },

    #[error("invalid ROM image: {0}")]
    InvalidRom(String),
}
