//! Device handles.

use std::fmt;

/// Handle to a device registered on an [`AddressSpace`](crate::AddressSpace).
///
/// Ids are indices into the space's device registry. They are only
/// meaningful for the space that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub(crate) u16);

impl DeviceId {
    /// The default owner of every unbound address.
    pub const OPEN_BUS: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
