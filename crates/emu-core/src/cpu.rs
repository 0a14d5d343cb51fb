//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// Unlike other `Tickable` components, CPUs take a bus reference in their
/// tick method because they access memory on specific cycles. The bus is
/// passed in, not owned, so the board can share it with other devices.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by one cycle.
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU has locked up and will never fetch again.
    fn is_halted(&self) -> bool;

    /// Drive the NMI input. `true` means the line is pulled low (asserted).
    fn set_nmi_line(&mut self, asserted: bool);

    /// Drive the IRQ input. `true` means the line is pulled low (asserted).
    fn set_irq_line(&mut self, asserted: bool);

    /// Cold reset: load the power-on image and fetch the reset vector.
    fn reset_to_known<B: Bus>(&mut self, bus: &mut B);

    /// Warm reset: reload timing state and the reset vector while keeping
    /// whatever register contents survive a reset on real hardware.
    fn reset_analog<B: Bus>(&mut self, bus: &mut B);
}
