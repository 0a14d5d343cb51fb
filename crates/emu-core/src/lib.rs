//! Core traits and types for cycle-accurate emulation.
//!
//! Every device advances one master cycle per `tick()`. An external
//! scheduler drives all devices in a fixed order each cycle, so the whole
//! machine is deterministic for a given input sequence.

mod bus;
mod cpu;
mod delayed;
mod observable;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use delayed::{Committed, DelayedValue};
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
