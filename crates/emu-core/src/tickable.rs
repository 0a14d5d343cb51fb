//! Trait for bus-less components advanced by the scheduler.

use crate::Ticks;

/// A component advanced one master cycle at a time.
///
/// Components track their own phase relative to the master clock. A device
/// that works at half rate, like the APU pulse timers, only does work on
/// every other tick.
pub trait Tickable {
    /// Advance the component by one master clock tick.
    fn tick(&mut self);

    /// Advance the component by `count` ticks.
    ///
    /// Must be observably identical to calling `tick()` `count` times.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
