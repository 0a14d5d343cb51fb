//! Registers whose writes land a fixed number of cycles late.

/// Result of a delayed write becoming visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed<T> {
    /// Value visible before the commit.
    pub old: T,
    /// Value visible from now on.
    pub new: T,
}

/// A value whose writes become visible `N` ticks after they are issued.
///
/// The tick that receives the write counts as the first of the `N`. A write
/// that arrives while another is still counting down replaces the pending
/// payload and restarts the countdown from `N`, so only the latest write
/// ever commits.
///
/// [`tick`](Self::tick) reports the commit exactly once. Owners react to
/// the returned [`Committed`] on the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedValue<T, const N: u8> {
    current: T,
    pending: T,
    countdown: u8,
}

impl<T: Copy + Default, const N: u8> Default for DelayedValue<T, N> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy, const N: u8> DelayedValue<T, N> {
    /// Number of ticks between a write and its commit.
    pub const DELAY: u8 = N;

    #[must_use]
    pub const fn new(initial: T) -> Self {
        const { assert!(N > 0, "a delayed value needs at least one tick of delay") };
        Self {
            current: initial,
            pending: initial,
            countdown: 0,
        }
    }

    /// The currently visible value.
    #[must_use]
    pub const fn get(&self) -> T {
        self.current
    }

    /// The value waiting to commit, if a write is in flight.
    #[must_use]
    pub const fn pending(&self) -> Option<T> {
        if self.countdown > 0 {
            Some(self.pending)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.countdown > 0
    }

    /// Ticks left before the pending write commits (0 when idle).
    #[must_use]
    pub const fn remaining(&self) -> u8 {
        self.countdown
    }

    /// Schedule `value` to become visible after `N` ticks.
    pub fn write_with_delay(&mut self, value: T) {
        self.pending = value;
        self.countdown = N;
    }

    /// Make `value` visible now and drop any write still in flight.
    pub fn write_immediate(&mut self, value: T) {
        self.current = value;
        self.pending = value;
        self.countdown = 0;
    }

    /// Advance one tick. Returns the commit on the tick the countdown
    /// expires, `None` on every other tick.
    pub fn tick(&mut self) -> Option<Committed<T>> {
        if self.countdown == 0 {
            return None;
        }
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        let old = self.current;
        self.current = self.pending;
        Some(Committed {
            old,
            new: self.current,
        })
    }
}
