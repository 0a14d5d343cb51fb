//! The APU frame counter.
//!
//! A step counter advances once per CPU cycle and is compared against the
//! region's thresholds. Crossing one fires quarter-frame (envelope) and
//! half-frame (length, sweep) clocks. In 4-step mode the last step also
//! raises the frame IRQ for three consecutive cycles.
//!
//! Writes to `$4017` pass through a four-tick [`DelayedValue`]. The commit
//! is only acted on during the second half of an APU cycle (odd CPU
//! cycles), so a write takes effect three or four cycles later depending
//! on the parity of the cycle that wrote it.

use emu_core::DelayedValue;
use log::trace;

use crate::timing::FrameTiming;

/// Sequencer mode selected by `$4017` bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Clocks produced on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameEvent {
    pub quarter: bool,
    pub half: bool,
}

impl FrameEvent {
    pub const NONE: Self = Self {
        quarter: false,
        half: false,
    };
    pub const QUARTER: Self = Self {
        quarter: true,
        half: false,
    };
    pub const QUARTER_HALF: Self = Self {
        quarter: true,
        half: true,
    };

    #[must_use]
    pub const fn is_none(self) -> bool {
        !self.quarter && !self.half
    }
}

/// Ticks between a `$4017` write and its commit. The tick of the writing
/// cycle counts as the first.
pub const CONTROL_DELAY: u8 = 4;

const MODE_BIT: u8 = 0x80;
const IRQ_INHIBIT_BIT: u8 = 0x40;

#[derive(Debug, Clone)]
pub struct FrameSequencer {
    timing: FrameTiming,
    control: DelayedValue<u8, CONTROL_DELAY>,
    mode: FrameMode,
    irq_inhibit: bool,
    irq_flag: bool,
    switch_pending: bool,
    step: u8,
    step_cycles: u32,
    cycles: u64,
}

impl FrameSequencer {
    /// Power-on state: 4-step mode, IRQ enabled, cycle 0.
    #[must_use]
    pub fn new(timing: FrameTiming) -> Self {
        Self {
            timing,
            control: DelayedValue::new(0),
            mode: FrameMode::FourStep,
            irq_inhibit: false,
            irq_flag: false,
            switch_pending: false,
            step: 0,
            step_cycles: 0,
            cycles: 0,
        }
    }

    #[must_use]
    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    #[must_use]
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Current step index, 0-3 in 4-step mode and 0-4 in 5-step mode.
    #[must_use]
    pub fn step(&self) -> u8 {
        self.step
    }

    /// Cycles counted since the sequence last started.
    #[must_use]
    pub fn step_cycles(&self) -> u32 {
        self.step_cycles
    }

    /// Ticks since power-on. Its parity is the APU cycle half.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn irq_inhibit(&self) -> bool {
        self.irq_inhibit
    }

    #[must_use]
    pub fn irq_flag(&self) -> bool {
        self.irq_flag
    }

    pub fn clear_irq(&mut self) {
        self.irq_flag = false;
    }

    /// The `$4017` value last committed.
    #[must_use]
    pub fn control(&self) -> u8 {
        self.control.get()
    }

    /// True while a `$4017` write is counting down or committed but not
    /// yet applied.
    #[must_use]
    pub fn is_switch_pending(&self) -> bool {
        self.control.is_pending() || self.switch_pending
    }

    /// Latch a `$4017` write. A second write before the first applies
    /// replaces it and restarts the delay.
    pub fn write_control(&mut self, value: u8) {
        self.switch_pending = false;
        self.control.write_with_delay(value);
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) -> FrameEvent {
        // Parity of the cycle being run, numbered from 0 before the
        // increment. Even cycles clock the pulse generators, so a committed
        // switch is applied on the odd cycle that follows one.
        let odd = self.cycles & 1 == 1;
        self.cycles = self.cycles.wrapping_add(1);

        if let Some(commit) = self.control.tick() {
            trace!("$4017 commit {:02X} -> {:02X}", commit.old, commit.new);
            self.switch_pending = true;
        }
        if self.switch_pending && odd {
            return self.apply_switch();
        }

        self.step_cycles += 1;
        match self.mode {
            FrameMode::FourStep => self.tick_four_step(),
            FrameMode::FiveStep => self.tick_five_step(),
        }
    }

    fn apply_switch(&mut self) -> FrameEvent {
        self.switch_pending = false;
        self.load_control(self.control.get());
        if self.irq_inhibit {
            self.irq_flag = false;
        }
        self.step = 0;
        self.step_cycles = 0;
        trace!(
            "frame sequencer restarted in {:?} at cycle {}",
            self.mode, self.cycles
        );
        match self.mode {
            FrameMode::FiveStep => FrameEvent::QUARTER_HALF,
            FrameMode::FourStep => FrameEvent::NONE,
        }
    }

    fn tick_four_step(&mut self) -> FrameEvent {
        let timing = self.timing.four_step;
        let now = self.step_cycles;
        if self.step < 3 {
            let step = self.step;
            if now != timing.steps[usize::from(step)] {
                return FrameEvent::NONE;
            }
            self.step += 1;
            return if step == 1 {
                FrameEvent::QUARTER_HALF
            } else {
                FrameEvent::QUARTER
            };
        }

        if now == timing.irq_start || now == timing.clock || now == timing.wrap {
            self.raise_irq();
        }
        if now == timing.clock {
            return FrameEvent::QUARTER_HALF;
        }
        if now == timing.wrap {
            self.step = 0;
            self.step_cycles = 0;
        }
        FrameEvent::NONE
    }

    fn tick_five_step(&mut self) -> FrameEvent {
        let timing = self.timing.five_step;
        let now = self.step_cycles;
        if self.step < 4 {
            let step = self.step;
            if now != timing.steps[usize::from(step)] {
                return FrameEvent::NONE;
            }
            self.step += 1;
            return match step {
                0 | 2 => FrameEvent::QUARTER,
                1 => FrameEvent::QUARTER_HALF,
                _ => FrameEvent::NONE,
            };
        }

        if now == timing.clock {
            return FrameEvent::QUARTER_HALF;
        }
        if now == timing.wrap {
            self.step = 0;
            self.step_cycles = 0;
        }
        FrameEvent::NONE
    }

    fn load_control(&mut self, value: u8) {
        self.mode = if value & MODE_BIT != 0 {
            FrameMode::FiveStep
        } else {
            FrameMode::FourStep
        };
        self.irq_inhibit = value & IRQ_INHIBIT_BIT != 0;
    }

    fn raise_irq(&mut self) {
        if !self.irq_inhibit {
            self.irq_flag = true;
        }
    }

    /// Warm reset: restart the sequence with the committed mode and
    /// inhibit, dropping any write in flight.
    pub fn reset_analog(&mut self) {
        let control = self.control.get();
        self.control.write_immediate(control);
        self.load_control(control);
        self.switch_pending = false;
        self.irq_flag = false;
        self.step = 0;
        self.step_cycles = 0;
    }

    /// Cold reset to the power-on state.
    pub fn reset_to_known(&mut self) {
        *self = Self::new(self.timing);
    }
}

impl Default for FrameSequencer {
    fn default() -> Self {
        Self::new(FrameTiming::NTSC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tick `n` times, returning the events with the 1-based tick numbers
    /// they fired on.
    fn run(seq: &mut FrameSequencer, n: u32) -> Vec<(u32, FrameEvent)> {
        (1..=n)
            .filter_map(|i| {
                let event = seq.tick();
                (!event.is_none()).then_some((i, event))
            })
            .collect()
    }

    #[test]
    fn ntsc_four_step_fires_on_thresholds() {
        let mut seq = FrameSequencer::new(FrameTiming::NTSC);
        let events = run(&mut seq, 29830);
        assert_eq!(
            events,
            [
                (7457, FrameEvent::QUARTER),
                (14913, FrameEvent::QUARTER_HALF),
                (22371, FrameEvent::QUARTER),
                (29829, FrameEvent::QUARTER_HALF),
            ]
        );
        assert_eq!(seq.step(), 0);
        assert_eq!(seq.step_cycles(), 0);
    }

    #[test]
    fn step_advances_exactly_on_threshold() {
        let mut seq = FrameSequencer::default();
        for _ in 0..7456 {
            seq.tick();
        }
        assert_eq!(seq.step(), 0);
        assert_eq!(seq.tick(), FrameEvent::QUARTER);
        assert_eq!(seq.step(), 1);
    }

    #[test]
    fn frame_irq_rises_on_the_last_three_cycles() {
        let mut seq = FrameSequencer::default();
        for _ in 0..29827 {
            seq.tick();
        }
        assert!(!seq.irq_flag());
        seq.tick();
        assert!(seq.irq_flag());

        // Clearing between the three cycles does not stick.
        seq.clear_irq();
        seq.tick();
        assert!(seq.irq_flag());
        seq.clear_irq();
        seq.tick();
        assert!(seq.irq_flag());
        seq.clear_irq();
        seq.tick();
        assert!(!seq.irq_flag());
    }

    #[test]
    fn second_frame_repeats_the_first() {
        let mut seq = FrameSequencer::default();
        run(&mut seq, 29830);
        let events = run(&mut seq, 7457);
        assert_eq!(events, [(7457, FrameEvent::QUARTER)]);
    }

    #[test]
    fn pal_thresholds() {
        let mut seq = FrameSequencer::new(FrameTiming::PAL);
        let events = run(&mut seq, 33254);
        let ticks: Vec<u32> = events.iter().map(|&(tick, _)| tick).collect();
        assert_eq!(ticks, [8313, 16627, 24939, 33253]);
        assert!(seq.irq_flag());
        assert_eq!(seq.step_cycles(), 0);
    }

    /// Write `$4017` on a cycle of the given parity, then return how many
    /// ticks (including the writing cycle's) pass before the switch lands.
    fn switch_latency(write_on_odd: bool, value: u8) -> u32 {
        let mut seq = FrameSequencer::default();
        if write_on_odd {
            seq.tick();
        }
        assert_eq!(seq.cycle() & 1 == 1, write_on_odd);
        seq.write_control(value);
        let mut ticks = 0;
        while seq.is_switch_pending() {
            seq.tick();
            ticks += 1;
            assert!(ticks < 10, "switch never applied");
        }
        ticks
    }

    #[test]
    fn write_on_even_cycle_applies_three_cycles_later() {
        // Ticks N..=N+3: the switch lands on the tick of cycle N+3.
        assert_eq!(switch_latency(false, 0x80), 4);
    }

    #[test]
    fn write_on_odd_cycle_applies_four_cycles_later() {
        assert_eq!(switch_latency(true, 0x80), 5);
    }

    #[test]
    fn committed_switch_waits_for_an_odd_cycle() {
        let mut seq = FrameSequencer::default();
        seq.tick();
        seq.write_control(0x80);
        // Cycles 1-4 run the delay; the commit lands on even cycle 4.
        for _ in 0..4 {
            seq.tick();
        }
        assert_eq!(seq.control(), 0x80);
        assert!(seq.is_switch_pending());
        assert_eq!(seq.mode(), FrameMode::FourStep);

        assert_eq!(seq.tick(), FrameEvent::QUARTER_HALF);
        assert_eq!(seq.cycle(), 6);
        assert!(!seq.is_switch_pending());
        assert_eq!(seq.mode(), FrameMode::FiveStep);
    }

    #[test]
    fn five_step_switch_clocks_immediately() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0x80);
        let events = run(&mut seq, 4);
        assert_eq!(events, [(4, FrameEvent::QUARTER_HALF)]);
        assert_eq!(seq.mode(), FrameMode::FiveStep);
        assert_eq!(seq.step(), 0);
    }

    #[test]
    fn five_step_sequence_never_raises_irq() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0x80);
        run(&mut seq, 4);

        let events = run(&mut seq, 37282);
        assert_eq!(
            events,
            [
                (7457, FrameEvent::QUARTER),
                (14913, FrameEvent::QUARTER_HALF),
                (22371, FrameEvent::QUARTER),
                (37281, FrameEvent::QUARTER_HALF),
            ]
        );
        assert!(!seq.irq_flag());
        assert_eq!(seq.step(), 0);
    }

    #[test]
    fn rewrite_restarts_the_delay() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0x80);
        seq.tick();
        seq.tick();
        seq.write_control(0x40);
        // Cycle 2 is even: four more ticks.
        for _ in 0..3 {
            seq.tick();
            assert_eq!(seq.mode(), FrameMode::FourStep);
            assert!(!seq.irq_inhibit());
        }
        seq.tick();
        assert!(!seq.is_switch_pending());
        assert_eq!(seq.mode(), FrameMode::FourStep);
        assert!(seq.irq_inhibit());
    }

    #[test]
    fn inhibit_clears_frame_irq() {
        let mut seq = FrameSequencer::default();
        run(&mut seq, 29828);
        assert!(seq.irq_flag());
        seq.write_control(0x40);
        run(&mut seq, 5);
        assert!(!seq.irq_flag());
    }

    #[test]
    fn inhibited_sequence_keeps_clocking() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0x40);
        run(&mut seq, 4);
        let events = run(&mut seq, 29830);
        assert_eq!(events.len(), 4);
        assert!(!seq.irq_flag());
    }

    #[test]
    fn warm_reset_keeps_committed_mode_and_drops_pending() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0xC0);
        run(&mut seq, 100);
        seq.write_control(0x00);
        seq.tick();
        seq.reset_analog();
        assert!(!seq.is_switch_pending());
        assert_eq!(seq.mode(), FrameMode::FiveStep);
        assert!(seq.irq_inhibit());
        assert_eq!(seq.step_cycles(), 0);
        assert_eq!(seq.control(), 0xC0);
    }

    #[test]
    fn cold_reset_is_idempotent() {
        let mut seq = FrameSequencer::default();
        seq.write_control(0x80);
        run(&mut seq, 1000);
        seq.reset_to_known();
        let once = format!("{seq:?}");
        seq.reset_to_known();
        assert_eq!(format!("{seq:?}"), once);
        assert_eq!(seq.cycle(), 0);
        assert_eq!(seq.mode(), FrameMode::FourStep);
    }
}
