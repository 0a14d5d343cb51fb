//! The APU half of the 2A03: two pulse channels driven by the frame
//! sequencer.
//!
//! The APU is ticked once per CPU cycle, after the CPU. Pulse generators
//! run on even cycles (one APU cycle per two CPU cycles) and the sequencer
//! runs every cycle.

use emu_core::{Observable, Tickable, Value};
use log::debug;

use crate::frame_sequencer::{FrameEvent, FrameMode, FrameSequencer};
use crate::pulse::{Negate, Pulse};
use crate::timing::FrameTiming;

/// Register offsets from `$4000`.
pub mod reg {
    pub const PULSE1_CONTROL: u16 = 0x00;
    pub const PULSE1_SWEEP: u16 = 0x01;
    pub const PULSE1_TIMER_LOW: u16 = 0x02;
    pub const PULSE1_TIMER_HIGH: u16 = 0x03;
    pub const PULSE2_CONTROL: u16 = 0x04;
    pub const PULSE2_SWEEP: u16 = 0x05;
    pub const PULSE2_TIMER_LOW: u16 = 0x06;
    pub const PULSE2_TIMER_HIGH: u16 = 0x07;
    pub const STATUS: u16 = 0x15;
    pub const FRAME_COUNTER: u16 = 0x17;
}

/// Bytes in the register file, `$4000-$4017`.
pub const REGISTER_COUNT: usize = 0x18;

const STATUS_FRAME_IRQ: u8 = 0x40;
/// `$4015` bit 5 is not driven.
const STATUS_OPEN_BUS: u8 = 0x20;

#[derive(Debug, Clone)]
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    sequencer: FrameSequencer,
    registers: [u8; REGISTER_COUNT],
}

impl Apu {
    #[must_use]
    pub fn new(timing: FrameTiming) -> Self {
        Self {
            pulse1: Pulse::new(Negate::OnesComplement),
            pulse2: Pulse::new(Negate::TwosComplement),
            sequencer: FrameSequencer::new(timing),
            registers: [0; REGISTER_COUNT],
        }
    }

    #[must_use]
    pub fn pulse1(&self) -> &Pulse {
        &self.pulse1
    }

    #[must_use]
    pub fn pulse2(&self) -> &Pulse {
        &self.pulse2
    }

    #[must_use]
    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    /// Last byte written to the register at `offset` from `$4000`.
    #[must_use]
    pub fn register(&self, offset: u16) -> u8 {
        self.registers
            .get(usize::from(offset))
            .copied()
            .unwrap_or(0)
    }

    /// Write the register at `offset` from `$4000`. Offsets with no
    /// register behind them are ignored.
    pub fn write_register(&mut self, offset: u16, value: u8) {
        let Some(slot) = self.registers.get_mut(usize::from(offset)) else {
            return;
        };
        *slot = value;
        match offset {
            reg::PULSE1_CONTROL => self.pulse1.write_control(value),
            reg::PULSE1_SWEEP => self.pulse1.write_sweep(value),
            reg::PULSE1_TIMER_LOW => self.pulse1.write_timer_low(value),
            reg::PULSE1_TIMER_HIGH => self.pulse1.write_timer_high(value),
            reg::PULSE2_CONTROL => self.pulse2.write_control(value),
            reg::PULSE2_SWEEP => self.pulse2.write_sweep(value),
            reg::PULSE2_TIMER_LOW => self.pulse2.write_timer_low(value),
            reg::PULSE2_TIMER_HIGH => self.pulse2.write_timer_high(value),
            reg::STATUS => {
                self.pulse1.set_enabled(value & 0x01 != 0);
                self.pulse2.set_enabled(value & 0x02 != 0);
            }
            reg::FRAME_COUNTER => self.sequencer.write_control(value),
            _ => {}
        }
    }

    /// `$4015` as the CPU sees it. Reading acknowledges the frame IRQ.
    pub fn read_status(&mut self, open_bus: u8) -> u8 {
        let status = self.peek_status(open_bus);
        self.sequencer.clear_irq();
        status
    }

    /// `$4015` without the read side effect.
    #[must_use]
    pub fn peek_status(&self, open_bus: u8) -> u8 {
        let mut status = open_bus & STATUS_OPEN_BUS;
        if self.pulse1.length().is_active() {
            status |= 0x01;
        }
        if self.pulse2.length().is_active() {
            status |= 0x02;
        }
        if self.sequencer.irq_flag() {
            status |= STATUS_FRAME_IRQ;
        }
        status
    }

    /// Level of the APU's IRQ output.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.sequencer.irq_flag()
    }

    /// Non-linear pulse mix, 0.0 to about 0.26.
    #[must_use]
    pub fn sample(&self) -> f32 {
        let sum = f32::from(self.pulse1.output()) + f32::from(self.pulse2.output());
        if sum > 0.0 {
            95.88 / (8128.0 / sum + 100.0)
        } else {
            0.0
        }
    }

    fn clock_frame(&mut self, event: FrameEvent) {
        if event.quarter {
            self.pulse1.clock_quarter_frame();
            self.pulse2.clock_quarter_frame();
        }
        if event.half {
            self.pulse1.clock_half_frame();
            self.pulse2.clock_half_frame();
        }
    }

    /// Warm reset. Channel registers and the committed frame mode are
    /// kept, `$4015` is cleared and the sequence restarts.
    pub fn reset_analog(&mut self) {
        self.registers[usize::from(reg::STATUS)] = 0;
        for pulse in [&mut self.pulse1, &mut self.pulse2] {
            pulse.set_enabled(false);
            pulse.restart_sequence();
        }
        self.sequencer.reset_analog();
        debug!("APU warm reset");
    }

    /// Cold reset to the power-on state.
    pub fn reset_to_known(&mut self) {
        *self = Self::new(*self.sequencer.timing());
        debug!("APU cold reset");
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(FrameTiming::NTSC)
    }
}

impl Tickable for Apu {
    fn tick(&mut self) {
        if self.sequencer.cycle() & 1 == 0 {
            self.pulse1.clock();
            self.pulse2.clock();
        }
        let event = self.sequencer.tick();
        self.clock_frame(event);
    }
}

const QUERY_PATHS: &[&str] = &[
    "cycle",
    "status",
    "irq",
    "frame.mode",
    "frame.step",
    "frame.cycles",
    "frame.inhibit",
    "frame.pending",
    "frame.control",
    "pulse1.duty",
    "pulse1.phase",
    "pulse1.period",
    "pulse1.length",
    "pulse1.envelope",
    "pulse1.output",
    "pulse2.duty",
    "pulse2.phase",
    "pulse2.period",
    "pulse2.length",
    "pulse2.envelope",
    "pulse2.output",
];

fn query_pulse(pulse: &Pulse, field: &str) -> Option<Value> {
    match field {
        "duty" => Some(pulse.duty().into()),
        "phase" => Some(pulse.phase().into()),
        "period" => Some(pulse.period().into()),
        "length" => Some(pulse.length().counter().into()),
        "envelope" => Some(pulse.envelope().output().into()),
        "output" => Some(pulse.output().into()),
        _ => None,
    }
}

impl Observable for Apu {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(field) = path.strip_prefix("pulse1.") {
            return query_pulse(&self.pulse1, field);
        }
        if let Some(field) = path.strip_prefix("pulse2.") {
            return query_pulse(&self.pulse2, field);
        }
        let seq = &self.sequencer;
        match path {
            "cycle" => Some(seq.cycle().into()),
            "status" => Some(self.peek_status(0).into()),
            "irq" => Some(self.irq_pending().into()),
            "frame.mode" => Some(
                match seq.mode() {
                    FrameMode::FourStep => "4-step",
                    FrameMode::FiveStep => "5-step",
                }
                .into(),
            ),
            "frame.step" => Some(seq.step().into()),
            "frame.cycles" => Some(seq.step_cycles().into()),
            "frame.inhibit" => Some(seq.irq_inhibit().into()),
            "frame.pending" => Some(seq.is_switch_pending().into()),
            "frame.control" => Some(seq.control().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
