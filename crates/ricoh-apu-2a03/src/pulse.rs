//! Pulse channels and the units they share with the frame sequencer.

/// Length counter load values, indexed by bits 7-3 of `$4003`/`$4007`.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96,
    22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Duty sequences, read LSB first: 12.5%, 25%, 50% and 75% (inverted 25%).
pub const DUTY_SEQUENCES: [u8; 4] = [0b0000_0001, 0b0000_0011, 0b0000_1111, 0b1111_1100];

/// Timer periods above this are out of range for the 11-bit timer.
const MAX_PERIOD: u16 = 0x7FF;

/// Decay envelope, clocked on quarter frames.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    start: bool,
    divider: u8,
    decay: u8,
    /// Constant volume, or the divider period when decaying.
    volume: u8,
    constant: bool,
    looping: bool,
}

impl Envelope {
    fn write(&mut self, value: u8) {
        self.looping = value & 0x20 != 0;
        self.constant = value & 0x10 != 0;
        self.volume = value & 0x0F;
    }

    fn restart(&mut self) {
        self.start = true;
    }

    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider == 0 {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }

    /// Output level, 0-15.
    #[must_use]
    pub fn output(&self) -> u8 {
        if self.constant {
            self.volume
        } else {
            self.decay
        }
    }
}

/// Counts down on half frames and silences the channel at zero.
#[derive(Debug, Clone, Default)]
pub struct LengthCounter {
    counter: u8,
    halt: bool,
    enabled: bool,
}

impl LengthCounter {
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    #[must_use]
    pub fn counter(&self) -> u8 {
        self.counter
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.counter > 0
    }

    /// Loads are ignored while the channel is disabled in `$4015`.
    fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[usize::from(index & 0x1F)];
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }
}

/// How the sweep unit negates its change amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negate {
    /// Pulse 1: `period - change - 1`.
    OnesComplement,
    /// Pulse 2: `period - change`.
    TwosComplement,
}

/// Period sweep, clocked on half frames.
#[derive(Debug, Clone)]
pub struct Sweep {
    enabled: bool,
    negate: bool,
    shift: u8,
    period: u8,
    divider: u8,
    reload: bool,
    mode: Negate,
}

impl Sweep {
    fn new(mode: Negate) -> Self {
        Self {
            enabled: false,
            negate: false,
            shift: 0,
            period: 0,
            divider: 0,
            reload: false,
            mode,
        }
    }

    fn write(&mut self, value: u8) {
        self.enabled = value & 0x80 != 0;
        self.period = (value >> 4) & 0x07;
        self.negate = value & 0x08 != 0;
        self.shift = value & 0x07;
        self.reload = true;
    }

    fn target(&self, period: u16) -> u16 {
        let change = period >> self.shift;
        match (self.negate, self.mode) {
            (false, _) => period.wrapping_add(change),
            (true, Negate::OnesComplement) => period.wrapping_sub(change).wrapping_sub(1),
            (true, Negate::TwosComplement) => period.wrapping_sub(change),
        }
    }

    /// The channel is muted when the period is too short or the sweep
    /// target overflows, whether or not the sweep is enabled.
    #[must_use]
    pub fn mutes(&self, period: u16) -> bool {
        period < 8 || self.target(period) > MAX_PERIOD
    }

    /// Returns the timer period after this clock.
    fn clock(&mut self, period: u16) -> u16 {
        let mut next = period;
        if self.divider == 0 && self.enabled && self.shift > 0 && !self.mutes(period) {
            next = self.target(period);
        }
        if self.divider == 0 || self.reload {
            self.divider = self.period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }
        next
    }
}

/// One square-wave channel.
///
/// [`clock`](Self::clock) is the generator step: it is called on even CPU
/// cycles only and returns the duty bit of the phase it was called on.
#[derive(Debug, Clone)]
pub struct Pulse {
    duty: u8,
    sequence: u8,
    phase: u8,
    timer: u16,
    period: u16,
    bit: u8,
    envelope: Envelope,
    length: LengthCounter,
    sweep: Sweep,
}

impl Pulse {
    #[must_use]
    pub fn new(negate: Negate) -> Self {
        Self {
            duty: 0,
            sequence: DUTY_SEQUENCES[0],
            phase: 0,
            timer: 0,
            period: 0,
            bit: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep: Sweep::new(negate),
        }
    }

    /// `$4000`/`$4004`: duty, length halt / envelope loop, constant
    /// volume, volume.
    pub fn write_control(&mut self, value: u8) {
        self.set_duty(value >> 6);
        self.length.halt = value & 0x20 != 0;
        self.envelope.write(value);
    }

    /// `$4001`/`$4005`.
    pub fn write_sweep(&mut self, value: u8) {
        self.sweep.write(value);
    }

    /// `$4002`/`$4006`.
    pub fn write_timer_low(&mut self, value: u8) {
        self.period = (self.period & 0x0700) | u16::from(value);
    }

    /// `$4003`/`$4007`: timer high bits and length load. Restarts the
    /// sequence at phase 0 and the envelope.
    pub fn write_timer_high(&mut self, value: u8) {
        self.period = (self.period & 0x00FF) | (u16::from(value & 0x07) << 8);
        self.length.load(value >> 3);
        self.envelope.restart();
        self.phase = 0;
    }

    /// Select one of the four duty sequences.
    pub fn set_duty(&mut self, duty: u8) {
        self.duty = duty & 0x03;
        self.sequence = DUTY_SEQUENCES[usize::from(self.duty)];
    }

    /// Set the 11-bit timer period directly.
    pub fn set_period(&mut self, period: u16) {
        self.period = period & MAX_PERIOD;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    /// Emit the duty bit at the current phase, then run the timer. An
    /// expired timer reloads from the period and advances the phase.
    pub fn clock(&mut self) -> u8 {
        self.bit = (self.sequence >> self.phase) & 1;
        if self.timer == 0 {
            self.timer = self.period;
            self.phase = (self.phase + 1) & 7;
        } else {
            self.timer -= 1;
        }
        self.bit
    }

    pub fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_half_frame(&mut self) {
        self.length.clock();
        self.period = self.sweep.clock(self.period);
    }

    /// Volume the channel drives into the mixer, 0-15.
    #[must_use]
    pub fn output(&self) -> u8 {
        if self.bit == 0 || !self.length.is_active() || self.sweep.mutes(self.period) {
            0
        } else {
            self.envelope.output()
        }
    }

    #[must_use]
    pub fn duty(&self) -> u8 {
        self.duty
    }

    #[must_use]
    pub fn phase(&self) -> u8 {
        self.phase
    }

    #[must_use]
    pub fn period(&self) -> u16 {
        self.period
    }

    #[must_use]
    pub fn timer(&self) -> u16 {
        self.timer
    }

    #[must_use]
    pub fn length(&self) -> &LengthCounter {
        &self.length
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Put the generator back at phase 0 with the timer cleared. Register
    /// state is kept.
    pub fn restart_sequence(&mut self) {
        self.phase = 0;
        self.timer = 0;
        self.bit = 0;
    }
}
