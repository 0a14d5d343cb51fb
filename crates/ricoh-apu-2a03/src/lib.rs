//! Ricoh 2A03 APU.
//!
//! Models the frame sequencer and the two pulse channels cycle by cycle.
//! The APU is a [`Tickable`](emu_core::Tickable) ticked once per CPU cycle
//! after the CPU has run, and is wired onto the CPU bus with
//! [`apply_memory_map`].
//!
//! Region timing is data: [`FrameTiming::NTSC`] and [`FrameTiming::PAL`]
//! are built in, and with the `serde` feature a custom table can be
//! deserialised and checked with [`FrameTiming::validate`].

mod apu;
mod frame_sequencer;
mod memory_map;
mod pulse;
mod timing;

pub use apu::{Apu, REGISTER_COUNT, reg};
pub use frame_sequencer::{CONTROL_DELAY, FrameEvent, FrameMode, FrameSequencer};
pub use memory_map::{APU_BASE, DEVICE_NAME, apply_memory_map};
pub use pulse::{DUTY_SEQUENCES, Envelope, LENGTH_TABLE, LengthCounter, Negate, Pulse};
pub use timing::{FiveStepTiming, FourStepTiming, FrameTiming, SequenceKind, TimingError};
