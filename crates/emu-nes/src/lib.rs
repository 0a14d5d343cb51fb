//! NES board built from the cycle-stepped 2A03.
//!
//! The scheduler advances one CPU cycle per tick: the CPU runs one
//! micro-op, then the APU ticks, then the APU's IRQ line is fed back to the
//! CPU. Work RAM, the APU registers and an NROM cartridge are bound into a
//! 64K dispatch table; the PPU and controller ports are left as open bus.
//!
//! NTSC runs the CPU at crystal/12 (1,789,773 Hz) and PAL at crystal/16
//! (1,662,607 Hz).

mod board;
mod config;
mod error;
mod nes;
mod nrom;

pub use board::{Board, RAM_SIZE, install_ram};
pub use config::{NesConfig, NesRegion};
pub use error::NesError;
pub use nes::Nes;
pub use nrom::Nrom;
