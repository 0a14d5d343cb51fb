//! Errors raised while building a console.

use nes_bus::BusError;
use ricoh_apu_2a03::TimingError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NesError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("invalid frame timing: {0}")]
    Timing(#[from] TimingError),
}
