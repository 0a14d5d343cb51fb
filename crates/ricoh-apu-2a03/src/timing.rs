//! Frame sequencer thresholds per region.
//!
//! All values are CPU cycles counted from the start of the sequence. The
//! hardware places the steps on half APU cycles (3728.5, 7456.5, ...), so
//! doubling them gives whole CPU cycles.

use thiserror::Error;

/// Thresholds for the 4-step (IRQ generating) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourStepTiming {
    /// Steps 0-2: quarter, quarter + half, quarter.
    pub steps: [u32; 3],
    /// First of the three cycles that raise the frame IRQ.
    pub irq_start: u32,
    /// Quarter + half frame clock of the last step.
    pub clock: u32,
    /// The sequence wraps to step 0 on this cycle.
    pub wrap: u32,
}

/// Thresholds for the 5-step sequence, which never raises an IRQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiveStepTiming {
    /// Steps 0-3: quarter, quarter + half, quarter, nothing.
    pub steps: [u32; 4],
    /// Quarter + half frame clock of the last step.
    pub clock: u32,
    pub wrap: u32,
}

/// A region's complete frame sequencer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameTiming {
    pub four_step: FourStepTiming,
    pub five_step: FiveStepTiming,
}

/// Sequence a threshold belongs to, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    FourStep,
    FiveStep,
}

impl std::fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FourStep => "4-step",
            Self::FiveStep => "5-step",
        })
    }
}

/// A timing table the sequencer cannot run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("{sequence} sequence: first threshold must be at least 1")]
    ZeroStep { sequence: SequenceKind },

    #[error(
        "{sequence} sequence: threshold {index} ({value}) does not follow the previous one ({previous})"
    )]
    NotIncreasing {
        sequence: SequenceKind,
        index: usize,
        previous: u32,
        value: u32,
    },
}

impl FrameTiming {
    /// NTSC 2A03.
    pub const NTSC: Self = Self {
        four_step: FourStepTiming {
            steps: [7457, 14913, 22371],
            irq_start: 29828,
            clock: 29829,
            wrap: 29830,
        },
        five_step: FiveStepTiming {
            steps: [7457, 14913, 22371, 29829],
            clock: 37281,
            wrap: 37282,
        },
    };

    /// PAL 2A07.
    pub const PAL: Self = Self {
        four_step: FourStepTiming {
            steps: [8313, 16627, 24939],
            irq_start: 33252,
            clock: 33253,
            wrap: 33254,
        },
        five_step: FiveStepTiming {
            steps: [8313, 16627, 24939, 33253],
            clock: 41565,
            wrap: 41566,
        },
    };

    /// Check that both sequences are strictly increasing and start after
    /// cycle 0. The sequencer compares each threshold for equality once,
    /// so an out-of-order table would stall it on one step forever.
    pub fn validate(&self) -> Result<(), TimingError> {
        let four = self.four_step;
        check(
            SequenceKind::FourStep,
            &[
                four.steps[0],
                four.steps[1],
                four.steps[2],
                four.irq_start,
                four.clock,
                four.wrap,
            ],
        )?;
        let five = self.five_step;
        check(
            SequenceKind::FiveStep,
            &[
                five.steps[0],
                five.steps[1],
                five.steps[2],
                five.steps[3],
                five.clock,
                five.wrap,
            ],
        )
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::NTSC
    }
}

fn check(sequence: SequenceKind, thresholds: &[u32]) -> Result<(), TimingError> {
    if thresholds.first().is_some_and(|&first| first == 0) {
        return Err(TimingError::ZeroStep { sequence });
    }
    for (index, pair) in thresholds.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(TimingError::NotIncreasing {
                sequence,
                index: index + 1,
                previous: pair[0],
                value: pair[1],
            });
        }
    }
    Ok(())
}
