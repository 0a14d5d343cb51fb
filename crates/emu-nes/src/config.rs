//! NES configuration.

use ricoh_apu_2a03::FrameTiming;

/// Console region. Selects the CPU clock and the frame sequencer table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NesRegion {
    /// NTSC: 1,789,773 Hz CPU.
    #[default]
    Ntsc,
    /// PAL: 1,662,607 Hz CPU.
    Pal,
}

impl NesRegion {
    /// Master crystal frequency in Hz.
    #[must_use]
    pub const fn crystal_hz(self) -> u64 {
        match self {
            Self::Ntsc => 21_477_272,
            Self::Pal => 26_601_712,
        }
    }

    /// Crystal ticks per CPU cycle.
    #[must_use]
    pub const fn cpu_divider(self) -> u64 {
        match self {
            Self::Ntsc => 12,
            Self::Pal => 16,
        }
    }

    /// CPU frequency in Hz.
    #[must_use]
    pub const fn cpu_hz(self) -> u32 {
        match self {
            Self::Ntsc => 1_789_773,
            Self::Pal => 1_662_607,
        }
    }

    /// The region's built-in frame sequencer table.
    #[must_use]
    pub const fn frame_timing(self) -> FrameTiming {
        match self {
            Self::Ntsc => FrameTiming::NTSC,
            Self::Pal => FrameTiming::PAL,
        }
    }
}

/// NES configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NesConfig {
    /// Defaults to NTSC.
    pub region: NesRegion,
    /// Replaces the region's frame sequencer table when set. Checked when
    /// the console is built.
    #[cfg_attr(feature = "serde", serde(default))]
    pub frame_timing: Option<FrameTiming>,
}

impl NesConfig {
    #[must_use]
    pub fn new(region: NesRegion) -> Self {
        Self {
            region,
            frame_timing: None,
        }
    }

    #[must_use]
    pub fn with_frame_timing(mut self, timing: FrameTiming) -> Self {
        self.frame_timing = Some(timing);
        self
    }

    /// The table the APU will run with.
    #[must_use]
    pub fn effective_timing(&self) -> FrameTiming {
        self.frame_timing
            .unwrap_or_else(|| self.region.frame_timing())
    }
}
