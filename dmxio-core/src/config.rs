//! Port and transmit configuration
//!
//! Plain data pushed into a running [`Dmx`](crate::Dmx) with
//! [`apply_config`](crate::Dmx::apply_config). With the `serde` feature the
//! whole [`DmxConfig`] round-trips through postcard so product code can keep
//! it in flash.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use dmxio_protocol::dmx::{
    BREAK_TIME_MIN, BREAK_TIME_TYPICAL, DMX_MAX_SLOTS, MAB_TIME_MIN, TRANSMIT_PERIOD_DEFAULT,
};

/// Largest number of ports a single engine drives
pub const MAX_PORTS: usize = 8;

/// Role of a physical port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Direction {
    #[default]
    Input = 0,
    Output = 1,
}

impl Direction {
    pub(crate) fn from_u8(value: u8) -> Self {
        if value == Direction::Output as u8 {
            Direction::Output
        } else {
            Direction::Input
        }
    }
}

/// When an output port sends frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OutputStyle {
    /// One frame per [`start_output`](crate::Dmx::start_output) or
    /// [`sync`](crate::Dmx::sync)
    Delta = 0,
    /// Back-to-back frames at the effective period
    #[default]
    Continuous = 1,
}

impl OutputStyle {
    pub(crate) fn from_u8(value: u8) -> Self {
        if value == OutputStyle::Delta as u8 {
            OutputStyle::Delta
        } else {
            OutputStyle::Continuous
        }
    }
}

/// Requested transmit timing, in microseconds
///
/// Values below the line minimums are clamped when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransmitTiming {
    pub break_time: u32,
    pub mab_time: u32,
    /// Break-to-break period; 0 selects the shortest period the frame allows
    pub period: u32,
}

impl TransmitTiming {
    pub const fn new() -> Self {
        Self {
            break_time: BREAK_TIME_TYPICAL,
            mab_time: MAB_TIME_MIN,
            period: TRANSMIT_PERIOD_DEFAULT,
        }
    }

    /// Same timing with break and MAB raised to their minimums
    pub fn clamped(self) -> Self {
        Self {
            break_time: self.break_time.max(BREAK_TIME_MIN),
            mab_time: self.mab_time.max(MAB_TIME_MIN),
            period: self.period,
        }
    }
}

impl Default for TransmitTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-port settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    pub direction: Direction,
    pub output_style: OutputStyle,
    /// Start receiving or transmitting right away
    pub enable: bool,
}

impl PortConfig {
    pub const fn input() -> Self {
        Self {
            direction: Direction::Input,
            output_style: OutputStyle::Continuous,
            enable: true,
        }
    }

    pub const fn output(output_style: OutputStyle) -> Self {
        Self {
            direction: Direction::Output,
            output_style,
            enable: true,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmxConfig {
    pub timing: TransmitTiming,
    /// Maximum slots sent per frame (2..=512)
    pub slots: u16,
    /// Settings for ports 0..len; remaining ports are left untouched
    pub ports: Vec<PortConfig, MAX_PORTS>,
}

impl DmxConfig {
    pub const fn new() -> Self {
        Self {
            timing: TransmitTiming::new(),
            slots: DMX_MAX_SLOTS as u16,
            ports: Vec::new(),
        }
    }

    /// Serialize into `buffer`, returning the number of bytes used
    #[cfg(feature = "serde")]
    pub fn to_bytes(&self, buffer: &mut [u8]) -> Result<usize, crate::Error> {
        postcard::to_slice(self, buffer)
            .map(|used| used.len())
            .map_err(|_| crate::Error::Serialization)
    }

    /// Deserialize from postcard bytes
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::Error> {
        postcard::from_bytes(bytes).map_err(|_| crate::Error::Serialization)
    }
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = TransmitTiming::default();
        assert_eq!(timing.break_time, 176);
        assert_eq!(timing.mab_time, 12);
        assert_eq!(timing.period, 0);
    }

    #[test]
    fn test_timing_clamped() {
        let timing = TransmitTiming {
            break_time: 10,
            mab_time: 1,
            period: 500,
        }
        .clamped();
        assert_eq!(timing.break_time, BREAK_TIME_MIN);
        assert_eq!(timing.mab_time, MAB_TIME_MIN);
        // Period depends on the frame length, resolved elsewhere
        assert_eq!(timing.period, 500);
    }

    #[test]
    fn test_enum_bytes() {
        assert_eq!(Direction::from_u8(Direction::Output as u8), Direction::Output);
        assert_eq!(Direction::from_u8(0), Direction::Input);
        assert_eq!(OutputStyle::from_u8(OutputStyle::Delta as u8), OutputStyle::Delta);
        assert_eq!(OutputStyle::default(), OutputStyle::Continuous);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_postcard_roundtrip() {
        let mut config = DmxConfig::new();
        config.slots = 128;
        config.timing.period = 25_000;
        config.ports.push(PortConfig::input()).unwrap();
        config
            .ports
            .push(PortConfig::output(OutputStyle::Delta))
            .unwrap();

        let mut buffer = [0u8; 64];
        let len = config.to_bytes(&mut buffer).unwrap();
        let decoded = DmxConfig::from_bytes(&buffer[..len]).unwrap();
        assert_eq!(decoded, config);
    }
}
