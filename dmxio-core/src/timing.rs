//! Transmit period computation
//!
//! ```text
//! │◄───────────────────────── period ──────────────────────────►│
//! ┌───────┬─────┬──────────────────────────────┬────────────────┐
//! │ BREAK │ MAB │ SC + slots (44 µs each)      │ inter-frame    │
//! └───────┴─────┴──────────────────────────────┴────────────────┘
//!                │◄────────────── remainder ──────────────────►│
//! ```
//!
//! The phase timer is armed with `remainder` when the data phase starts, so
//! its next expiry is the next break.

use dmxio_protocol::dmx::{package_length, BREAK_TO_BREAK_TIME_MIN, SLOT_TIME};

/// Shortest period that fits `package` microseconds of frame
pub fn minimum_period(package: u32) -> u32 {
    BREAK_TO_BREAK_TIME_MIN.max(package + SLOT_TIME)
}

/// Break-to-break period actually used
///
/// A requested period of 0, or one too short for the frame, falls back to
/// [`minimum_period`].
pub fn effective_period(requested: u32, package: u32) -> u32 {
    if requested != 0 && requested >= package {
        requested
    } else {
        minimum_period(package)
    }
}

/// Timer intervals for one transmit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseIntervals {
    pub break_time: u32,
    pub mab_time: u32,
    /// Effective break-to-break period
    pub period: u32,
    /// From the start of the data phase to the next break
    pub remainder: u32,
}

impl PhaseIntervals {
    /// Derive intervals for the longest frame (`length` bytes including the
    /// start code) sent by any port
    ///
    /// `break_time` and `mab_time` are expected to be clamped already.
    pub fn compute(break_time: u32, mab_time: u32, requested_period: u32, length: usize) -> Self {
        let package = package_length(break_time, mab_time, length);
        let period = effective_period(requested_period, package);

        Self {
            break_time,
            mab_time,
            period,
            remainder: period.saturating_sub(break_time + mab_time),
        }
    }
}
