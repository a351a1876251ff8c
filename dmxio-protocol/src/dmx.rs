//! DMX512 line constants
//!
//! Times are in microseconds at the fixed 250 kbaud line rate.

/// Start code of a dimmer-data packet
pub const DMX_START_CODE: u8 = 0x00;

/// Data slots in a full universe
pub const DMX_MAX_SLOTS: usize = 512;

/// Start code plus a full universe
pub const DMX_FRAME_SIZE: usize = 1 + DMX_MAX_SLOTS;

/// Smallest slot count accepted for transmit
pub const DMX_MIN_SLOTS: usize = 2;

/// One 11-bit character (start, 8 data, 2 stop) at 250 kbaud
pub const SLOT_TIME: u32 = 44;

/// Shortest break a transmitter may produce
pub const BREAK_TIME_MIN: u32 = 92;

/// Break length used unless configured otherwise
pub const BREAK_TIME_TYPICAL: u32 = 176;

/// Shortest mark-after-break a transmitter may produce
pub const MAB_TIME_MIN: u32 = 12;

/// Shortest allowed break-to-break interval
pub const BREAK_TO_BREAK_TIME_MIN: u32 = 1204;

/// Requested period meaning "as fast as the frame allows"
pub const TRANSMIT_PERIOD_DEFAULT: u32 = 0;

/// Receive-side margin added to the slot-to-slot time before a frame is
/// considered finished
pub const SLOT_TIMEOUT_GUARD: u32 = 12;

/// Time on the wire for break + MAB + `length` characters
///
/// `length` counts the start code.
pub const fn package_length(break_time: u32, mab_time: u32, length: usize) -> u32 {
    break_time + mab_time + (length as u32) * SLOT_TIME
}
