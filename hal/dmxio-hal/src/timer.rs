//! Time base abstractions
//!
//! Microsecond resolution is enough for DMX512: one slot is 44 µs and the
//! shortest mandated phase (mark-after-break) is 12 µs.

/// Free-running microsecond counter
///
/// The counter wraps at `u32::MAX`; always compare with `wrapping_sub`.
pub trait MicrosClock {
    /// Current counter value
    fn now_micros(&self) -> u32;

    /// Microseconds elapsed since `start`
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now_micros().wrapping_sub(start)
    }

    /// Spin until `micros` have passed since `start`
    fn delay_from(&self, start: u32, micros: u32) {
        while self.elapsed_since(start) < micros {
            core::hint::spin_loop();
        }
    }

    /// Spin for `micros`
    fn delay_us(&self, micros: u32) {
        let start = self.now_micros();
        self.delay_from(start, micros);
    }
}

/// Per-port one-shot timer
///
/// Expiry raises the port's timer interrupt, which the firmware routes to
/// the core's timer entry point.
pub trait OneShotTimer {
    /// Fire once, `micros` from now; re-arming replaces any pending expiry
    fn arm(&self, micros: u32);

    /// Cancel a pending expiry
    fn disarm(&self);
}

/// Periodic timer driving the statistics tick
pub trait PeriodicTimer {
    /// Start firing every `period_us`
    fn start_periodic(&mut self, period_us: u32);
}
