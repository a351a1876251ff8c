//! Per-port packet counters
//!
//! Counters are monotonic and wrap. Each one has a single writer (the
//! interrupt that sees the event, or the application for raw RDM sends); the
//! application reads them through a [`TotalStatistics`] snapshot.

use portable_atomic::{AtomicU32, Ordering};

/// DMX512 frame counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmxStatistics {
    pub sent: u32,
    pub received: u32,
}

/// RDM message counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RdmStatistics {
    /// Messages with a valid checksum and sub-start code
    pub received_good: u32,
    /// Messages that failed the checksum or sub-start code check
    pub received_bad: u32,
    pub received_discovery_response: u32,
    pub sent_class: u32,
    pub sent_discovery_response: u32,
}

/// Snapshot of every counter of one port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TotalStatistics {
    pub dmx: DmxStatistics,
    pub rdm: RdmStatistics,
    /// Phase timer expiries that found the data phase still running
    pub transmit_faults: u32,
}

/// Live counters, shared between interrupts and the application
pub(crate) struct PortCounters {
    pub dmx_sent: AtomicU32,
    pub dmx_received: AtomicU32,
    pub rdm_received_good: AtomicU32,
    pub rdm_received_bad: AtomicU32,
    pub rdm_received_discovery: AtomicU32,
    pub rdm_sent_class: AtomicU32,
    pub rdm_sent_discovery: AtomicU32,
    pub transmit_faults: AtomicU32,
    updates_per_second: AtomicU32,
    received_at_last_tick: AtomicU32,
}

impl PortCounters {
    pub const fn new() -> Self {
        Self {
            dmx_sent: AtomicU32::new(0),
            dmx_received: AtomicU32::new(0),
            rdm_received_good: AtomicU32::new(0),
            rdm_received_bad: AtomicU32::new(0),
            rdm_received_discovery: AtomicU32::new(0),
            rdm_sent_class: AtomicU32::new(0),
            rdm_sent_discovery: AtomicU32::new(0),
            transmit_faults: AtomicU32::new(0),
            updates_per_second: AtomicU32::new(0),
            received_at_last_tick: AtomicU32::new(0),
        }
    }

    /// Add one to a counter owned by the caller's context
    pub fn bump(counter: &AtomicU32) {
        let value = counter.load(Ordering::Relaxed);
        counter.store(value.wrapping_add(1), Ordering::Relaxed);
    }

    /// 1 Hz tick: frames received since the previous tick
    pub fn tick(&self) {
        let received = self.dmx_received.load(Ordering::Relaxed);
        let previous = self.received_at_last_tick.swap(received, Ordering::Relaxed);
        self.updates_per_second
            .store(received.wrapping_sub(previous), Ordering::Relaxed);
    }

    pub fn updates_per_second(&self) -> u32 {
        self.updates_per_second.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TotalStatistics {
        TotalStatistics {
            dmx: DmxStatistics {
                sent: self.dmx_sent.load(Ordering::Relaxed),
                received: self.dmx_received.load(Ordering::Relaxed),
            },
            rdm: RdmStatistics {
                received_good: self.rdm_received_good.load(Ordering::Relaxed),
                received_bad: self.rdm_received_bad.load(Ordering::Relaxed),
                received_discovery_response: self.rdm_received_discovery.load(Ordering::Relaxed),
                sent_class: self.rdm_sent_class.load(Ordering::Relaxed),
                sent_discovery_response: self.rdm_sent_discovery.load(Ordering::Relaxed),
            },
            transmit_faults: self.transmit_faults.load(Ordering::Relaxed),
        }
    }
}
