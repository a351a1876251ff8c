//! Application-facing errors
//!
//! Interrupt paths never fail: malformed input is absorbed by resetting the
//! receiver, and transmit timing faults are latched per port instead.

/// Errors returned by the [`Dmx`](crate::Dmx) API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Port index beyond the configured port count
    InvalidPort,
    /// Send buffer longer than a full frame
    BufferTooLarge,
    /// Operation needs the port in output direction
    NotOutput,
    /// Operation needs the port in input direction
    NotInput,
    /// Port is running continuous or delta output
    PortBusy,
    /// Configuration could not be (de)serialized
    Serialization,
}
