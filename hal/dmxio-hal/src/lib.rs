//! dmxio Hardware Abstraction Layer
//!
//! This crate defines the small set of hardware capabilities the DMX512/RDM
//! core needs. Chip-specific crates implement them; the core only ever talks
//! to these traits, which is also what makes it testable on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  dmxio-core (state machines, rings)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  dmxio-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  dmxio-hal-   │       │  host mocks   │
//! │    rp2040     │       │  (tests)      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::DmxUart`] - Line control, receive events, transmit FIFO
//! - [`timer::OneShotTimer`], [`timer::MicrosClock`], [`timer::PeriodicTimer`] - Time base
//! - [`gpio::OutputPin`] - Transceiver direction line
//!
//! Methods on [`uart::DmxUart`] and the timers take `&self`: the same port is
//! touched from interrupt handlers and from the application loop, and the
//! implementations sit directly on memory-mapped registers.

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{DirectionPin, OutputPin};
pub use timer::{MicrosClock, OneShotTimer, PeriodicTimer};
pub use uart::{DataBits, DmxUart, Interrupt, LineMode, Parity, RxEvent, StopBits, UartConfig};

/// Everything one physical DMX port needs from the hardware
///
/// A port owns one UART plus one one-shot timer. The timer is shared between
/// the receive slot time-out and the transmit phase sequencing, since a port
/// is never receiving and transmitting at the same time.
pub trait PortHardware: DmxUart + OneShotTimer + MicrosClock {}

// Blanket implementation
impl<T: DmxUart + OneShotTimer + MicrosClock> PortHardware for T {}
