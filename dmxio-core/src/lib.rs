//! Board-agnostic DMX512 / RDM transceiver core
//!
//! Interrupt-driven receive and transmit state machines that sit between a
//! UART-based DMX512 line and whatever protocol node runs above it:
//!
//! - Receive state machine with slot time-out (DMX, RDM, discovery responses)
//! - Transmit state machine with break / MAB / data / inter-frame phases
//! - Lock-free frame rings from interrupt to application
//! - Transmit period computation
//! - Port direction control and the application API ([`Dmx`])
//!
//! Hardware is reached only through the `dmxio-hal` traits, so everything
//! here runs on the host against a mock port.
//!
//! # Wiring
//!
//! ```ignore
//! static PORTS: StaticCell<Ports<Rp2040Port, 2>> = StaticCell::new();
//!
//! let ports = PORTS.init(Ports::new([port0, port1]));
//! let mut dmx = Dmx::new(ports, [dir0, dir1]);
//! dmx.init(&mut statistics_timer);
//! dmx.set_port_direction(0, Direction::Input, true)?;
//! dmx.set_port_direction(1, Direction::Output, true)?;
//!
//! loop {
//!     if let Some(frame) = dmx.dmx_changed(0)? {
//!         dmx.set_send_data(1, frame.data())?;
//!     }
//! }
//! ```
//!
//! The UART, port timer and statistics timer interrupts call
//! [`Ports::on_uart_interrupt`], [`Ports::on_port_timer`] and
//! [`Ports::on_statistics_tick`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod dmx;
pub mod error;
pub mod port;
pub mod receive;
pub mod ring;
pub mod statistics;
pub mod timing;
pub mod transmit;

#[cfg(test)]
mod mock;

pub use config::{Direction, DmxConfig, OutputStyle, PortConfig, TransmitTiming, MAX_PORTS};
pub use dmx::Dmx;
pub use error::Error;
pub use port::{Activity, Port, Ports};
pub use receive::RxState;
pub use ring::{DmxFrame, Frame, FrameStatistics, RdmFrame};
pub use statistics::TotalStatistics;
pub use transmit::TxState;
