//! RP2040 implementation of the `dmxio-hal` traits
//!
//! - PL011 UART driven at register level for DMX512 framing and breaks
//! - TIMER alarms 1-3 as per-port one-shot timers and the statistics tick
//!   (alarm 0 belongs to the embassy time driver)
//! - Direction pins on `embassy_rp::gpio::Output`
//!
//! A port is a UART plus an alarm, bundled in [`Rp2040Port`]. The firmware
//! routes `UARTn_IRQ` and `TIMER_IRQ_n` to the port group's interrupt entry
//! points and clears the alarm with [`Alarm::clear`].

#![no_std]

pub mod gpio;
pub mod port;
pub mod timer;
pub mod uart;

pub use gpio::DirectionOutput;
pub use port::Rp2040Port;
pub use timer::{Alarm, Micros, StatisticsTimer};
pub use uart::{gpio_to_uart, DmxUartPort, UartId};
