//! UART plus alarm as one DMX port

use dmxio_hal::{DmxUart, Interrupt, LineMode, MicrosClock, OneShotTimer, RxEvent, UartConfig};

use crate::timer::{Alarm, Micros};
use crate::uart::{DmxUartPort, UartId};

/// Hardware behind one DMX port
pub struct Rp2040Port {
    uart: DmxUartPort,
    alarm: Alarm,
}

impl Rp2040Port {
    /// `alarm` must be 1, 2 or 3 and unique per port
    pub fn new(uart: UartId, clock_hz: u32, alarm: Alarm) -> Self {
        Self {
            uart: DmxUartPort::new(uart, clock_hz),
            alarm,
        }
    }

    /// For `TIMER_IRQ_n` before forwarding to the port's timer entry point
    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    pub fn uart(&self) -> &DmxUartPort {
        &self.uart
    }
}

impl DmxUart for Rp2040Port {
    fn configure(&self, config: &UartConfig) {
        self.uart.configure(config);
    }

    fn set_mode(&self, mode: LineMode) {
        self.uart.set_mode(mode);
    }

    fn set_break(&self, asserted: bool) {
        self.uart.set_break(asserted);
    }

    fn read_event(&self) -> Option<RxEvent> {
        self.uart.read_event()
    }

    fn tx_fifo_depth(&self) -> usize {
        self.uart.tx_fifo_depth()
    }

    fn tx_ready(&self) -> bool {
        self.uart.tx_ready()
    }

    fn write_byte(&self, byte: u8) {
        self.uart.write_byte(byte);
    }

    fn tx_complete(&self) -> bool {
        self.uart.tx_complete()
    }

    fn set_interrupt(&self, source: Interrupt, enabled: bool) {
        self.uart.set_interrupt(source, enabled);
    }
}

impl OneShotTimer for Rp2040Port {
    fn arm(&self, micros: u32) {
        self.alarm.arm(micros);
    }

    fn disarm(&self) {
        self.alarm.disarm();
    }
}

impl MicrosClock for Rp2040Port {
    fn now_micros(&self) -> u32 {
        Micros.now_micros()
    }
}
