//! PL011 UART as a DMX512 line
//!
//! The receive side runs with the FIFO disabled so every character raises
//! its own interrupt and gets its own timestamp. The transmit side turns the
//! FIFO back on so the data phase is fed 32 bytes at a time.
//!
//! A break on the line shows up as one character with the break-error flag
//! set. It is reported as [`RxEvent::Break`] followed by the break character
//! itself as `Data(0x00)`.

use portable_atomic::{AtomicBool, Ordering};

use dmxio_hal::{DataBits, DmxUart, Interrupt, LineMode, Parity, RxEvent, StopBits, UartConfig};
use embassy_rp::pac;

/// PL011 FIFO depth
pub const UART_FIFO_DEPTH: usize = 32;

/// UART peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartId {
    Uart0,
    Uart1,
}

impl UartId {
    fn regs(self) -> pac::uart::Uart {
        match self {
            UartId::Uart0 => pac::UART0,
            UartId::Uart1 => pac::UART1,
        }
    }
}

/// Determine which UART can use a given GPIO pin
pub fn gpio_to_uart(gpio: u8) -> Option<UartId> {
    // UART0: GPIO 0/1, 12/13, 16/17, 28/29
    // UART1: GPIO 4/5, 8/9, 20/21, 24/25
    match gpio {
        0 | 1 | 12 | 13 | 16 | 17 | 28 | 29 => Some(UartId::Uart0),
        4 | 5 | 8 | 9 | 20 | 21 | 24 | 25 => Some(UartId::Uart1),
        _ => None,
    }
}

/// Integer and fractional baud rate divisors for `clock_hz`
pub fn baud_divisors(clock_hz: u32, baudrate: u32) -> (u16, u8) {
    let div = 8 * clock_hz / baudrate;
    let integer = div >> 7;

    if integer == 0 {
        (1, 0)
    } else if integer >= 0xFFFF {
        (0xFFFF, 0)
    } else {
        (integer as u16, (((div & 0x7F) + 1) / 2) as u8)
    }
}

/// One PL011 UART
pub struct DmxUartPort {
    id: UartId,
    clock_hz: u32,
    /// Break seen; the break character is delivered next
    break_pending: AtomicBool,
}

impl DmxUartPort {
    /// `clock_hz` is `clk_peri`; pins must already be muxed to the UART
    pub fn new(id: UartId, clock_hz: u32) -> Self {
        Self {
            id,
            clock_hz,
            break_pending: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> UartId {
        self.id
    }
}

impl DmxUart for DmxUartPort {
    fn configure(&self, config: &UartConfig) {
        let r = self.id.regs();
        let (integer, fraction) = baud_divisors(self.clock_hz, config.baudrate);

        r.uartcr().write(|w| w.set_uarten(false));
        r.uartibrd()
            .write_value(pac::uart::regs::Uartibrd(u32::from(integer)));
        r.uartfbrd()
            .write_value(pac::uart::regs::Uartfbrd(u32::from(fraction)));
        // LCR_H write latches the divisors
        r.uartlcr_h().write(|w| {
            w.set_wlen(match config.data_bits {
                DataBits::Seven => 0b10,
                DataBits::Eight => 0b11,
            });
            w.set_stp2(config.stop_bits == StopBits::Two);
            w.set_pen(config.parity != Parity::None);
            w.set_eps(config.parity == Parity::Even);
            w.set_fen(false);
        });
        r.uartifls().write(|w| {
            w.set_rxiflsel(0b000);
            w.set_txiflsel(0b000);
        });
        r.uartimsc().write(|_| {});
        r.uartcr().write(|w| {
            w.set_uarten(true);
            w.set_rxe(true);
            w.set_txe(true);
        });
    }

    fn set_mode(&self, mode: LineMode) {
        self.id
            .regs()
            .uartlcr_h()
            .modify(|w| w.set_fen(mode == LineMode::Transmit));
        self.break_pending.store(false, Ordering::Relaxed);
    }

    fn set_break(&self, asserted: bool) {
        self.id.regs().uartlcr_h().modify(|w| w.set_brk(asserted));
    }

    fn read_event(&self) -> Option<RxEvent> {
        if self.break_pending.swap(false, Ordering::Relaxed) {
            return Some(RxEvent::Data(0x00));
        }

        let r = self.id.regs();
        if r.uartfr().read().rxfe() {
            return None;
        }

        let dr = r.uartdr().read();
        if dr.be() {
            self.break_pending.store(true, Ordering::Relaxed);
            Some(RxEvent::Break)
        } else {
            Some(RxEvent::Data(dr.data()))
        }
    }

    fn tx_fifo_depth(&self) -> usize {
        UART_FIFO_DEPTH
    }

    fn tx_ready(&self) -> bool {
        !self.id.regs().uartfr().read().txff()
    }

    fn write_byte(&self, byte: u8) {
        self.id.regs().uartdr().write(|w| w.set_data(byte));
    }

    fn tx_complete(&self) -> bool {
        let fr = self.id.regs().uartfr().read();
        fr.txfe() && !fr.busy()
    }

    fn set_interrupt(&self, source: Interrupt, enabled: bool) {
        let r = self.id.regs();
        match source {
            Interrupt::Receive => r.uartimsc().modify(|w| {
                w.set_rxim(enabled);
                w.set_rtim(enabled);
            }),
            Interrupt::TransmitEmpty => r.uartimsc().modify(|w| w.set_txim(enabled)),
        }
    }
}
