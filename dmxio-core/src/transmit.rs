//! Transmit state machine
//!
//! Sequenced by the port's one-shot timer; the data phase is fed from the
//! UART transmit-FIFO-empty interrupt.
//!
//! ```text
//!   InterFrame ──timer──► Break ──timer──► MarkAfterBreak ──timer──► Data
//!        ▲                                                            │
//!        └──────────── FIFO drained (continuous) ─────────────────────┤
//!   Idle ◄─────────────── FIFO drained (delta) ───────────────────────┘
//! ```
//!
//! In continuous style the timer is re-armed with the rest of the period when
//! the data phase starts, so its next expiry is the next break. The timer
//! only ever starts a break from `InterFrame`; a parked (`Idle`) transmitter
//! is restarted by the application.

use portable_atomic::Ordering;

use dmxio_hal::{Interrupt, PortHardware};
use dmxio_protocol::dmx::SLOT_TIME;

use crate::config::OutputStyle;
use crate::port::{Port, Shared};
use crate::statistics::PortCounters;

/// Transmit state machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TxState {
    /// Parked until the application starts a frame
    Idle = 0,
    /// Between frames, next break pending on the timer
    InterFrame,
    Break,
    MarkAfterBreak,
    Data,
}

impl TxState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TxState::InterFrame,
            2 => TxState::Break,
            3 => TxState::MarkAfterBreak,
            4 => TxState::Data,
            _ => TxState::Idle,
        }
    }

    /// No frame on the wire; the send buffer may be rewritten
    pub fn is_boundary(self) -> bool {
        matches!(self, TxState::Idle | TxState::InterFrame)
    }
}

impl<H: PortHardware> Port<H> {
    pub fn transmit_state(&self) -> TxState {
        TxState::from_u8(self.tx_state.load(Ordering::Acquire))
    }

    fn set_tx_state(&self, state: TxState) {
        self.tx_state.store(state as u8, Ordering::Release);
    }

    /// Start a frame from the application side
    pub(crate) fn begin_frame(&self, shared: &Shared) {
        self.hw.set_break(true);
        self.set_tx_state(TxState::Break);
        self.hw.arm(shared.break_time.load(Ordering::Relaxed));
    }

    /// Phase timer expiry
    pub(crate) fn transmit_timer(&self, shared: &Shared) {
        match self.transmit_state() {
            TxState::InterFrame => {
                self.hw.set_break(true);
                self.set_tx_state(TxState::Break);
                self.hw.arm(shared.break_time.load(Ordering::Relaxed));
            }
            TxState::Break => {
                self.hw.set_break(false);
                self.set_tx_state(TxState::MarkAfterBreak);
                self.hw.arm(shared.mab_time.load(Ordering::Relaxed));
            }
            TxState::MarkAfterBreak => {
                if self.output_style() == OutputStyle::Continuous {
                    self.hw.arm(shared.remainder.load(Ordering::Relaxed));
                }
                self.tx_index.store(0, Ordering::Relaxed);
                self.set_tx_state(TxState::Data);

                if self.fill_fifo() {
                    self.finish_frame(shared);
                } else {
                    shared.busy.fetch_or(self.bit(), Ordering::AcqRel);
                    self.hw.set_interrupt(Interrupt::TransmitEmpty, true);
                }
            }
            TxState::Data => self.period_overrun(shared),
            TxState::Idle => {}
        }
    }

    /// Transmit-FIFO-empty interrupt
    pub(crate) fn transmit_fifo_empty(&self, shared: &Shared) {
        if self.transmit_state() != TxState::Data {
            self.hw.set_interrupt(Interrupt::TransmitEmpty, false);
            return;
        }

        if self.fill_fifo() {
            self.finish_frame(shared);
        }
    }

    /// Queue up to one FIFO's worth of bytes; `true` once the frame is queued
    fn fill_fifo(&self) -> bool {
        let length = usize::from(self.tx_length.load(Ordering::Acquire));
        let mut index = usize::from(self.tx_index.load(Ordering::Relaxed));
        let mut room = self.hw.tx_fifo_depth();

        while room > 0 && index < length && self.hw.tx_ready() {
            self.hw
                .write_byte(self.tx_buffer[index].load(Ordering::Relaxed));
            index += 1;
            room -= 1;
        }

        self.tx_index.store(index as u16, Ordering::Relaxed);
        index >= length
    }

    fn finish_frame(&self, shared: &Shared) {
        self.hw.set_interrupt(Interrupt::TransmitEmpty, false);
        shared.busy.fetch_and(!self.bit(), Ordering::AcqRel);
        PortCounters::bump(&self.counters.dmx_sent);

        match self.output_style() {
            OutputStyle::Continuous => self.set_tx_state(TxState::InterFrame),
            OutputStyle::Delta => self.set_tx_state(TxState::Idle),
        }
    }

    /// The next break is due while the data phase is still running
    fn period_overrun(&self, shared: &Shared) {
        if !self.tx_fault.swap(true, Ordering::AcqRel) {
            error!(
                "port {}: output period too short ({} bytes, stopped at {})",
                self.index,
                self.tx_length.load(Ordering::Relaxed),
                self.tx_index.load(Ordering::Relaxed)
            );
        }
        PortCounters::bump(&self.counters.transmit_faults);

        self.hw.set_interrupt(Interrupt::TransmitEmpty, false);
        shared.busy.fetch_and(!self.bit(), Ordering::AcqRel);
        self.set_tx_state(TxState::InterFrame);
        // Bytes already queued drain before the next break
        self.hw.arm(self.hw.tx_fifo_depth() as u32 * SLOT_TIME);
    }

    /// Spin until no frame is on the wire, then park the transmitter
    pub(crate) fn wait_transmit_boundary(&self) {
        loop {
            match self.transmit_state() {
                TxState::Idle => break,
                TxState::InterFrame => {
                    if self
                        .tx_state
                        .compare_exchange(
                            TxState::InterFrame as u8,
                            TxState::Idle as u8,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        break;
                    }
                }
                _ => core::hint::spin_loop(),
            }
        }

        while !self.hw.tx_complete() {
            core::hint::spin_loop();
        }
    }

    /// Spin until the send buffer may be rewritten
    pub(crate) fn wait_send_buffer(&self) {
        while !self.transmit_state().is_boundary() {
            core::hint::spin_loop();
        }
    }

    /// Returns and clears the latched period-overrun flag
    pub fn take_fault(&self) -> bool {
        self.tx_fault.swap(false, Ordering::AcqRel)
    }
}
