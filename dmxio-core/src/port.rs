//! Per-port interrupt context
//!
//! Everything an interrupt handler touches lives in a [`Port`] as atomics, so
//! handlers and the application share it through `&Port` without locks. Ports
//! are grouped in [`Ports`], which also owns the state common to all of them:
//! the "transmitting" bitmask and the transmit phase intervals.
//!
//! The firmware places one `Ports` in a static and forwards interrupts to it:
//!
//! ```ignore
//! #[interrupt]
//! fn UART0_IRQ() {
//!     PORTS.on_uart_interrupt(0);
//! }
//! ```

use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use dmxio_hal::{Interrupt, LineMode, PortHardware};
use dmxio_protocol::{DMX_FRAME_SIZE, RDM_FRAME_SIZE};

use crate::config::{Direction, OutputStyle, MAX_PORTS};
use crate::receive::RxState;
use crate::ring::{FrameRing, DMX_RING_ENTRIES, RDM_RING_ENTRIES};
use crate::statistics::{PortCounters, TotalStatistics};
use crate::transmit::TxState;

/// What a port is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Activity {
    Idle = 0,
    Receiving = 1,
    Transmitting = 2,
}

impl Activity {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Activity::Receiving,
            2 => Activity::Transmitting,
            _ => Activity::Idle,
        }
    }
}

/// State shared by every port of a group
pub(crate) struct Shared {
    /// Bit `n` set while port `n` streams its data phase
    pub busy: AtomicU32,
    pub break_time: AtomicU32,
    pub mab_time: AtomicU32,
    /// Data phase start to next break
    pub remainder: AtomicU32,
}

/// One physical DMX port
pub struct Port<H> {
    pub(crate) hw: H,
    pub(crate) index: u8,
    pub(crate) direction: AtomicU8,
    pub(crate) activity: AtomicU8,
    pub(crate) counters: PortCounters,

    // Receive side, written by the receive interrupt
    pub(crate) rx_state: AtomicU8,
    pub(crate) rx_index: AtomicU16,
    /// Index at which the current discovery phase ends
    pub(crate) rx_target: AtomicU16,
    pub(crate) rx_checksum: AtomicU16,
    pub(crate) rx_last_event_at: AtomicU32,
    pub(crate) rx_slot_to_slot: AtomicU32,
    pub(crate) rx_break_at: AtomicU32,
    pub(crate) rx_previous_break_at: AtomicU32,
    pub(crate) rx_has_previous_break: AtomicBool,
    pub(crate) rdm_received_at: AtomicU32,
    pub(crate) dmx_ring: FrameRing<DMX_FRAME_SIZE, DMX_RING_ENTRIES>,
    pub(crate) rdm_ring: FrameRing<RDM_FRAME_SIZE, RDM_RING_ENTRIES>,

    // Transmit side
    pub(crate) tx_state: AtomicU8,
    pub(crate) tx_style: AtomicU8,
    pub(crate) tx_buffer: [AtomicU8; DMX_FRAME_SIZE],
    pub(crate) tx_length: AtomicU16,
    pub(crate) tx_index: AtomicU16,
    pub(crate) tx_pending: AtomicBool,
    pub(crate) tx_fault: AtomicBool,
}

impl<H: PortHardware> Port<H> {
    pub fn new(index: u8, hw: H) -> Self {
        Self {
            hw,
            index,
            direction: AtomicU8::new(Direction::Input as u8),
            activity: AtomicU8::new(Activity::Idle as u8),
            counters: PortCounters::new(),
            rx_state: AtomicU8::new(RxState::Idle as u8),
            rx_index: AtomicU16::new(0),
            rx_target: AtomicU16::new(0),
            rx_checksum: AtomicU16::new(0),
            rx_last_event_at: AtomicU32::new(0),
            rx_slot_to_slot: AtomicU32::new(0),
            rx_break_at: AtomicU32::new(0),
            rx_previous_break_at: AtomicU32::new(0),
            rx_has_previous_break: AtomicBool::new(false),
            rdm_received_at: AtomicU32::new(0),
            dmx_ring: FrameRing::new(),
            rdm_ring: FrameRing::new(),
            tx_state: AtomicU8::new(TxState::Idle as u8),
            tx_style: AtomicU8::new(OutputStyle::Continuous as u8),
            // Start code followed by a blacked-out universe
            tx_buffer: [const { AtomicU8::new(0) }; DMX_FRAME_SIZE],
            tx_length: AtomicU16::new(DMX_FRAME_SIZE as u16),
            tx_index: AtomicU16::new(0),
            tx_pending: AtomicBool::new(false),
            tx_fault: AtomicBool::new(false),
        }
    }

    /// Hardware handle, for the application's own polling
    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn index(&self) -> usize {
        usize::from(self.index)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_u8(self.direction.load(Ordering::Acquire))
    }

    pub fn activity(&self) -> Activity {
        Activity::from_u8(self.activity.load(Ordering::Acquire))
    }

    pub fn output_style(&self) -> OutputStyle {
        OutputStyle::from_u8(self.tx_style.load(Ordering::Relaxed))
    }

    pub fn statistics(&self) -> TotalStatistics {
        self.counters.snapshot()
    }

    pub fn updates_per_second(&self) -> u32 {
        self.counters.updates_per_second()
    }

    pub(crate) fn bit(&self) -> u32 {
        1 << self.index
    }

    pub(crate) fn set_direction(&self, direction: Direction) {
        self.direction.store(direction as u8, Ordering::Release);
    }

    /// Bring up the role matching the current direction
    ///
    /// Output ports in continuous style start sending immediately; delta ports
    /// wait for the first `start_output` / `sync`.
    pub(crate) fn start(&self, shared: &Shared) {
        if self.activity() != Activity::Idle {
            return;
        }

        match self.direction() {
            Direction::Output => {
                self.hw.set_interrupt(Interrupt::Receive, false);
                self.hw.set_mode(LineMode::Transmit);
                self.tx_state.store(TxState::Idle as u8, Ordering::Release);
                self.activity
                    .store(Activity::Transmitting as u8, Ordering::Release);
                if self.output_style() == OutputStyle::Continuous {
                    self.begin_frame(shared);
                }
            }
            Direction::Input => {
                self.reset_receiver();
                self.hw.set_mode(LineMode::Receive);
                self.hw.flush_rx();
                self.activity
                    .store(Activity::Receiving as u8, Ordering::Release);
                self.hw.set_interrupt(Interrupt::Receive, true);
            }
        }

        debug!("port {}: started", self.index);
    }

    /// Stop whatever the port is doing
    ///
    /// Transmit waits for the frame in flight to reach the inter-frame gap;
    /// receive drops a partial frame.
    pub(crate) fn stop(&self, shared: &Shared) {
        match self.activity() {
            Activity::Idle => return,
            Activity::Transmitting => self.wait_transmit_boundary(),
            Activity::Receiving => {
                self.hw.set_interrupt(Interrupt::Receive, false);
            }
        }

        self.hw.disarm();
        self.hw.set_interrupt(Interrupt::TransmitEmpty, false);
        shared.busy.fetch_and(!self.bit(), Ordering::AcqRel);
        self.reset_receiver();
        self.activity.store(Activity::Idle as u8, Ordering::Release);

        debug!("port {}: stopped", self.index);
    }

    pub(crate) fn reset_receiver(&self) {
        self.rx_state.store(RxState::Idle as u8, Ordering::Relaxed);
        self.rx_index.store(0, Ordering::Relaxed);
        self.rx_has_previous_break.store(false, Ordering::Relaxed);
    }

    /// `UART` interrupt entry
    pub(crate) fn on_uart_interrupt(&self, shared: &Shared) {
        match self.activity() {
            Activity::Receiving => {
                while let Some(event) = self.hw.read_event() {
                    let now = self.hw.now_micros();
                    self.receive_event(event, now);
                }
            }
            Activity::Transmitting => self.transmit_fifo_empty(shared),
            Activity::Idle => {
                self.hw.set_interrupt(Interrupt::TransmitEmpty, false);
                self.hw.flush_rx();
            }
        }
    }

    /// Phase / slot timer entry
    pub(crate) fn on_timer(&self, shared: &Shared) {
        match self.activity() {
            Activity::Receiving => self.receive_timeout(self.hw.now_micros()),
            Activity::Transmitting => self.transmit_timer(shared),
            Activity::Idle => {}
        }
    }
}

/// A group of ports driven by one engine
pub struct Ports<H, const N: usize> {
    ports: [Port<H>; N],
    pub(crate) shared: Shared,
    initialised: AtomicBool,
}

impl<H: PortHardware, const N: usize> Ports<H, N> {
    const PORT_COUNT: () = assert!(N >= 1 && N <= MAX_PORTS, "1 to 8 ports supported");

    /// Wrap one hardware handle per port; port `n` is `hw[n]`
    pub fn new(hw: [H; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::PORT_COUNT;

        let mut index = 0u8;
        let ports = hw.map(|hw| {
            let port = Port::new(index, hw);
            index += 1;
            port
        });

        Self {
            ports,
            shared: Shared {
                busy: AtomicU32::new(0),
                break_time: AtomicU32::new(0),
                mab_time: AtomicU32::new(0),
                remainder: AtomicU32::new(0),
            },
            initialised: AtomicBool::new(false),
        }
    }

    pub fn port(&self, index: usize) -> Option<&Port<H>> {
        self.ports.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port<H>> {
        self.ports.iter()
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Ports currently streaming a data phase, one bit per port
    pub fn busy(&self) -> u32 {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Returns `true` exactly once
    pub(crate) fn claim_init(&self) -> bool {
        !self.initialised.swap(true, Ordering::AcqRel)
    }

    /// Route the UART interrupt of `port` here
    pub fn on_uart_interrupt(&self, port: usize) {
        if let Some(p) = self.ports.get(port) {
            p.on_uart_interrupt(&self.shared);
        }
    }

    /// Route the one-shot timer interrupt of `port` here
    pub fn on_port_timer(&self, port: usize) {
        if let Some(p) = self.ports.get(port) {
            p.on_timer(&self.shared);
        }
    }

    /// Route the 1 Hz statistics timer here
    pub fn on_statistics_tick(&self) {
        for port in &self.ports {
            port.counters.tick();
        }
    }
}
