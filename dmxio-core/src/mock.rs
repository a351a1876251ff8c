//! Host-side mock port for the state machine tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::{Dmx, Ports};
use dmxio_hal::{
    DirectionPin, DmxUart, Interrupt, LineMode, MicrosClock, OneShotTimer, OutputPin,
    PeriodicTimer, RxEvent, UartConfig,
};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) rx: VecDeque<RxEvent>,
    pub(crate) tx: Vec<u8>,
    /// Every `set_break` call in order
    pub(crate) breaks: Vec<bool>,
    pub(crate) armed: Option<u32>,
    pub(crate) arm_history: Vec<u32>,
    pub(crate) receive_irq: bool,
    pub(crate) transmit_empty_irq: bool,
    pub(crate) mode: Option<LineMode>,
    pub(crate) config: Option<UartConfig>,
}

/// One mock port: UART, one-shot timer and microsecond clock
#[derive(Debug)]
pub(crate) struct MockPort {
    state: Mutex<MockState>,
    clock: AtomicU32,
    /// Added to the clock on every read so spin loops terminate
    step: AtomicU32,
    tx_complete: AtomicBool,
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPort {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            clock: AtomicU32::new(0),
            step: AtomicU32::new(1),
            tx_complete: AtomicBool::new(true),
        }
    }

    pub(crate) fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn set_time(&self, micros: u32) {
        self.clock.store(micros, Ordering::SeqCst);
    }

    pub(crate) fn push(&self, event: RxEvent) {
        self.state().rx.push_back(event);
    }

    pub(crate) fn set_tx_complete(&self, complete: bool) {
        self.tx_complete.store(complete, Ordering::SeqCst);
    }

    pub(crate) fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().tx)
    }
}

impl DmxUart for MockPort {
    fn configure(&self, config: &UartConfig) {
        self.state().config = Some(*config);
    }

    fn set_mode(&self, mode: LineMode) {
        self.state().mode = Some(mode);
    }

    fn set_break(&self, asserted: bool) {
        self.state().breaks.push(asserted);
    }

    fn read_event(&self) -> Option<RxEvent> {
        self.state().rx.pop_front()
    }

    fn tx_fifo_depth(&self) -> usize {
        16
    }

    fn tx_ready(&self) -> bool {
        true
    }

    fn write_byte(&self, byte: u8) {
        self.state().tx.push(byte);
    }

    fn tx_complete(&self) -> bool {
        self.tx_complete.load(Ordering::SeqCst)
    }

    fn set_interrupt(&self, source: Interrupt, enabled: bool) {
        let mut state = self.state();
        match source {
            Interrupt::Receive => state.receive_irq = enabled,
            Interrupt::TransmitEmpty => state.transmit_empty_irq = enabled,
        }
    }
}

impl OneShotTimer for MockPort {
    fn arm(&self, micros: u32) {
        let mut state = self.state();
        state.armed = Some(micros);
        state.arm_history.push(micros);
    }

    fn disarm(&self) {
        self.state().armed = None;
    }
}

impl MicrosClock for MockPort {
    fn now_micros(&self) -> u32 {
        self.clock
            .fetch_add(self.step.load(Ordering::SeqCst), Ordering::SeqCst)
    }
}

/// Direction pin whose level the test can observe
#[derive(Debug, Clone, Default)]
pub(crate) struct MockPin(pub(crate) Arc<AtomicBool>);

impl MockPin {
    pub(crate) fn is_high(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn set_low(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn is_set_high(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockTicker {
    pub(crate) period: Option<u32>,
}

impl PeriodicTimer for MockTicker {
    fn start_periodic(&mut self, period_us: u32) {
        self.period = Some(period_us);
    }
}

pub(crate) fn ports<const N: usize>() -> Ports<MockPort, N> {
    Ports::new(core::array::from_fn(|_| MockPort::new()))
}

/// Engine over `ports`, initialised; also returns handles to the pins
pub(crate) fn engine<const N: usize>(
    ports: &Ports<MockPort, N>,
) -> (Dmx<'_, MockPort, MockPin, N>, [MockPin; N]) {
    let pins: [MockPin; N] = core::array::from_fn(|_| MockPin::default());
    let mut dmx = Dmx::new(ports, pins.clone().map(DirectionPin::new));
    dmx.init(&mut MockTicker::default());
    (dmx, pins)
}

pub(crate) fn hw<const N: usize>(ports: &Ports<MockPort, N>, port: usize) -> &MockPort {
    ports.port(port).unwrap().hw()
}

/// Deliver `event` to `port` at time `at`
pub(crate) fn feed<const N: usize>(ports: &Ports<MockPort, N>, port: usize, at: u32, event: RxEvent) {
    let mock = hw(ports, port);
    mock.set_time(at);
    mock.push(event);
    ports.on_uart_interrupt(port);
}

/// Break, break character, then `frame` (start code first) one slot time
/// apart; returns the time of the last byte
pub(crate) fn feed_frame<const N: usize>(
    ports: &Ports<MockPort, N>,
    port: usize,
    start: u32,
    frame: &[u8],
) -> u32 {
    feed(ports, port, start, RxEvent::Break);
    feed(ports, port, start + 100, RxEvent::Data(0x00));
    let mut at = start + 100;
    for &byte in frame {
        at += 44;
        feed(ports, port, at, RxEvent::Data(byte));
    }
    at
}

/// Bytes without a break, one slot time apart
pub(crate) fn feed_raw<const N: usize>(
    ports: &Ports<MockPort, N>,
    port: usize,
    start: u32,
    bytes: &[u8],
) -> u32 {
    let mut at = start;
    for &byte in bytes {
        at += 44;
        feed(ports, port, at, RxEvent::Data(byte));
    }
    at
}

/// Let the slot timer of `port` expire at `at`
pub(crate) fn expire<const N: usize>(ports: &Ports<MockPort, N>, port: usize, at: u32) {
    hw(ports, port).set_time(at);
    ports.on_port_timer(port);
}

/// Valid RDM message of `length` bytes (before checksum), checksum appended
pub(crate) fn rdm_message(length: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; usize::from(length)];
    bytes[0] = 0xCC;
    bytes[1] = 0x01;
    bytes[2] = length;
    for (i, b) in bytes.iter_mut().enumerate().skip(3) {
        *b = i as u8;
    }
    bytes[23] = length - 24;
    let sum = bytes.iter().fold(0u16, |s, &b| s.wrapping_add(u16::from(b)));
    bytes.extend_from_slice(&sum.to_be_bytes());
    bytes
}
