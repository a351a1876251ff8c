//! Application-side API
//!
//! [`Dmx`] borrows the interrupt-shared [`Ports`] and owns everything only the
//! application touches: direction pins, transmit timing, and the snapshots
//! received frames are copied into.

use portable_atomic::Ordering;

use dmxio_hal::{
    DirectionPin, DmxUart, LineMode, OutputPin, PeriodicTimer, PortHardware, UartConfig,
};
use dmxio_protocol::dmx::{BREAK_TIME_MIN, DMX_MIN_SLOTS, MAB_TIME_MIN};
use dmxio_protocol::rdm::{
    RDM_DATA_DIRECTION_DELAY, RDM_RESPONDER_PACKET_SPACING, RDM_TRANSMIT_BREAK_TIME,
    RDM_TRANSMIT_MAB_TIME,
};
use dmxio_protocol::{DMX_FRAME_SIZE, DMX_MAX_SLOTS, DMX_START_CODE, RDM_FRAME_SIZE};

use crate::config::{Direction, DmxConfig, OutputStyle, TransmitTiming};
use crate::error::Error;
use crate::port::{Activity, Port, Ports};
use crate::ring::{DmxFrame, RdmFrame};
use crate::statistics::{PortCounters, TotalStatistics};
use crate::timing::PhaseIntervals;
use crate::transmit::TxState;

/// Statistics tick period
const STATISTICS_PERIOD_US: u32 = 1_000_000;

/// DMX512 / RDM engine for `N` ports
pub struct Dmx<'a, H, P, const N: usize> {
    ports: &'a Ports<H, N>,
    pins: [DirectionPin<P>; N],
    timing: TransmitTiming,
    intervals: PhaseIntervals,
    slots: u16,
    dmx_frames: [DmxFrame; N],
    dmx_previous: [DmxFrame; N],
    rdm_frame: RdmFrame,
}

impl<'a, H: PortHardware, P: OutputPin, const N: usize> Dmx<'a, H, P, N> {
    /// Bind to a port group; `pins[n]` is the transceiver direction line of
    /// port `n`
    pub fn new(ports: &'a Ports<H, N>, pins: [DirectionPin<P>; N]) -> Self {
        let timing = TransmitTiming::new();
        let mut dmx = Self {
            ports,
            pins,
            timing,
            intervals: PhaseIntervals::compute(
                timing.break_time,
                timing.mab_time,
                timing.period,
                DMX_FRAME_SIZE,
            ),
            slots: DMX_MAX_SLOTS as u16,
            dmx_frames: core::array::from_fn(|_| DmxFrame::new()),
            dmx_previous: core::array::from_fn(|_| DmxFrame::new()),
            rdm_frame: RdmFrame::new(),
        };
        dmx.update_period();
        dmx
    }

    /// Configure the UARTs, put every port in input direction (idle) and
    /// start the 1 Hz statistics timer
    ///
    /// Only the first call on a port group has any effect.
    pub fn init<T: PeriodicTimer>(&mut self, statistics_timer: &mut T) {
        if !self.ports.claim_init() {
            return;
        }

        let config = UartConfig::dmx();
        for (port, pin) in self.ports.iter().zip(self.pins.iter_mut()) {
            port.stop(&self.ports.shared);
            port.hw.configure(&config);
            port.hw.set_mode(LineMode::Receive);
            port.set_direction(Direction::Input);
            pin.set_transmit(false);
        }

        self.update_period();
        statistics_timer.start_periodic(STATISTICS_PERIOD_US);

        info!("dmx: {} ports initialised", N);
    }

    fn port(&self, index: usize) -> Result<&'a Port<H>, Error> {
        let ports: &'a Ports<H, N> = self.ports;
        ports.port(index).ok_or(Error::InvalidPort)
    }

    // Direction

    /// Switch `port` to `direction`, starting it if `enable_data`
    ///
    /// A transmitting port finishes the frame on the wire first. Unchanged
    /// direction with `enable_data == false` just stops the port.
    pub fn set_port_direction(
        &mut self,
        port: usize,
        direction: Direction,
        enable_data: bool,
    ) -> Result<(), Error> {
        let p = self.port(port)?;
        let shared = &self.ports.shared;

        if p.direction() != direction {
            p.stop(shared);
            p.set_direction(direction);
            self.pins[port].set_transmit(direction == Direction::Output);
            self.update_period();
            debug!("port {}: direction {}", port, direction as u8);
            if enable_data {
                p.start(shared);
            }
        } else if enable_data {
            p.start(shared);
        } else {
            p.stop(shared);
        }

        Ok(())
    }

    pub fn port_direction(&self, port: usize) -> Result<Direction, Error> {
        Ok(self.port(port)?.direction())
    }

    /// Start receiving or transmitting in the current direction
    pub fn start_data(&mut self, port: usize) -> Result<(), Error> {
        self.port(port)?.start(&self.ports.shared);
        Ok(())
    }

    /// Stop the port; a frame on the wire is finished first
    pub fn stop_data(&mut self, port: usize) -> Result<(), Error> {
        self.port(port)?.stop(&self.ports.shared);
        Ok(())
    }

    // Output

    pub fn output_style(&self, port: usize) -> Result<OutputStyle, Error> {
        Ok(self.port(port)?.output_style())
    }

    /// Select continuous or delta output; a running output port switched to
    /// continuous is restarted
    pub fn set_output_style(&mut self, port: usize, style: OutputStyle) -> Result<(), Error> {
        let p = self.port(port)?;
        p.tx_style.store(style as u8, Ordering::Relaxed);

        if style == OutputStyle::Continuous && p.activity() == Activity::Transmitting {
            let shared = &self.ports.shared;
            p.stop(shared);
            p.start(shared);
        }

        Ok(())
    }

    /// Send one frame on a parked delta-style output port
    pub fn start_output(&mut self, port: usize) -> Result<(), Error> {
        let p = self.port(port)?;
        if p.direction() != Direction::Output {
            return Err(Error::NotOutput);
        }
        self.kick_delta(p);
        Ok(())
    }

    /// Send every delta-style port that got new data since the last sync
    pub fn sync(&mut self) {
        for p in self.ports.iter() {
            if p.tx_pending.swap(false, Ordering::AcqRel) {
                self.kick_delta(p);
            }
        }
    }

    fn kick_delta(&self, p: &Port<H>) {
        if p.activity() == Activity::Transmitting
            && p.output_style() == OutputStyle::Delta
            && p.transmit_state() == TxState::Idle
        {
            p.begin_frame(&self.ports.shared);
        }
    }

    /// Replace the send buffer of `port` with `frame` (start code included)
    ///
    /// Waits for the frame on the wire to finish. Frames longer than the
    /// configured slot count are truncated.
    pub fn set_send_data(&mut self, port: usize, frame: &[u8]) -> Result<(), Error> {
        if frame.len() > DMX_FRAME_SIZE {
            return Err(Error::BufferTooLarge);
        }
        let p = self.port(port)?;
        let length = frame.len().min(1 + usize::from(self.slots));

        p.wait_send_buffer();
        for (cell, &byte) in p.tx_buffer.iter().zip(&frame[..length]) {
            cell.store(byte, Ordering::Relaxed);
        }
        self.commit_send_length(p, length);
        Ok(())
    }

    /// Replace the send buffer of `port` with a 0x00 start code followed by
    /// `slots`
    pub fn set_send_data_without_start_code(
        &mut self,
        port: usize,
        slots: &[u8],
    ) -> Result<(), Error> {
        if slots.len() > DMX_MAX_SLOTS {
            return Err(Error::BufferTooLarge);
        }
        let p = self.port(port)?;
        let count = slots.len().min(usize::from(self.slots));

        p.wait_send_buffer();
        p.tx_buffer[0].store(DMX_START_CODE, Ordering::Relaxed);
        for (cell, &byte) in p.tx_buffer[1..].iter().zip(&slots[..count]) {
            cell.store(byte, Ordering::Relaxed);
        }
        self.commit_send_length(p, 1 + count);
        Ok(())
    }

    fn commit_send_length(&mut self, p: &Port<H>, length: usize) {
        let previous = p.tx_length.swap(length as u16, Ordering::AcqRel);
        p.tx_pending.store(true, Ordering::Release);
        if usize::from(previous) != length {
            self.update_period();
        }
    }

    /// Zero every slot of every output port
    ///
    /// Delta-style ports send the new data on the next [`Dmx::sync`].
    pub fn blackout(&mut self) {
        self.fill_outputs(0x00, None);
    }

    /// Set every slot of every output port to full
    pub fn full_on(&mut self) {
        self.fill_outputs(0xFF, Some(1 + usize::from(self.slots)));
    }

    fn fill_outputs(&mut self, value: u8, length: Option<usize>) {
        let shared = &self.ports.shared;
        let mut resized = false;

        for p in self.ports.iter() {
            if p.direction() != Direction::Output {
                continue;
            }
            let running = p.activity() == Activity::Transmitting;
            p.stop(shared);

            p.tx_buffer[0].store(DMX_START_CODE, Ordering::Relaxed);
            for cell in &p.tx_buffer[1..] {
                cell.store(value, Ordering::Relaxed);
            }
            if let Some(length) = length {
                let previous = p.tx_length.swap(length as u16, Ordering::AcqRel);
                resized |= usize::from(previous) != length;
            }
            p.tx_pending.store(true, Ordering::Release);

            if running {
                p.start(shared);
            }
        }

        if resized {
            self.update_period();
        }
    }

    /// Latched period-overrun flag of `port`, cleared by reading
    pub fn take_transmit_fault(&mut self, port: usize) -> Result<bool, Error> {
        Ok(self.port(port)?.take_fault())
    }

    // Transmit timing

    pub fn set_break_time(&mut self, micros: u32) {
        self.timing.break_time = micros.max(BREAK_TIME_MIN);
        self.update_period();
    }

    pub fn break_time(&self) -> u32 {
        self.intervals.break_time
    }

    pub fn set_mab_time(&mut self, micros: u32) {
        self.timing.mab_time = micros.max(MAB_TIME_MIN);
        self.update_period();
    }

    pub fn mab_time(&self) -> u32 {
        self.intervals.mab_time
    }

    /// Request a break-to-break period; 0 selects the shortest possible
    pub fn set_period_time(&mut self, micros: u32) {
        self.timing.period = micros;
        self.update_period();
    }

    /// Effective break-to-break period
    pub fn period_time(&self) -> u32 {
        self.intervals.period
    }

    /// Limit transmitted frames to `slots` (2..=512); other values are
    /// ignored
    pub fn set_slots(&mut self, slots: u16) {
        if !(DMX_MIN_SLOTS..=DMX_MAX_SLOTS).contains(&usize::from(slots)) {
            return;
        }
        self.slots = slots;

        let limit = 1 + slots;
        for p in self.ports.iter() {
            let length = p.tx_length.load(Ordering::Acquire);
            if length > limit {
                p.wait_send_buffer();
                p.tx_length.store(limit, Ordering::Release);
            }
        }

        self.update_period();
    }

    pub fn slots(&self) -> u16 {
        self.slots
    }

    /// Recompute the period for the longest frame any output port sends and
    /// hand the phase intervals to the interrupts
    fn update_period(&mut self) {
        let longest = self
            .ports
            .iter()
            .filter(|p| p.direction() == Direction::Output)
            .map(|p| usize::from(p.tx_length.load(Ordering::Acquire)))
            .max()
            .unwrap_or(DMX_FRAME_SIZE);

        let timing = self.timing.clamped();
        self.intervals =
            PhaseIntervals::compute(timing.break_time, timing.mab_time, timing.period, longest);

        let shared = &self.ports.shared;
        shared
            .break_time
            .store(self.intervals.break_time, Ordering::Relaxed);
        shared
            .mab_time
            .store(self.intervals.mab_time, Ordering::Relaxed);
        shared
            .remainder
            .store(self.intervals.remainder, Ordering::Release);

        debug!(
            "dmx: period {} us (requested {}, longest frame {})",
            self.intervals.period, timing.period, longest
        );
    }

    // Receive

    /// Oldest unread frame of `port`, if any
    pub fn dmx_available(&mut self, port: usize) -> Result<Option<&DmxFrame>, Error> {
        let p = self.port(port)?;
        let frame = &mut self.dmx_frames[port];
        if p.dmx_ring.pop_into(frame) {
            Ok(Some(&*frame))
        } else {
            Ok(None)
        }
    }

    /// Most recently completed frame of `port`, leaving unread frames queued
    pub fn dmx_current(&mut self, port: usize) -> Result<Option<&DmxFrame>, Error> {
        let p = self.port(port)?;
        let frame = &mut self.dmx_frames[port];
        if p.dmx_ring.latest_into(frame) {
            Ok(Some(&*frame))
        } else {
            Ok(None)
        }
    }

    /// Next unread frame of `port`, only if it differs from the last one this
    /// returned
    ///
    /// A different slot count is a change even when the common prefix
    /// matches.
    pub fn dmx_changed(&mut self, port: usize) -> Result<Option<&DmxFrame>, Error> {
        let p = self.port(port)?;
        let frame = &mut self.dmx_frames[port];
        if !p.dmx_ring.pop_into(frame) {
            return Ok(None);
        }

        let previous = &mut self.dmx_previous[port];
        if frame.data() == previous.data() {
            return Ok(None);
        }
        previous.clone_from(frame);
        Ok(Some(&*frame))
    }

    pub fn dmx_updates_per_second(&self, port: usize) -> Result<u32, Error> {
        Ok(self.port(port)?.updates_per_second())
    }

    pub fn total_statistics(&self, port: usize) -> Result<TotalStatistics, Error> {
        Ok(self.port(port)?.statistics())
    }

    // RDM

    /// Next received RDM message or discovery response of `port`
    pub fn rdm_receive(&mut self, port: usize) -> Result<Option<&RdmFrame>, Error> {
        let p = self.port(port)?;
        if p.rdm_ring.pop_into(&mut self.rdm_frame) {
            Ok(Some(&self.rdm_frame))
        } else {
            Ok(None)
        }
    }

    /// Like [`rdm_receive`](Self::rdm_receive), polling for up to
    /// `timeout_us`
    pub fn rdm_receive_timeout(
        &mut self,
        port: usize,
        timeout_us: u32,
    ) -> Result<Option<&RdmFrame>, Error> {
        let p = self.port(port)?;
        let start = p.hw.now_micros();

        loop {
            if p.rdm_ring.pop_into(&mut self.rdm_frame) {
                return Ok(Some(&self.rdm_frame));
            }
            if p.hw.elapsed_since(start) >= timeout_us {
                return Ok(None);
            }
            core::hint::spin_loop();
        }
    }

    /// Send `message` with an RDM break and MAB, bypassing the periodic
    /// transmitter
    ///
    /// The port must be in output direction and not running DMX output.
    pub fn rdm_send_raw(&mut self, port: usize, message: &[u8]) -> Result<(), Error> {
        if message.len() > RDM_FRAME_SIZE {
            return Err(Error::BufferTooLarge);
        }
        let p = self.port(port)?;
        if p.direction() != Direction::Output {
            return Err(Error::NotOutput);
        }
        if p.activity() != Activity::Idle {
            return Err(Error::PortBusy);
        }

        let hw = &p.hw;
        hw.set_mode(LineMode::Transmit);
        wait_tx_complete(hw);

        hw.set_break(true);
        hw.delay_us(RDM_TRANSMIT_BREAK_TIME);
        hw.set_break(false);
        hw.delay_us(RDM_TRANSMIT_MAB_TIME);

        write_blocking(hw, message);
        wait_tx_complete(hw);

        PortCounters::bump(&p.counters.rdm_sent_class);
        Ok(())
    }

    /// Answer a discovery request: wait out the responder packet spacing,
    /// turn the line around, send `response` without break, and return to
    /// receiving
    ///
    /// Only input ports answer discovery; an output port is left untouched.
    pub fn rdm_send_discovery_response(
        &mut self,
        port: usize,
        response: &[u8],
    ) -> Result<(), Error> {
        if response.len() > RDM_FRAME_SIZE {
            return Err(Error::BufferTooLarge);
        }
        let p = self.port(port)?;
        if p.direction() != Direction::Input {
            return Err(Error::NotInput);
        }

        let received_at = p.rdm_received_at.load(Ordering::Relaxed);
        p.hw.delay_from(received_at, RDM_RESPONDER_PACKET_SPACING);

        self.set_port_direction(port, Direction::Output, false)?;

        let hw = &p.hw;
        hw.set_mode(LineMode::Transmit);
        write_blocking(hw, response);
        wait_tx_complete(hw);
        hw.delay_us(RDM_DATA_DIRECTION_DELAY);

        self.set_port_direction(port, Direction::Input, true)?;

        PortCounters::bump(&p.counters.rdm_sent_discovery);
        Ok(())
    }

    // Configuration

    /// Apply timing, slot count and per-port settings
    pub fn apply_config(&mut self, config: &DmxConfig) -> Result<(), Error> {
        if config.ports.len() > N {
            return Err(Error::InvalidPort);
        }

        self.timing = config.timing.clamped();
        self.set_slots(config.slots);
        self.update_period();

        for (port, settings) in config.ports.iter().enumerate() {
            self.set_output_style(port, settings.output_style)?;
            self.set_port_direction(port, settings.direction, settings.enable)?;
        }

        info!("dmx: configuration applied");
        Ok(())
    }
}

fn write_blocking<U: DmxUart>(uart: &U, bytes: &[u8]) {
    for &byte in bytes {
        while !uart.tx_ready() {
            core::hint::spin_loop();
        }
        uart.write_byte(byte);
    }
}

fn wait_tx_complete<U: DmxUart>(uart: &U) {
    while !uart.tx_complete() {
        core::hint::spin_loop();
    }
}
