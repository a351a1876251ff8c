//! Receive state machine and slot time-out
//!
//! Runs in the UART interrupt, once per [`RxEvent`]. DMX frames are written
//! straight into the head slot of the port's DMX ring and RDM messages into
//! the head slot of its RDM ring; nothing becomes visible to the application
//! before the ring head moves.
//!
//! ```text
//!            break                 0x00
//!  (any) ──────────► PreBreak ─► Break ──────► Data ──(513 bytes | time-out)──► publish
//!                      (break char)  │ 0xCC
//!                                    └───────► RdmData ─► ChecksumHigh ─► ChecksumLow ─► publish if valid
//!
//!  Idle ──0xFE──► DiscoveryMarker ──0xAA──► DiscoveryUid ─(12)─► DiscoveryChecksum ─(4)─► publish
//! ```
//!
//! Discovery responses are sent without a break, which is why they are
//! recognised from `Idle`. A discovery sequence cut short by the slot
//! time-out is dropped.

use portable_atomic::Ordering;

use dmxio_hal::{PortHardware, RxEvent};
use dmxio_protocol::discovery::{
    DISCOVERY_ECS_SIZE, DISCOVERY_EUID_SIZE, DISCOVERY_MAX_PREAMBLE, DISCOVERY_PREAMBLE,
    DISCOVERY_SEPARATOR,
};
use dmxio_protocol::dmx::{SLOT_TIME, SLOT_TIMEOUT_GUARD};
use dmxio_protocol::rdm::RDM_MESSAGE_MIN_LENGTH;
use dmxio_protocol::{DMX_MAX_SLOTS, DMX_START_CODE, RDM_START_CODE, RDM_SUB_START_CODE};

use crate::port::Port;
use crate::statistics::PortCounters;

/// Receive state machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RxState {
    Idle = 0,
    /// Break seen, waiting for the break character
    PreBreak,
    /// Waiting for the start code
    Break,
    Data,
    RdmData,
    ChecksumHigh,
    ChecksumLow,
    DiscoveryMarker,
    DiscoveryUid,
    DiscoveryChecksum,
}

impl RxState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => RxState::PreBreak,
            2 => RxState::Break,
            3 => RxState::Data,
            4 => RxState::RdmData,
            5 => RxState::ChecksumHigh,
            6 => RxState::ChecksumLow,
            7 => RxState::DiscoveryMarker,
            8 => RxState::DiscoveryUid,
            9 => RxState::DiscoveryChecksum,
            _ => RxState::Idle,
        }
    }

    fn is_discovery(self) -> bool {
        matches!(
            self,
            RxState::DiscoveryMarker | RxState::DiscoveryUid | RxState::DiscoveryChecksum
        )
    }
}

impl<H: PortHardware> Port<H> {
    pub fn receive_state(&self) -> RxState {
        RxState::from_u8(self.rx_state.load(Ordering::Relaxed))
    }

    fn set_rx_state(&self, state: RxState) {
        self.rx_state.store(state as u8, Ordering::Relaxed);
    }

    /// Feed one event captured at `now` (µs)
    pub(crate) fn receive_event(&self, event: RxEvent, now: u32) {
        let previous_at = self.rx_last_event_at.swap(now, Ordering::Relaxed);

        match event {
            RxEvent::Break => {
                // A short frame whose time-out has not fired yet ends here
                if self.receive_state() == RxState::Data {
                    self.finish_dmx_frame();
                }
                self.rx_break_at.store(now, Ordering::Relaxed);
                self.set_rx_state(RxState::PreBreak);
            }
            RxEvent::Data(byte) => self.receive_byte(byte, now, now.wrapping_sub(previous_at)),
        }
    }

    fn receive_byte(&self, byte: u8, now: u32, slot_to_slot: u32) {
        match self.receive_state() {
            RxState::Idle => match byte {
                DISCOVERY_PREAMBLE => self.begin_discovery(byte),
                _ => {}
            },
            RxState::PreBreak => self.set_rx_state(RxState::Break),
            RxState::Break => self.receive_start_code(byte),
            RxState::Data => self.receive_dmx_slot(byte, slot_to_slot),
            RxState::RdmData => self.receive_rdm_byte(byte),
            RxState::ChecksumHigh => {
                let index = self.push_rdm(byte);
                let checksum = self.rx_checksum.load(Ordering::Relaxed);
                self.rx_checksum
                    .store(checksum.wrapping_sub(u16::from(byte) << 8), Ordering::Relaxed);
                self.rx_index.store(index, Ordering::Relaxed);
                self.set_rx_state(RxState::ChecksumLow);
            }
            RxState::ChecksumLow => {
                let index = self.push_rdm(byte);
                let checksum = self
                    .rx_checksum
                    .load(Ordering::Relaxed)
                    .wrapping_sub(u16::from(byte));
                self.finish_rdm_message(index, checksum, now);
            }
            RxState::DiscoveryMarker => match byte {
                DISCOVERY_PREAMBLE
                    if usize::from(self.rx_index.load(Ordering::Relaxed))
                        < DISCOVERY_MAX_PREAMBLE =>
                {
                    self.receive_discovery_byte(byte, slot_to_slot);
                }
                DISCOVERY_SEPARATOR => {
                    let index = self.receive_discovery_byte(byte, slot_to_slot);
                    self.rx_target
                        .store(index + DISCOVERY_EUID_SIZE as u16, Ordering::Relaxed);
                    self.set_rx_state(RxState::DiscoveryUid);
                }
                _ => self.abandon(),
            },
            RxState::DiscoveryUid => {
                let index = self.receive_discovery_byte(byte, slot_to_slot);
                if index == self.rx_target.load(Ordering::Relaxed) {
                    self.rx_target
                        .store(index + DISCOVERY_ECS_SIZE as u16, Ordering::Relaxed);
                    self.set_rx_state(RxState::DiscoveryChecksum);
                }
            }
            RxState::DiscoveryChecksum => {
                let index = self.receive_discovery_byte(byte, slot_to_slot);
                if index == self.rx_target.load(Ordering::Relaxed) {
                    self.finish_discovery(now);
                }
            }
        }
    }

    fn receive_start_code(&self, byte: u8) {
        match byte {
            DMX_START_CODE => {
                let slot = self.dmx_ring.writer();
                slot.set_byte(0, DMX_START_CODE);

                let break_at = self.rx_break_at.load(Ordering::Relaxed);
                let previous = self.rx_previous_break_at.swap(break_at, Ordering::Relaxed);
                if self.rx_has_previous_break.swap(true, Ordering::Relaxed) {
                    slot.set_break_to_break(break_at.wrapping_sub(previous));
                } else {
                    slot.set_break_to_break(0);
                }

                PortCounters::bump(&self.counters.dmx_received);
                self.rx_index.store(1, Ordering::Relaxed);
                self.set_rx_state(RxState::Data);
            }
            RDM_START_CODE => {
                self.rdm_ring.writer().set_byte(0, RDM_START_CODE);
                self.rx_checksum
                    .store(u16::from(RDM_START_CODE), Ordering::Relaxed);
                self.rx_has_previous_break.store(false, Ordering::Relaxed);
                self.rx_index.store(1, Ordering::Relaxed);
                self.set_rx_state(RxState::RdmData);
            }
            _ => {
                self.rx_has_previous_break.store(false, Ordering::Relaxed);
                self.abandon();
            }
        }
    }

    fn receive_dmx_slot(&self, byte: u8, slot_to_slot: u32) {
        let slot = self.dmx_ring.writer();
        let index = self.rx_index.load(Ordering::Relaxed);
        slot.set_byte(usize::from(index), byte);
        slot.set_slot_to_slot(slot_to_slot);
        self.rx_slot_to_slot.store(slot_to_slot, Ordering::Relaxed);

        let index = index + 1;
        self.rx_index.store(index, Ordering::Relaxed);

        if usize::from(index) > DMX_MAX_SLOTS {
            self.hw.disarm();
            self.finish_dmx_frame();
        } else {
            self.hw.arm(slot_to_slot.saturating_add(SLOT_TIMEOUT_GUARD));
        }
    }

    fn receive_rdm_byte(&self, byte: u8) {
        let index = self.push_rdm(byte);
        let checksum = self.rx_checksum.load(Ordering::Relaxed);
        self.rx_checksum
            .store(checksum.wrapping_add(u16::from(byte)), Ordering::Relaxed);
        self.rx_index.store(index, Ordering::Relaxed);

        if index >= 3 {
            let length = u16::from(self.rdm_ring.writer().byte(2));
            if usize::from(length) < RDM_MESSAGE_MIN_LENGTH {
                self.abandon();
            } else if index == length {
                self.set_rx_state(RxState::ChecksumHigh);
            }
        }
    }

    /// Append to the RDM slot, returning the new byte count
    fn push_rdm(&self, byte: u8) -> u16 {
        let index = self.rx_index.load(Ordering::Relaxed);
        self.rdm_ring.writer().set_byte(usize::from(index), byte);
        index + 1
    }

    fn finish_rdm_message(&self, length: u16, checksum: u16, now: u32) {
        let slot = self.rdm_ring.writer();

        if checksum == 0 && slot.byte(1) == RDM_SUB_START_CODE {
            slot.set_length(usize::from(length));
            slot.set_slots_in_packet(length);
            slot.set_slot_to_slot(0);
            slot.set_break_to_break(0);
            self.rdm_ring.publish();
            self.rdm_received_at.store(now, Ordering::Relaxed);
            PortCounters::bump(&self.counters.rdm_received_good);
        } else {
            PortCounters::bump(&self.counters.rdm_received_bad);
            trace!("port {}: rdm checksum mismatch", self.index);
        }

        self.abandon();
    }

    fn begin_discovery(&self, byte: u8) {
        self.rdm_ring.writer().set_byte(0, byte);
        self.rx_index.store(1, Ordering::Relaxed);
        self.set_rx_state(RxState::DiscoveryMarker);
        // No byte-to-byte time yet; assume back-to-back characters
        self.rx_slot_to_slot.store(SLOT_TIME, Ordering::Relaxed);
        self.hw.arm(SLOT_TIME + SLOT_TIMEOUT_GUARD);
    }

    /// Store one discovery byte and re-arm the time-out; returns the new count
    fn receive_discovery_byte(&self, byte: u8, slot_to_slot: u32) -> u16 {
        let index = self.push_rdm(byte);
        self.rx_index.store(index, Ordering::Relaxed);
        self.rx_slot_to_slot.store(slot_to_slot, Ordering::Relaxed);
        self.rdm_ring.writer().set_slot_to_slot(slot_to_slot);
        self.hw.arm(slot_to_slot.saturating_add(SLOT_TIMEOUT_GUARD));
        index
    }

    fn finish_discovery(&self, now: u32) {
        self.hw.disarm();

        let length = self.rx_index.load(Ordering::Relaxed);
        let slot = self.rdm_ring.writer();
        slot.set_length(usize::from(length));
        slot.set_slots_in_packet(length);
        slot.set_break_to_break(0);
        self.rdm_ring.publish();
        self.rdm_received_at.store(now, Ordering::Relaxed);
        PortCounters::bump(&self.counters.rdm_received_discovery);

        self.abandon();
    }

    /// Publish the DMX frame in progress with the slots received so far
    fn finish_dmx_frame(&self) {
        let index = self.rx_index.load(Ordering::Relaxed);
        let slots = index.saturating_sub(1);
        if slots == 0 {
            self.abandon();
            return;
        }

        let slot = self.dmx_ring.writer();
        slot.set_length(usize::from(index));
        slot.set_slots_in_packet(slots);
        self.dmx_ring.publish();

        self.abandon();
    }

    fn abandon(&self) {
        self.rx_index.store(0, Ordering::Relaxed);
        self.set_rx_state(RxState::Idle);
    }

    /// Slot timer expiry at `now` (µs)
    pub(crate) fn receive_timeout(&self, now: u32) {
        let state = self.receive_state();
        if state != RxState::Data && !state.is_discovery() {
            return;
        }

        let slot_to_slot = self.rx_slot_to_slot.load(Ordering::Relaxed);
        let quiet = now.wrapping_sub(self.rx_last_event_at.load(Ordering::Relaxed));

        if quiet <= slot_to_slot {
            self.hw.arm(slot_to_slot.saturating_add(SLOT_TIMEOUT_GUARD));
            return;
        }

        if state == RxState::Data {
            self.finish_dmx_frame();
        } else {
            trace!("port {}: discovery response truncated", self.index);
            self.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, expire, feed, feed_frame, feed_raw, hw, rdm_message};
    use dmxio_protocol::{checksum, DiscoveryResponse, Uid, DMX_FRAME_SIZE, RDM_FRAME_SIZE};
    use proptest::prelude::*;

    fn counting_frame(slots: usize) -> Vec<u8> {
        let mut frame = vec![DMX_START_CODE];
        frame.extend((1..=slots).map(|i| i as u8));
        frame
    }

    #[test]
    fn test_short_frame_published_on_timeout() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 1_000, &counting_frame(255));
        assert_eq!(hw(&ports, 0).state().armed, Some(SLOT_TIME + SLOT_TIMEOUT_GUARD));
        assert!(dmx.dmx_available(0).unwrap().is_none());

        expire(&ports, 0, last + 100);

        let frame = dmx.dmx_available(0).unwrap().unwrap();
        assert_eq!(frame.len(), 256);
        assert_eq!(frame.start_code(), Some(DMX_START_CODE));
        assert!(frame.slots().iter().copied().eq(1..=255u8));
        assert_eq!(frame.statistics().slots_in_packet, 255);
        assert_eq!(frame.statistics().slot_to_slot, SLOT_TIME);
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
    }

    #[test]
    fn test_full_frame_published_without_timeout() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        feed_frame(&ports, 0, 0, &counting_frame(DMX_MAX_SLOTS));

        assert_eq!(hw(&ports, 0).state().armed, None);
        let frame = dmx.dmx_available(0).unwrap().unwrap();
        assert_eq!(frame.len(), DMX_MAX_SLOTS + 1);
        assert_eq!(frame.statistics().slots_in_packet, DMX_MAX_SLOTS as u16);
    }

    #[test]
    fn test_timeout_rearms_while_bytes_are_due() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 0, &counting_frame(3));
        hw(&ports, 0).state().armed = None;

        // Timer fired early relative to the last byte
        expire(&ports, 0, last + 30);
        assert_eq!(hw(&ports, 0).state().armed, Some(SLOT_TIME + SLOT_TIMEOUT_GUARD));
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Data);
        assert!(dmx.dmx_available(0).unwrap().is_none());

        expire(&ports, 0, last + 200);
        assert_eq!(dmx.dmx_available(0).unwrap().unwrap().slots(), &[1, 2, 3]);
    }

    #[test]
    fn test_break_ends_frame_before_timeout() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 0, &counting_frame(24));
        feed_frame(&ports, 0, last + 100, &counting_frame(8));

        assert_eq!(dmx.dmx_available(0).unwrap().unwrap().slots().len(), 24);
        assert!(dmx.dmx_available(0).unwrap().is_none());
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Data);
    }

    #[test]
    fn test_break_to_break_measured_between_frames() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 10_000, &counting_frame(4));
        expire(&ports, 0, last + 100);
        let last = feed_frame(&ports, 0, 33_000, &counting_frame(4));
        expire(&ports, 0, last + 100);

        assert_eq!(dmx.dmx_available(0).unwrap().unwrap().statistics().break_to_break, 0);
        assert_eq!(
            dmx.dmx_available(0).unwrap().unwrap().statistics().break_to_break,
            23_000
        );
        assert_eq!(dmx.total_statistics(0).unwrap().dmx.received, 2);
    }

    #[test]
    fn test_unknown_start_code_ignored() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 0, &[0x17, 1, 2, 3]);
        expire(&ports, 0, last + 100);

        assert!(dmx.dmx_available(0).unwrap().is_none());
        assert!(dmx.rdm_receive(0).unwrap().is_none());
    }

    #[test]
    fn test_ring_overflow_drops_oldest() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let mut at = 0;
        for i in 1..=9u8 {
            at = feed_frame(&ports, 0, at + 1_000, &[DMX_START_CODE, i, i]);
        }
        expire(&ports, 0, at + 100);

        let received: Vec<u8> = core::iter::from_fn(|| {
            dmx.dmx_available(0).unwrap().map(|frame| frame.slots()[0])
        })
        .collect();
        assert_eq!(received, vec![3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_rdm_message_with_valid_checksum() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let message = rdm_message(26);
        let last = feed_frame(&ports, 0, 0, &message);

        let frame = dmx.rdm_receive(0).unwrap().unwrap();
        assert_eq!(frame.data(), message.as_slice());
        assert_eq!(frame.statistics().slots_in_packet, 28);
        assert_eq!(ports.port(0).unwrap().rdm_received_at.load(Ordering::Relaxed), last);
        assert_eq!(dmx.total_statistics(0).unwrap().rdm.received_good, 1);
    }

    #[test]
    fn test_rdm_message_with_bad_checksum_dropped() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let mut message = rdm_message(24);
        let last = message.len() - 1;
        message[last] ^= 0x01;
        feed_frame(&ports, 0, 0, &message);

        assert!(dmx.rdm_receive(0).unwrap().is_none());
        let stats = dmx.total_statistics(0).unwrap();
        assert_eq!(stats.rdm.received_good, 0);
        assert_eq!(stats.rdm.received_bad, 1);
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
    }

    #[test]
    fn test_rdm_message_length_below_minimum_abandoned() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        feed_frame(&ports, 0, 0, &[RDM_START_CODE, RDM_SUB_START_CODE, 0x10]);

        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
        assert!(dmx.rdm_receive(0).unwrap().is_none());
    }

    #[test]
    fn test_discovery_response_published_on_last_byte() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let uid = Uid::new(0x4D41, 0x1234_5678);
        let response = DiscoveryResponse::new(uid).encode();
        feed_raw(&ports, 0, 5_000, &response);

        assert_eq!(hw(&ports, 0).state().armed, None);
        let frame = dmx.rdm_receive(0).unwrap().unwrap();
        assert_eq!(frame.len(), 24);
        assert_eq!(DiscoveryResponse::decode(frame.data()).unwrap().uid, uid);
        assert_eq!(
            dmx.total_statistics(0).unwrap().rdm.received_discovery_response,
            1
        );
    }

    #[test]
    fn test_discovery_response_without_preamble_ignored() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let uid = Uid::new(0x0001, 0x0000_0002);
        let response = DiscoveryResponse::new(uid).encode();
        let last = feed_raw(&ports, 0, 0, &response[DISCOVERY_MAX_PREAMBLE..]);
        expire(&ports, 0, last + 500);

        assert!(dmx.rdm_receive(0).unwrap().is_none());
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
    }

    #[test]
    fn test_separator_inside_alternate_start_code_packet_ignored() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let mut packet = vec![0x17, 0x41, DISCOVERY_SEPARATOR];
        packet.extend(0x30..=0x43u8);
        let last = feed_frame(&ports, 0, 0, &packet);
        expire(&ports, 0, last + 500);

        assert!(dmx.rdm_receive(0).unwrap().is_none());
        assert_eq!(
            dmx.total_statistics(0).unwrap().rdm.received_discovery_response,
            0
        );
    }

    #[test]
    fn test_truncated_discovery_dropped_on_timeout() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let first = feed_raw(&ports, 0, 0, &[DISCOVERY_PREAMBLE]);
        assert_eq!(hw(&ports, 0).state().armed, Some(SLOT_TIME + SLOT_TIMEOUT_GUARD));
        let last = feed_raw(&ports, 0, first, &[0xFE, 0xFE, 0xAA, 0xAB, 0x55]);
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::DiscoveryUid);
        expire(&ports, 0, last + 500);

        assert!(dmx.rdm_receive(0).unwrap().is_none());
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
        assert_eq!(
            dmx.total_statistics(0).unwrap().rdm.received_discovery_response,
            0
        );
    }

    #[test]
    fn test_trailing_preamble_byte_dropped_on_timeout() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        let last = feed_frame(&ports, 0, 0, &[0x91, 0x01, 0x02, DISCOVERY_PREAMBLE]);
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::DiscoveryMarker);
        expire(&ports, 0, last + 500);

        assert!(dmx.rdm_receive(0).unwrap().is_none());
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
    }

    #[test]
    fn test_excess_preamble_abandoned() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);
        dmx.start_data(0).unwrap();

        feed_raw(&ports, 0, 0, &[DISCOVERY_PREAMBLE; 8]);

        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
        assert!(dmx.rdm_receive(0).unwrap().is_none());
    }

    #[test]
    fn test_stray_byte_in_idle_ignored() {
        let ports = mock::ports::<1>();
        let (_dmx, _) = mock::engine(&ports);
        let port = ports.port(0).unwrap();
        port.start(&ports.shared);

        feed(&ports, 0, 0, RxEvent::Data(0x42));

        assert_eq!(port.receive_state(), RxState::Idle);
        assert_eq!(hw(&ports, 0).state().armed, None);
    }

    #[test]
    fn test_events_ignored_while_idle() {
        let ports = mock::ports::<1>();
        let (mut dmx, _) = mock::engine(&ports);

        feed_frame(&ports, 0, 0, &counting_frame(2));

        assert!(hw(&ports, 0).state().rx.is_empty());
        assert_eq!(ports.port(0).unwrap().receive_state(), RxState::Idle);
        assert!(dmx.dmx_available(0).unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_arbitrary_traffic_yields_well_formed_frames(
            events in proptest::collection::vec(
                (prop::bool::weighted(0.02), any::<u8>(), 1u32..120),
                0..1_200,
            )
        ) {
            let ports = mock::ports::<1>();
            let (mut dmx, _) = mock::engine(&ports);
            dmx.start_data(0).unwrap();

            let mut at = 0u32;
            for (is_break, byte, gap) in events {
                at += gap;
                let event = if is_break { RxEvent::Break } else { RxEvent::Data(byte) };
                feed(&ports, 0, at, event);
                if gap > 100 {
                    at += gap;
                    expire(&ports, 0, at);
                }
            }

            while let Some(frame) = dmx.dmx_available(0).unwrap() {
                prop_assert!(frame.len() <= DMX_FRAME_SIZE);
                prop_assert_eq!(frame.start_code(), Some(DMX_START_CODE));
                prop_assert_eq!(usize::from(frame.statistics().slots_in_packet) + 1, frame.len());
            }
            while let Some(frame) = dmx.rdm_receive(0).unwrap() {
                prop_assert!(frame.len() <= RDM_FRAME_SIZE);
                match frame.data()[0] {
                    RDM_START_CODE => prop_assert_eq!(checksum(&frame.data()[..frame.len() - 2]),
                        u16::from_be_bytes([frame.data()[frame.len() - 2], frame.data()[frame.len() - 1]])),
                    first => {
                        prop_assert_eq!(first, DISCOVERY_PREAMBLE);
                        prop_assert!(frame.len() >= 1 + DISCOVERY_EUID_SIZE + DISCOVERY_ECS_SIZE);
                    }
                }
            }
        }
    }
}
