//! Frame ring between the receive interrupt and the application
//!
//! Single producer (the receive interrupt), single consumer (the
//! application). The producer fills the slot at `head` in place while bytes
//! arrive and publishes it by advancing `head`; the consumer copies slots out
//! into a [`Frame`] it owns and advances `tail`.
//!
//! Overflow overwrites the oldest unread frame. The producer never looks at
//! `tail`, so a consumer that fell behind finds `head - tail` larger than the
//! readable capacity and skips ahead. A copy that raced with the producer
//! reusing the slot is detected by re-reading `head` after the copy and is
//! discarded.
//!
//! Indices are free-running `u32` sequence numbers masked into the slot array,
//! so `N` must be a power of two. At most `N - 1` frames are readable: the
//! slot at `head` is always the one being written.

use portable_atomic::{fence, AtomicU16, AtomicU32, AtomicU8, Ordering};

use dmxio_protocol::{DMX_FRAME_SIZE, RDM_FRAME_SIZE};

/// Frames buffered per port on the DMX side
pub const DMX_RING_ENTRIES: usize = 8;

/// Frames buffered per port on the RDM side
pub const RDM_RING_ENTRIES: usize = 16;

/// Timing metadata captured with a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameStatistics {
    /// Data slots (DMX) or bytes (RDM) in the frame, start code excluded for
    /// DMX
    pub slots_in_packet: u16,
    /// Interval between the last two received bytes (µs)
    pub slot_to_slot: u32,
    /// Interval since the previous DMX break (µs); 0 for the first frame
    pub break_to_break: u32,
}

/// Consumer-owned copy of a received frame
#[derive(Clone, PartialEq, Eq)]
pub struct Frame<const LEN: usize> {
    data: [u8; LEN],
    length: usize,
    statistics: FrameStatistics,
}

/// A DMX512 frame: start code plus up to 512 slots
pub type DmxFrame = Frame<DMX_FRAME_SIZE>;

/// An RDM message with checksum, or a raw discovery response
pub type RdmFrame = Frame<RDM_FRAME_SIZE>;

impl<const LEN: usize> Frame<LEN> {
    pub const fn new() -> Self {
        Self {
            data: [0; LEN],
            length: 0,
            statistics: FrameStatistics {
                slots_in_packet: 0,
                slot_to_slot: 0,
                break_to_break: 0,
            },
        }
    }

    /// Received bytes, start code first
    pub fn data(&self) -> &[u8] {
        &self.data[..self.length]
    }

    pub fn start_code(&self) -> Option<u8> {
        self.data().first().copied()
    }

    /// Bytes after the start code
    pub fn slots(&self) -> &[u8] {
        self.data().get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn statistics(&self) -> &FrameStatistics {
        &self.statistics
    }
}

impl<const LEN: usize> Default for Frame<LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LEN: usize> core::fmt::Debug for Frame<LEN> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("length", &self.length)
            .field("start_code", &self.start_code())
            .field("statistics", &self.statistics)
            .finish()
    }
}

/// One pre-allocated ring entry, written in place by the producer
pub struct RingSlot<const LEN: usize> {
    data: [AtomicU8; LEN],
    length: AtomicU16,
    slots_in_packet: AtomicU16,
    slot_to_slot: AtomicU32,
    break_to_break: AtomicU32,
}

impl<const LEN: usize> RingSlot<LEN> {
    pub const fn new() -> Self {
        Self {
            data: [const { AtomicU8::new(0) }; LEN],
            length: AtomicU16::new(0),
            slots_in_packet: AtomicU16::new(0),
            slot_to_slot: AtomicU32::new(0),
            break_to_break: AtomicU32::new(0),
        }
    }

    /// Store one byte; writes past the end are dropped
    pub fn set_byte(&self, index: usize, byte: u8) {
        if let Some(cell) = self.data.get(index) {
            cell.store(byte, Ordering::Relaxed);
        }
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.data
            .get(index)
            .map_or(0, |cell| cell.load(Ordering::Relaxed))
    }

    pub fn set_length(&self, length: usize) {
        self.length
            .store(length.min(LEN) as u16, Ordering::Relaxed);
    }

    pub fn set_slots_in_packet(&self, slots: u16) {
        self.slots_in_packet.store(slots, Ordering::Relaxed);
    }

    pub fn set_slot_to_slot(&self, micros: u32) {
        self.slot_to_slot.store(micros, Ordering::Relaxed);
    }

    pub fn set_break_to_break(&self, micros: u32) {
        self.break_to_break.store(micros, Ordering::Relaxed);
    }

    fn copy_into(&self, out: &mut Frame<LEN>) {
        let length = usize::from(self.length.load(Ordering::Relaxed)).min(LEN);
        for (dst, src) in out.data[..length].iter_mut().zip(self.data.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        out.length = length;
        out.statistics = FrameStatistics {
            slots_in_packet: self.slots_in_packet.load(Ordering::Relaxed),
            slot_to_slot: self.slot_to_slot.load(Ordering::Relaxed),
            break_to_break: self.break_to_break.load(Ordering::Relaxed),
        };
    }
}

impl<const LEN: usize> Default for RingSlot<LEN> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free overwrite-oldest frame ring
pub struct FrameRing<const LEN: usize, const N: usize> {
    slots: [RingSlot<LEN>; N],
    head: AtomicU32,
    tail: AtomicU32,
}

impl<const LEN: usize, const N: usize> FrameRing<LEN, N> {
    const POWER_OF_TWO: () = assert!(N >= 2 && N.is_power_of_two(), "ring size must be a power of two");

    const MASK: u32 = (N as u32).wrapping_sub(1);

    /// Frames readable before the oldest is overwritten
    pub const CAPACITY: u32 = (N as u32).wrapping_sub(1);

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::POWER_OF_TWO;

        Self {
            slots: [const { RingSlot::new() }; N],
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
        }
    }

    fn slot(&self, sequence: u32) -> &RingSlot<LEN> {
        &self.slots[(sequence & Self::MASK) as usize]
    }

    // Producer side

    /// Slot the producer is currently filling
    pub fn writer(&self) -> &RingSlot<LEN> {
        self.slot(self.head.load(Ordering::Relaxed))
    }

    /// Make the writer slot visible to the consumer and move to the next one
    pub fn publish(&self) {
        let head = self.head.load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        // Writes to the next slot must not become visible before the new head
        fence(Ordering::Release);
    }

    // Consumer side

    /// Copy the oldest unread frame into `out` and consume it
    ///
    /// Returns `false` when nothing is waiting.
    pub fn pop_into(&self, out: &mut Frame<LEN>) -> bool {
        self.pop_into_with(out, || {})
    }

    /// [`pop_into`](Self::pop_into) with `after_copy` run between the copy
    /// and the overwrite check
    fn pop_into_with(&self, out: &mut Frame<LEN>, mut after_copy: impl FnMut()) -> bool {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let mut tail = self.tail.load(Ordering::Relaxed);
            if head == tail {
                return false;
            }
            if head.wrapping_sub(tail) > Self::CAPACITY {
                tail = head.wrapping_sub(Self::CAPACITY);
            }

            self.slot(tail).copy_into(out);
            after_copy();
            if self.still_valid(tail) {
                self.tail.store(tail.wrapping_add(1), Ordering::Release);
                return true;
            }
        }
    }

    /// Copy the most recently published frame into `out` without consuming
    /// anything
    pub fn latest_into(&self, out: &mut Frame<LEN>) -> bool {
        loop {
            let head = self.head.load(Ordering::Acquire);
            if head == 0 && self.tail.load(Ordering::Relaxed) == 0 {
                return false;
            }
            let sequence = head.wrapping_sub(1);
            self.slot(sequence).copy_into(out);
            if self.still_valid(sequence) {
                return true;
            }
        }
    }

    /// Unread frame count, saturated at the readable capacity
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail).min(Self::CAPACITY) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything unread
    pub fn clear(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Whether the copy just taken of `sequence` predates any rewrite of its
    /// slot
    fn still_valid(&self, sequence: u32) -> bool {
        fence(Ordering::Acquire);
        // The producer starts rewriting this slot once head reaches
        // sequence + N
        let head = self.head.load(Ordering::Relaxed);
        head.wrapping_sub(sequence) <= Self::CAPACITY
    }
}

impl<const LEN: usize, const N: usize> Default for FrameRing<LEN, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type SmallRing = FrameRing<8, 4>;

    fn publish(ring: &SmallRing, marker: u8, length: usize) {
        let slot = ring.writer();
        for i in 0..length {
            slot.set_byte(i, marker);
        }
        slot.set_length(length);
        slot.set_slots_in_packet(length as u16);
        ring.publish();
    }

    #[test]
    fn test_empty_ring() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        assert!(!ring.pop_into(&mut frame));
        assert!(!ring.latest_into(&mut frame));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        publish(&ring, 1, 3);
        publish(&ring, 2, 5);

        assert_eq!(ring.len(), 2);
        assert!(ring.pop_into(&mut frame));
        assert_eq!(frame.data(), &[1, 1, 1]);
        assert!(ring.pop_into(&mut frame));
        assert_eq!(frame.data(), &[2; 5]);
        assert_eq!(frame.statistics().slots_in_packet, 5);
        assert!(!ring.pop_into(&mut frame));
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        // Readable capacity is N - 1 = 3; the fourth publish laps the first
        for marker in 1..=4 {
            publish(&ring, marker, 2);
        }

        assert_eq!(ring.len(), 3);
        for expected in 2..=4 {
            assert!(ring.pop_into(&mut frame));
            assert_eq!(frame.data(), &[expected, expected]);
        }
        assert!(!ring.pop_into(&mut frame));
    }

    #[test]
    fn test_far_behind_consumer_skips_ahead() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        for marker in 1..=11 {
            publish(&ring, marker, 1);
        }

        assert!(ring.pop_into(&mut frame));
        assert_eq!(frame.data(), &[9]);
    }

    #[test]
    fn test_frame_overwritten_during_copy_is_discarded() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        for marker in 1..=3 {
            publish(&ring, marker, usize::from(marker));
        }

        let mut copies = 0;
        assert!(ring.pop_into_with(&mut frame, || {
            copies += 1;
            if copies == 1 {
                // Laps the slot being read
                publish(&ring, 4, 4);
                publish(&ring, 5, 5);
            }
        }));

        assert_eq!(copies, 2);
        assert_eq!(frame.data(), &[3, 3, 3]);
        assert_eq!(frame.statistics().slots_in_packet, 3);
        for expected in 4..=5 {
            assert!(ring.pop_into(&mut frame));
            assert_eq!(frame.data(), vec![expected; usize::from(expected)].as_slice());
        }
        assert!(!ring.pop_into(&mut frame));
    }

    #[test]
    fn test_concurrent_producer_never_yields_torn_frame() {
        let ring = SmallRing::new();
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for sequence in 0..20_000u32 {
                    let marker = (sequence % 251) as u8;
                    publish(&ring, marker, 1 + (sequence % 8) as usize);
                    if sequence % 16 == 0 {
                        std::thread::yield_now();
                    }
                }
                done.store(true, std::sync::atomic::Ordering::Release);
            });

            let mut frame = Frame::new();
            loop {
                let finished = done.load(std::sync::atomic::Ordering::Acquire);
                while ring.pop_into(&mut frame) {
                    let marker = frame.data()[0];
                    assert!(frame.data().iter().all(|&b| b == marker));
                    assert_eq!(usize::from(frame.statistics().slots_in_packet), frame.len());
                }
                if finished {
                    break;
                }
                std::thread::yield_now();
            }
        });
    }

    #[test]
    fn test_latest_does_not_consume() {
        let ring = SmallRing::new();
        let mut frame = Frame::new();
        publish(&ring, 7, 2);
        publish(&ring, 8, 2);

        assert!(ring.latest_into(&mut frame));
        assert_eq!(frame.data(), &[8, 8]);
        assert_eq!(ring.len(), 2);

        ring.clear();
        assert!(ring.is_empty());
        // Still remembers the last frame after the unread ones are dropped
        assert!(ring.latest_into(&mut frame));
        assert_eq!(frame.data(), &[8, 8]);
    }

    #[test]
    fn test_frame_accessors() {
        let ring = FrameRing::<DMX_FRAME_SIZE, DMX_RING_ENTRIES>::new();
        let slot = ring.writer();
        slot.set_byte(0, 0x00);
        slot.set_byte(1, 0x10);
        slot.set_byte(2, 0x20);
        slot.set_length(3);
        ring.publish();

        let mut frame = DmxFrame::new();
        assert!(ring.pop_into(&mut frame));
        assert_eq!(frame.start_code(), Some(0x00));
        assert_eq!(frame.slots(), &[0x10, 0x20]);
        assert_eq!(frame.len(), 3);
    }
}
