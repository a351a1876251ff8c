//! RDM unique IDs and the discovery-response encoding
//!
//! A responder answers DISC_UNIQUE_BRANCH without break or mark: up to seven
//! 0xFE preamble bytes, the 0xAA separator, then its UID and checksum with
//! every byte sent twice (OR-ed with 0xAA and with 0x55) so that collisions
//! between responders still decode to something recognisably broken.

use crate::rdm::{checksum, RdmError};

/// Preamble byte of a discovery response
pub const DISCOVERY_PREAMBLE: u8 = 0xFE;

/// Separator that ends the preamble
pub const DISCOVERY_SEPARATOR: u8 = 0xAA;

/// Preamble bytes a responder may send
pub const DISCOVERY_MAX_PREAMBLE: usize = 7;

/// Encoded UID bytes after the separator
pub const DISCOVERY_EUID_SIZE: usize = 12;

/// Encoded checksum bytes after the EUID
pub const DISCOVERY_ECS_SIZE: usize = 4;

/// Longest discovery response on the wire
pub const DISCOVERY_RESPONSE_SIZE: usize =
    DISCOVERY_MAX_PREAMBLE + 1 + DISCOVERY_EUID_SIZE + DISCOVERY_ECS_SIZE;

/// 48-bit RDM unique ID: 16-bit manufacturer, 32-bit device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uid([u8; 6]);

impl Uid {
    /// All devices of all manufacturers
    pub const BROADCAST: Uid = Uid([0xFF; 6]);

    /// Build from manufacturer and device ID
    pub const fn new(manufacturer: u16, device: u32) -> Self {
        let m = manufacturer.to_be_bytes();
        let d = device.to_be_bytes();
        Self([m[0], m[1], d[0], d[1], d[2], d[3]])
    }

    /// Wrap raw big-endian bytes
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Copy from the first six bytes of `bytes`
    ///
    /// Callers pass a slice of at least six bytes.
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        let mut uid = [0u8; 6];
        uid.copy_from_slice(&bytes[..6]);
        Self(uid)
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn manufacturer(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    pub fn device(&self) -> u32 {
        u32::from_be_bytes([self.0[2], self.0[3], self.0[4], self.0[5]])
    }

    /// Lower 48 bits of a u64
    pub fn from_u64(value: u64) -> Self {
        let b = value.to_be_bytes();
        Self([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn to_u64(&self) -> u64 {
        let mut b = [0u8; 8];
        b[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(b)
    }

    /// Broadcast to everyone, or to every device of one manufacturer
    pub fn is_broadcast(&self) -> bool {
        self.0[2..] == [0xFF; 4]
    }
}

/// Decoded discovery response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryResponse {
    pub uid: Uid,
}

impl DiscoveryResponse {
    pub const fn new(uid: Uid) -> Self {
        Self { uid }
    }

    /// Full-length response: seven preamble bytes, separator, EUID, ECS
    pub fn encode(&self) -> [u8; DISCOVERY_RESPONSE_SIZE] {
        let mut out = [DISCOVERY_PREAMBLE; DISCOVERY_RESPONSE_SIZE];
        out[DISCOVERY_MAX_PREAMBLE] = DISCOVERY_SEPARATOR;

        let euid_start = DISCOVERY_MAX_PREAMBLE + 1;
        let euid = &mut out[euid_start..euid_start + DISCOVERY_EUID_SIZE];
        for (pair, &byte) in euid.chunks_exact_mut(2).zip(self.uid.as_bytes()) {
            pair[0] = byte | 0xAA;
            pair[1] = byte | 0x55;
        }

        let sum = checksum(&out[euid_start..euid_start + DISCOVERY_EUID_SIZE]);
        let ecs_start = euid_start + DISCOVERY_EUID_SIZE;
        for (pair, byte) in out[ecs_start..]
            .chunks_exact_mut(2)
            .zip(sum.to_be_bytes())
        {
            pair[0] = byte | 0xAA;
            pair[1] = byte | 0x55;
        }

        out
    }

    /// Decode a received response, tolerating 0-7 preamble bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, RdmError> {
        let preamble = bytes
            .iter()
            .take_while(|&&b| b == DISCOVERY_PREAMBLE)
            .count();
        if preamble > DISCOVERY_MAX_PREAMBLE {
            return Err(RdmError::InvalidPreamble);
        }
        match bytes.get(preamble) {
            Some(&DISCOVERY_SEPARATOR) => {}
            Some(_) => return Err(RdmError::InvalidPreamble),
            None => return Err(RdmError::TooShort),
        }

        let body = &bytes[preamble + 1..];
        if body.len() < DISCOVERY_EUID_SIZE + DISCOVERY_ECS_SIZE {
            return Err(RdmError::TooShort);
        }
        let (euid, rest) = body.split_at(DISCOVERY_EUID_SIZE);

        let mut uid = [0u8; 6];
        for (out, pair) in uid.iter_mut().zip(euid.chunks_exact(2)) {
            *out = pair[0] & pair[1];
        }

        let expected = u16::from_be_bytes([rest[0] & rest[1], rest[2] & rest[3]]);
        if checksum(euid) != expected {
            return Err(RdmError::InvalidChecksum);
        }

        Ok(Self { uid: Uid(uid) })
    }
}
