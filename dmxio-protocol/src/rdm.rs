//! RDM (E1.20) message framing
//!
//! Message format:
//! - START CODE (1 byte): 0xCC
//! - SUB-START CODE (1 byte): 0x01
//! - MESSAGE LENGTH (1 byte): bytes from START CODE through the last PD byte
//! - DESTINATION UID (6 bytes), SOURCE UID (6 bytes)
//! - TRANSACTION, PORT ID / RESPONSE TYPE, MESSAGE COUNT (1 byte each)
//! - SUB-DEVICE (2 bytes), COMMAND CLASS (1 byte), PARAMETER ID (2 bytes)
//! - PDL (1 byte) and PD (0-231 bytes)
//! - CHECKSUM (2 bytes): 16-bit sum of every preceding byte, big-endian
//!
//! Only the transport layer lives here; parameter data is opaque.

use heapless::Vec;

use crate::discovery::Uid;

/// RDM start code
pub const RDM_START_CODE: u8 = 0xCC;

/// Sub-start code of a standard message
pub const RDM_SUB_START_CODE: u8 = 0x01;

/// Message length of a message with no parameter data
pub const RDM_MESSAGE_MIN_LENGTH: usize = 24;

/// Largest value of the message-length field
pub const RDM_MESSAGE_MAX_LENGTH: usize = 255;

/// Largest parameter data block
pub const RDM_MAX_PARAMETER_DATA: usize = RDM_MESSAGE_MAX_LENGTH - RDM_MESSAGE_MIN_LENGTH;

/// Largest message plus its checksum
pub const RDM_FRAME_SIZE: usize = RDM_MESSAGE_MAX_LENGTH + 2;

/// Break a controller or responder sends before an RDM message (µs)
pub const RDM_TRANSMIT_BREAK_TIME: u32 = 176;

/// Mark-after-break sent before an RDM message (µs)
pub const RDM_TRANSMIT_MAB_TIME: u32 = 12;

/// Minimum gap a responder leaves after the controller's packet (µs)
pub const RDM_RESPONDER_PACKET_SPACING: u32 = 200;

/// Settle time around a line turnaround (µs)
pub const RDM_DATA_DIRECTION_DELAY: u32 = 4;

const OFFSET_MESSAGE_LENGTH: usize = 2;
const OFFSET_DESTINATION: usize = 3;
const OFFSET_SOURCE: usize = 9;
const OFFSET_TRANSACTION: usize = 15;
const OFFSET_PORT_ID: usize = 16;
const OFFSET_MESSAGE_COUNT: usize = 17;
const OFFSET_SUB_DEVICE: usize = 18;
const OFFSET_COMMAND_CLASS: usize = 20;
const OFFSET_PARAMETER_ID: usize = 21;
const OFFSET_PDL: usize = 23;

/// Errors from RDM encoding and decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RdmError {
    /// Fewer bytes than the smallest valid message
    TooShort,
    /// First byte is not 0xCC
    InvalidStartCode,
    /// Second byte is not 0x01
    InvalidSubStartCode,
    /// Message-length field disagrees with the bytes present
    LengthMismatch,
    /// Trailing checksum does not match
    InvalidChecksum,
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Parameter data exceeds 231 bytes
    PayloadTooLarge,
    /// Discovery response without a valid preamble / separator
    InvalidPreamble,
}

/// 16-bit additive checksum used by RDM
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

/// Check the trailing checksum of a complete message (length + 2 bytes)
pub fn verify_checksum(frame: &[u8]) -> Result<(), RdmError> {
    if frame.len() < 3 {
        return Err(RdmError::TooShort);
    }
    let (message, trailer) = frame.split_at(frame.len() - 2);
    if checksum(message) == u16::from_be_bytes([trailer[0], trailer[1]]) {
        Ok(())
    } else {
        Err(RdmError::InvalidChecksum)
    }
}

/// Command class byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandClass {
    DiscoveryCommand = 0x10,
    DiscoveryCommandResponse = 0x11,
    GetCommand = 0x20,
    GetCommandResponse = 0x21,
    SetCommand = 0x30,
    SetCommandResponse = 0x31,
}

impl CommandClass {
    /// Decode a command class byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x10 => Some(Self::DiscoveryCommand),
            0x11 => Some(Self::DiscoveryCommandResponse),
            0x20 => Some(Self::GetCommand),
            0x21 => Some(Self::GetCommandResponse),
            0x30 => Some(Self::SetCommand),
            0x31 => Some(Self::SetCommandResponse),
            _ => None,
        }
    }

    /// Whether this class is sent by a responder
    pub fn is_response(self) -> bool {
        (self as u8) & 0x01 != 0
    }
}

/// A standard RDM message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmMessage {
    pub destination: Uid,
    pub source: Uid,
    pub transaction: u8,
    /// Port ID in requests, response type in responses
    pub port_id: u8,
    pub message_count: u8,
    pub sub_device: u16,
    /// Raw command class; see [`CommandClass`]
    pub command_class: u8,
    pub parameter_id: u16,
    pub parameter_data: Vec<u8, RDM_MAX_PARAMETER_DATA>,
}

impl RdmMessage {
    /// Create a message with the given addressing and parameter data
    pub fn new(
        destination: Uid,
        source: Uid,
        command_class: CommandClass,
        parameter_id: u16,
        parameter_data: &[u8],
    ) -> Result<Self, RdmError> {
        let mut data = Vec::new();
        data.extend_from_slice(parameter_data)
            .map_err(|_| RdmError::PayloadTooLarge)?;

        Ok(Self {
            destination,
            source,
            transaction: 0,
            port_id: 1,
            message_count: 0,
            sub_device: 0,
            command_class: command_class as u8,
            parameter_id,
            parameter_data: data,
        })
    }

    /// Value of the message-length field
    pub fn message_length(&self) -> usize {
        RDM_MESSAGE_MIN_LENGTH + self.parameter_data.len()
    }

    /// Encode into `buffer`, checksum included
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, RdmError> {
        let length = self.message_length();
        if buffer.len() < length + 2 {
            return Err(RdmError::BufferTooSmall);
        }

        buffer[0] = RDM_START_CODE;
        buffer[1] = RDM_SUB_START_CODE;
        buffer[OFFSET_MESSAGE_LENGTH] = length as u8;
        buffer[OFFSET_DESTINATION..OFFSET_SOURCE].copy_from_slice(self.destination.as_bytes());
        buffer[OFFSET_SOURCE..OFFSET_TRANSACTION].copy_from_slice(self.source.as_bytes());
        buffer[OFFSET_TRANSACTION] = self.transaction;
        buffer[OFFSET_PORT_ID] = self.port_id;
        buffer[OFFSET_MESSAGE_COUNT] = self.message_count;
        buffer[OFFSET_SUB_DEVICE..OFFSET_COMMAND_CLASS]
            .copy_from_slice(&self.sub_device.to_be_bytes());
        buffer[OFFSET_COMMAND_CLASS] = self.command_class;
        buffer[OFFSET_PARAMETER_ID..OFFSET_PDL].copy_from_slice(&self.parameter_id.to_be_bytes());
        buffer[OFFSET_PDL] = self.parameter_data.len() as u8;
        buffer[RDM_MESSAGE_MIN_LENGTH..length].copy_from_slice(&self.parameter_data);

        let sum = checksum(&buffer[..length]);
        buffer[length..length + 2].copy_from_slice(&sum.to_be_bytes());

        Ok(length + 2)
    }

    /// Encode into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, RDM_FRAME_SIZE>, RdmError> {
        let mut buffer = [0u8; RDM_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| RdmError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode a received message (start code through checksum)
    pub fn parse(frame: &[u8]) -> Result<Self, RdmError> {
        if frame.len() < RDM_MESSAGE_MIN_LENGTH + 2 {
            return Err(RdmError::TooShort);
        }
        if frame[0] != RDM_START_CODE {
            return Err(RdmError::InvalidStartCode);
        }
        if frame[1] != RDM_SUB_START_CODE {
            return Err(RdmError::InvalidSubStartCode);
        }

        let length = usize::from(frame[OFFSET_MESSAGE_LENGTH]);
        if length < RDM_MESSAGE_MIN_LENGTH || frame.len() < length + 2 {
            return Err(RdmError::LengthMismatch);
        }
        let pdl = usize::from(frame[OFFSET_PDL]);
        if RDM_MESSAGE_MIN_LENGTH + pdl != length {
            return Err(RdmError::LengthMismatch);
        }
        verify_checksum(&frame[..length + 2])?;

        let mut parameter_data = Vec::new();
        parameter_data
            .extend_from_slice(&frame[RDM_MESSAGE_MIN_LENGTH..length])
            .map_err(|_| RdmError::PayloadTooLarge)?;

        Ok(Self {
            destination: Uid::from_slice(&frame[OFFSET_DESTINATION..OFFSET_SOURCE]),
            source: Uid::from_slice(&frame[OFFSET_SOURCE..OFFSET_TRANSACTION]),
            transaction: frame[OFFSET_TRANSACTION],
            port_id: frame[OFFSET_PORT_ID],
            message_count: frame[OFFSET_MESSAGE_COUNT],
            sub_device: u16::from_be_bytes([
                frame[OFFSET_SUB_DEVICE],
                frame[OFFSET_SUB_DEVICE + 1],
            ]),
            command_class: frame[OFFSET_COMMAND_CLASS],
            parameter_id: u16::from_be_bytes([
                frame[OFFSET_PARAMETER_ID],
                frame[OFFSET_PARAMETER_ID + 1],
            ]),
            parameter_data,
        })
    }
}
