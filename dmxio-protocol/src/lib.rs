//! DMX512 / RDM wire formats
//!
//! Constants and codecs shared by the transceiver core and anything that
//! builds or inspects frames above it.
//!
//! # Frame Overview
//!
//! DMX512 packet, after break and mark-after-break:
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ START CODE │ SLOTS                    │
//! │ 0x00       │ 1–512B                   │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! RDM message, after break and mark-after-break:
//! ```text
//! ┌──────┬──────┬─────┬──────────────────┬────────┬────────┐
//! │ 0xCC │ 0x01 │ LEN │ HEADER + PD      │ CK_HI  │ CK_LO  │
//! │ 1B   │ 1B   │ 1B  │ 21B + 0–231B     │ 1B     │ 1B     │
//! └──────┴──────┴─────┴──────────────────┴────────┴────────┘
//! ```
//!
//! RDM discovery response, sent without break:
//! ```text
//! ┌────────────┬──────┬──────────────┬──────────────┐
//! │ 0xFE × 0–7 │ 0xAA │ EUID         │ ECS          │
//! │            │ 1B   │ 12B          │ 4B           │
//! └────────────┴──────┴──────────────┴──────────────┘
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod discovery;
pub mod dmx;
pub mod rdm;

pub use discovery::{DiscoveryResponse, Uid, DISCOVERY_RESPONSE_SIZE};
pub use dmx::{DMX_FRAME_SIZE, DMX_MAX_SLOTS, DMX_START_CODE};
pub use rdm::{
    checksum, CommandClass, RdmError, RdmMessage, RDM_FRAME_SIZE, RDM_START_CODE,
    RDM_SUB_START_CODE,
};
