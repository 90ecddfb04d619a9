//! Packet framing for the VISCA protocol.
//!
//! Every packet on the bus has the same shape:
//! ```text
//! ┌────────────────────────┬──────────────┬────────────┐
//! │ 1 S2 S1 S0 B R2 R1 R0  │   payload    │    0xFF    │
//! │        1 byte          │  1-14 bytes  │   1 byte   │
//! └────────────────────────┴──────────────┴────────────┘
//! ```
//! `S` is the sender (the controller is always 0), `B` the broadcast flag and
//! `R` the recipient.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, PacketError, Result};

/// Packet terminator byte.
pub const TERMINATOR: u8 = 0xFF;

/// Header bit that is always set.
pub const HEADER_MARKER: u8 = 0x80;

/// Header bit flagging a broadcast.
pub const BROADCAST_FLAG: u8 = 0x08;

/// Header of a broadcast packet sent by the controller.
pub const BROADCAST_HEADER: u8 = HEADER_MARKER | BROADCAST_FLAG;

/// Address of the controller on the bus.
pub const CONTROLLER_ID: u8 = 0;

/// Maximum packet size including header and terminator.
pub const MAX_PACKET_SIZE: usize = 16;

/// Minimum packet size (header, one payload byte, terminator).
pub const MIN_PACKET_SIZE: usize = 3;

/// Maximum payload size.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - 2;

/// Highest device address on a bus.
pub const MAX_DEVICE_ADDRESS: u8 = 7;

/// Destination of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// All devices on the bus.
    Broadcast,
    /// A single device (1-7).
    Device(u8),
}

impl Address {
    /// Creates a device address, checking the 1-7 range.
    pub fn device(id: u8) -> Result<Self> {
        if (1..=MAX_DEVICE_ADDRESS).contains(&id) {
            Ok(Self::Device(id))
        } else {
            Err(Error::out_of_range(
                "device address",
                id,
                1,
                i64::from(MAX_DEVICE_ADDRESS),
            ))
        }
    }

    /// Returns the low four header bits for this address.
    #[must_use]
    pub const fn header_bits(self) -> u8 {
        match self {
            Self::Broadcast => BROADCAST_FLAG,
            Self::Device(id) => id & 0b111,
        }
    }

    /// Returns true for the broadcast address.
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        matches!(self, Self::Broadcast)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("*"),
            Self::Device(id) => write!(f, "{id}"),
        }
    }
}

/// Whether a packet was sent by us or received from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Outbound request.
    Request,
    /// Inbound reply.
    Reply,
}

/// A complete, terminated packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Bytes,
    direction: Direction,
}

impl Packet {
    /// Returns the raw bytes including header and terminator.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the raw bytes as a cheaply clonable buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Returns the packet length including header and terminator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a packet holds at least its terminator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the packet direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the header byte.
    #[must_use]
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// Returns the bytes between header and terminator.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        if self.bytes.len() < 2 {
            return &[];
        }
        &self.bytes[1..self.bytes.len() - 1]
    }

    /// Returns the sender id from the header.
    #[must_use]
    pub fn sender(&self) -> u8 {
        (self.header() >> 4) & 0b111
    }

    /// Returns true if the broadcast flag is set.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.header() & BROADCAST_FLAG != 0
    }

    /// Returns the recipient encoded in the header.
    #[must_use]
    pub fn recipient(&self) -> Address {
        if self.is_broadcast() {
            Address::Broadcast
        } else {
            Address::Device(self.header() & 0b111)
        }
    }

    /// Returns the data carried after the socket byte.
    ///
    /// For completions and inquiry answers this is the reply value.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.payload().get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipient = if self.is_broadcast() {
            "*".to_string()
        } else {
            (self.header() & 0b111).to_string()
        };
        write!(
            f,
            "[{} => {}] len={} {}",
            self.sender(),
            recipient,
            self.len(),
            hex::encode(&self.bytes)
        )
    }
}

/// Frames a payload into a request packet for `recipient`.
///
/// # Errors
///
/// Returns a `PacketError` if the recipient is not a valid device address,
/// or if the payload is empty, longer than [`MAX_PAYLOAD_SIZE`], or contains
/// the terminator byte.
pub fn build_request(recipient: Address, payload: &[u8]) -> Result<Packet> {
    if let Address::Device(id) = recipient {
        if !(1..=MAX_DEVICE_ADDRESS).contains(&id) {
            return Err(PacketError::InvalidAddress { id }.into());
        }
    }
    if payload.is_empty() {
        return Err(PacketError::EmptyPayload.into());
    }
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(PacketError::TooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        }
        .into());
    }
    if let Some(offset) = payload.iter().position(|&b| b == TERMINATOR) {
        return Err(PacketError::TerminatorInPayload { offset }.into());
    }

    let mut buf = BytesMut::with_capacity(payload.len() + 2);
    buf.put_u8(HEADER_MARKER | (CONTROLLER_ID << 4) | recipient.header_bits());
    buf.put_slice(payload);
    buf.put_u8(TERMINATOR);

    Ok(Packet {
        bytes: buf.freeze(),
        direction: Direction::Request,
    })
}

/// Validates a received buffer and wraps it as a reply packet.
///
/// # Errors
///
/// Returns `MalformedReply` if the buffer is empty or its last byte is not
/// the terminator.
pub fn validate_reply(bytes: impl Into<Bytes>) -> Result<Packet> {
    let bytes = bytes.into();
    if bytes.last() != Some(&TERMINATOR) {
        return Err(Error::MalformedReply {
            reply: bytes.to_vec(),
        });
    }
    Ok(Packet {
        bytes,
        direction: Direction::Reply,
    })
}
