//! Reply classification.
//!
//! The first payload byte of a reply carries the reply class in its high
//! nibble and the socket number in its low nibble.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::packet::Packet;

/// High nibble of an acknowledgment.
pub const ACK_NIBBLE: u8 = 0x4;

/// High nibble of a completion.
pub const COMPLETION_NIBBLE: u8 = 0x5;

/// High nibble of an error reply.
pub const ERROR_NIBBLE: u8 = 0x6;

/// Payload of the network change notification.
pub const NETWORK_CHANGE: u8 = 0x38;

/// Error codes carried by an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorCode {
    /// Message could not be parsed.
    SyntaxError,
    /// Command buffer is full.
    BufferFull,
    /// Command was canceled.
    Canceled,
    /// Socket does not exist.
    InvalidSocket,
    /// Command cannot be executed in the current state.
    NotExecutable,
    /// Code outside the documented set.
    Other(u8),
}

impl DeviceErrorCode {
    /// Parses an error code byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x02 => Self::SyntaxError,
            0x03 => Self::BufferFull,
            0x04 => Self::Canceled,
            0x05 => Self::InvalidSocket,
            0x41 => Self::NotExecutable,
            other => Self::Other(other),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::SyntaxError => 0x02,
            Self::BufferFull => 0x03,
            Self::Canceled => 0x04,
            Self::InvalidSocket => 0x05,
            Self::NotExecutable => 0x41,
            Self::Other(byte) => byte,
        }
    }
}

impl fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError => f.write_str("syntax error"),
            Self::BufferFull => f.write_str("command buffer full"),
            Self::Canceled => f.write_str("command canceled"),
            Self::InvalidSocket => f.write_str("invalid socket"),
            Self::NotExecutable => f.write_str("command not executable"),
            Self::Other(code) => write!(f, "unknown error 0x{code:02x}"),
        }
    }
}

/// Reply classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// Command accepted into a socket.
    Ack { socket: u8 },
    /// Command finished; inquiries carry their answer in `data`.
    Completion { socket: u8, data: Vec<u8> },
    /// Command rejected.
    Error { socket: u8, code: DeviceErrorCode },
    /// Bus topology changed; addresses must be assigned again.
    NetworkChange,
    /// Anything else; the caller interprets the payload itself.
    Opaque,
}

impl ReplyKind {
    /// Returns the socket this reply refers to, if any.
    #[must_use]
    pub const fn socket(&self) -> Option<u8> {
        match self {
            Self::Ack { socket } | Self::Completion { socket, .. } | Self::Error { socket, .. } => {
                Some(*socket)
            }
            Self::NetworkChange | Self::Opaque => None,
        }
    }
}

/// Classifies a reply packet.
///
/// A network change is only recognized when broadcast.
#[must_use]
pub fn classify(packet: &Packet) -> ReplyKind {
    let payload = packet.payload();
    let Some(&first) = payload.first() else {
        return ReplyKind::Opaque;
    };

    if packet.is_broadcast() && payload == [NETWORK_CHANGE] {
        return ReplyKind::NetworkChange;
    }

    let socket = first & 0x0F;
    match first >> 4 {
        ACK_NIBBLE => ReplyKind::Ack { socket },
        COMPLETION_NIBBLE => ReplyKind::Completion {
            socket,
            data: payload[1..].to_vec(),
        },
        ERROR_NIBBLE if payload.len() == 2 => ReplyKind::Error {
            socket,
            code: DeviceErrorCode::from_byte(payload[1]),
        },
        _ => ReplyKind::Opaque,
    }
}

/// Classifies a reply and turns an error reply into [`Error::Device`].
pub fn check(packet: &Packet) -> Result<ReplyKind> {
    match classify(packet) {
        ReplyKind::Error { socket, code } => Err(Error::Device { socket, code }),
        kind => Ok(kind),
    }
}
