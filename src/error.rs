//! Error types for the visca library.

use thiserror::Error;

use crate::protocol::DeviceErrorCode;

/// The main error type for visca operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error outside of a request/reply exchange.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request could not be framed.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// No byte arrived before the per-byte read timeout.
    #[error("timed out waiting for reply after {received} bytes")]
    ReadTimeout { received: usize },

    /// Reply buffer is empty or does not end with the terminator.
    #[error("malformed reply: {}", hex::encode(.reply))]
    MalformedReply { reply: Vec<u8> },

    /// The reply read during an exchange was not terminated.
    #[error("reply not terminated: {}", hex::encode(.reply))]
    NotTerminated { reply: Vec<u8> },

    /// Address enumeration did not find any device.
    #[error("address enumeration failed: {reason}")]
    EnumerationFailed { reason: String },

    /// The device answered with an error reply.
    #[error("device error on socket {socket}: {code}")]
    Device { socket: u8, code: DeviceErrorCode },

    /// An inquiry never produced a data-bearing reply.
    #[error("inquiry got no data after {attempts} attempts (last reply: {})", hex::encode(.last_reply))]
    InquiryExhausted { attempts: usize, last_reply: Vec<u8> },

    /// The link failed during an exchange; the session must be rebuilt or restarted.
    #[error("serial link lost: {0}")]
    LinkLost(#[source] std::io::Error),

    /// The session has not completed `start()`.
    #[error("session not started")]
    NotStarted,

    /// The reply was well formed but not what the operation expects.
    #[error("unexpected reply: {reason}")]
    UnexpectedReply { reason: String },

    /// An argument is outside its valid range.
    #[error("{what} {value} out of range ({min} to {max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl Error {
    /// Returns true for errors after which the session cannot be used as is.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Serial(_) | Self::LinkLost(_) | Self::EnumerationFailed { .. }
        )
    }

    pub(crate) fn out_of_range(
        what: &'static str,
        value: impl Into<i64>,
        min: i64,
        max: i64,
    ) -> Self {
        Self::OutOfRange {
            what,
            value: value.into(),
            min,
            max,
        }
    }

    pub(crate) fn unexpected(reason: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            reason: reason.into(),
        }
    }
}

/// Request framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Recipient is outside the device address range.
    #[error("invalid device address {id} (expected 1 to 7)")]
    InvalidAddress { id: u8 },

    /// Payload must carry at least one byte.
    #[error("empty payload")]
    EmptyPayload,

    /// Payload exceeds the 14 bytes a packet can carry.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Payload contains the terminator byte.
    #[error("payload contains terminator byte at offset {offset}")]
    TerminatorInPayload { offset: usize },
}

/// Result type alias for visca operations.
pub type Result<T> = std::result::Result<T, Error>;
