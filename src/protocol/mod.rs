//! Protocol definitions for VISCA communication.
//!
//! This module contains the low-level protocol types including:
//! - Nibble encoding of numeric fields
//! - Packet framing and validation
//! - Reply classification
//! - Command opcodes and payload templates
//! - Reply data parsing

pub mod command;
pub mod nibble;
pub mod packet;
pub mod parser;
pub mod reply;

pub use command::{CameraFunction, Category, MessageType};
pub use nibble::{decode_word16, encode_word16};
pub use packet::{
    Address, Direction, MAX_PACKET_SIZE, Packet, TERMINATOR, build_request, validate_reply,
};
pub use reply::{DeviceErrorCode, ReplyKind, check as check_reply, classify};
