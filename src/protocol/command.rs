//! Command opcodes and payload templates.
//!
//! Every request payload starts with a message type byte (command or
//! inquiry) and a category byte, followed by the function opcode and its
//! arguments:
//! ```text
//! [type:1] [category:1] [function:1] [args...]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::nibble::{encode_byte, encode_word16};
use crate::types::{
    Datascreen, DigitalEffect, MemoryAction, OnOff, PictureEffect, ZoomDirection,
};

/// Message type of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Changes device state; answered by ACK and COMPLETION.
    Command = 0x01,
    /// Reads device state; the COMPLETION carries data.
    Inquiry = 0x09,
}

impl From<MessageType> for u8 {
    fn from(msg: MessageType) -> Self {
        msg as Self
    }
}

/// Function categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    /// Bus interface.
    Interface = 0x00,
    /// Camera block.
    Camera = 0x04,
    /// Pan-tilter.
    PanTilter = 0x06,
}

impl From<Category> for u8 {
    fn from(cat: Category) -> Self {
        cat as Self
    }
}

/// Camera function opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CameraFunction {
    /// Power on/off.
    Power = 0x00,
    /// Digital zoom on/off.
    DigitalZoom = 0x06,
    /// Variable zoom.
    Zoom = 0x07,
    /// Aperture (detail) control.
    Aperture = 0x1F,
    /// Raw register access.
    Register = 0x24,
    /// Backlight compensation.
    Backlight = 0x33,
    /// Image stabilization.
    Stabilization = 0x34,
    /// Memory presets.
    Memory = 0x3F,
    /// Auto power off timer.
    AutoPowerOff = 0x40,
    /// Absolute zoom position.
    ZoomPosition = 0x47,
    /// High resolution mode.
    HighResolution = 0x52,
    /// Left/right reverse (mirror).
    Mirror = 0x61,
    /// Freeze frame.
    Freeze = 0x62,
    /// Picture effect.
    PictureEffect = 0x63,
    /// Digital effect.
    DigitalEffect = 0x64,
    /// Digital effect level.
    DigitalEffectLevel = 0x65,
    /// Up/down reverse (flip).
    Flip = 0x66,
}

impl From<CameraFunction> for u8 {
    fn from(func: CameraFunction) -> Self {
        func as Self
    }
}

/// Pan-tilter datascreen opcode.
pub const DATASCREEN: u8 = 0x06;

/// Address set opcode (broadcast only).
pub const ADDRESS_SET: u8 = 0x30;

/// Interface clear payload (broadcast).
pub const IF_CLEAR: [u8; 3] = [0x01, 0x00, 0x01];

/// Highest variable zoom speed.
pub const MAX_ZOOM_SPEED: u8 = 7;

/// Highest digital effect level.
pub const MAX_DIGITAL_EFFECT_LEVEL: u8 = 0x3F;

/// Highest memory preset slot.
pub const MAX_MEMORY_SLOT: u8 = 5;

/// Builds a payload from message type, category and opcode bytes.
#[must_use]
pub fn payload(msg: MessageType, category: Category, args: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + args.len());
    buf.put_u8(msg.into());
    buf.put_u8(category.into());
    buf.put_slice(args);
    buf.freeze()
}

/// Builds a camera command payload.
#[must_use]
pub fn camera(func: CameraFunction, args: &[u8]) -> Bytes {
    let mut body = Vec::with_capacity(1 + args.len());
    body.push(u8::from(func));
    body.extend_from_slice(args);
    payload(MessageType::Command, Category::Camera, &body)
}

/// Builds a camera inquiry payload.
#[must_use]
pub fn camera_inquiry(func: CameraFunction, args: &[u8]) -> Bytes {
    let mut body = Vec::with_capacity(1 + args.len());
    body.push(u8::from(func));
    body.extend_from_slice(args);
    payload(MessageType::Inquiry, Category::Camera, &body)
}

/// Address set payload announcing `first` as the first address.
#[must_use]
pub fn address_set(first: u8) -> Bytes {
    Bytes::copy_from_slice(&[ADDRESS_SET, first])
}

/// Power on/off.
#[must_use]
pub fn power(mode: OnOff) -> Bytes {
    camera(CameraFunction::Power, &[mode.to_byte()])
}

/// Auto power off after `minutes` without a command (0 disables).
#[must_use]
pub fn auto_power_off(minutes: u16) -> Bytes {
    camera(CameraFunction::AutoPowerOff, &encode_word16(minutes))
}

/// Stops a variable zoom.
#[must_use]
pub fn zoom_stop() -> Bytes {
    camera(CameraFunction::Zoom, &[0x00])
}

/// Zooms at standard speed.
#[must_use]
pub fn zoom(direction: ZoomDirection) -> Bytes {
    let arg = match direction {
        ZoomDirection::Tele => 0x02,
        ZoomDirection::Wide => 0x03,
    };
    camera(CameraFunction::Zoom, &[arg])
}

/// Zooms at `speed` (0-7; higher bits are masked off).
#[must_use]
pub fn zoom_speed(direction: ZoomDirection, speed: u8) -> Bytes {
    let base = match direction {
        ZoomDirection::Tele => 0x20,
        ZoomDirection::Wide => 0x30,
    };
    camera(CameraFunction::Zoom, &[base | (speed & MAX_ZOOM_SPEED)])
}

/// Moves the zoom to an absolute position code.
#[must_use]
pub fn zoom_direct(code: [u8; 4]) -> Bytes {
    camera(CameraFunction::ZoomPosition, &code)
}

/// Digital zoom on/off.
#[must_use]
pub fn digital_zoom(mode: OnOff) -> Bytes {
    camera(CameraFunction::DigitalZoom, &[mode.to_byte()])
}

/// Sets a function that takes a plain on/off argument.
#[must_use]
pub fn switch(func: CameraFunction, mode: OnOff) -> Bytes {
    camera(func, &[mode.to_byte()])
}

/// Selects a picture effect.
#[must_use]
pub fn picture_effect(effect: PictureEffect) -> Bytes {
    camera(CameraFunction::PictureEffect, &[effect.into()])
}

/// Selects a digital effect.
#[must_use]
pub fn digital_effect(effect: DigitalEffect) -> Bytes {
    camera(CameraFunction::DigitalEffect, &[effect.into()])
}

/// Sets the digital effect level (masked to 0-0x3F).
#[must_use]
pub fn digital_effect_level(level: u8) -> Bytes {
    camera(
        CameraFunction::DigitalEffectLevel,
        &[level & MAX_DIGITAL_EFFECT_LEVEL],
    )
}

/// Steps the aperture up or down.
#[must_use]
pub fn aperture_step(up: bool) -> Bytes {
    let mode = if up { 0x02 } else { 0x03 };
    camera(
        CameraFunction::Aperture,
        &[0x02, mode, u8::from(CameraFunction::Aperture)],
    )
}

/// Resets the aperture to its default.
#[must_use]
pub fn aperture_reset() -> Bytes {
    camera(CameraFunction::Aperture, &[0x02, 0x00, 0x00])
}

/// Sets the aperture to `level` (1-16, validated by the caller).
#[must_use]
pub fn aperture_direct(level: u8) -> Bytes {
    camera(
        CameraFunction::Aperture,
        &[0x42, 0x00, 0x00, 0x00, level.saturating_sub(1)],
    )
}

/// Memory preset operation; `slot` is clamped to [`MAX_MEMORY_SLOT`].
#[must_use]
pub fn memory(action: MemoryAction, slot: u8) -> Bytes {
    let slot = slot.min(MAX_MEMORY_SLOT);
    camera(CameraFunction::Memory, &[action.into(), slot & 0b0111])
}

/// Writes `value` into `register`.
#[must_use]
pub fn register_write(register: u8, value: u8) -> Bytes {
    let [hi, lo] = encode_byte(value);
    camera(CameraFunction::Register, &[register, hi, lo])
}

/// Pan-tilter datascreen control.
#[must_use]
pub fn datascreen(mode: Datascreen) -> Bytes {
    payload(
        MessageType::Command,
        Category::PanTilter,
        &[DATASCREEN, mode.into()],
    )
}

/// Reads `register`.
#[must_use]
pub fn register_inquiry(register: u8) -> Bytes {
    camera_inquiry(CameraFunction::Register, &[register])
}
