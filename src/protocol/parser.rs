//! Decoding of reply data.
//!
//! Inquiry answers arrive as completions; the functions here take the data
//! bytes after the socket byte (see [`Packet::data`]) and turn them into typed
//! values.

use crate::error::{Error, Result};
use crate::protocol::command::ADDRESS_SET;
use crate::protocol::nibble::decode_byte;
use crate::protocol::packet::{BROADCAST_HEADER, Packet};
use crate::types::{OnOff, PictureEffect, Stabilization, VideoFormat};

/// Length of the address set echo.
pub const ADDRESS_REPLY_LEN: usize = 4;

fn single_byte(data: &[u8], what: &str) -> Result<u8> {
    match data {
        [byte] => Ok(*byte),
        _ => Err(Error::unexpected(format!(
            "{what}: expected 1 data byte, got {}",
            hex::encode(data)
        ))),
    }
}

/// Parses the address set echo and returns the number of devices.
///
/// Format:
/// ```text
/// [0x88] [0x30] [next_address:1] [0xFF]
/// ```
/// Each device takes one address and forwards the next, so the device count
/// is `next_address - first`.
pub fn parse_address_reply(packet: &Packet, first: u8) -> Result<u8> {
    let bytes = packet.as_bytes();
    if bytes.len() != ADDRESS_REPLY_LEN {
        return Err(Error::EnumerationFailed {
            reason: format!("expected 4-byte reply, got {}", hex::encode(bytes)),
        });
    }
    if bytes[0] != BROADCAST_HEADER || bytes[1] != ADDRESS_SET {
        return Err(Error::EnumerationFailed {
            reason: format!("expected broadcast address reply, got {}", hex::encode(bytes)),
        });
    }

    let devices = bytes[2].saturating_sub(first);
    if devices == 0 {
        return Err(Error::EnumerationFailed {
            reason: "no devices on the bus".into(),
        });
    }
    Ok(devices)
}

/// Parses a 4-byte zoom position code.
pub fn parse_zoom_code(data: &[u8]) -> Result<[u8; 4]> {
    <[u8; 4]>::try_from(data).map_err(|_| {
        Error::unexpected(format!(
            "zoom position: expected 4 data bytes, got {}",
            hex::encode(data)
        ))
    })
}

/// Parses an on/off mode.
pub fn parse_on_off(data: &[u8]) -> Result<OnOff> {
    let byte = single_byte(data, "mode")?;
    OnOff::from_byte(byte).ok_or_else(|| Error::unexpected(format!("unknown mode 0x{byte:02x}")))
}

/// Parses the image stabilization state.
pub fn parse_stabilization(data: &[u8]) -> Result<Stabilization> {
    let byte = single_byte(data, "stabilization")?;
    Stabilization::from_byte(byte)
        .ok_or_else(|| Error::unexpected(format!("unknown stabilization mode 0x{byte:02x}")))
}

/// Parses the picture effect.
pub fn parse_picture_effect(data: &[u8]) -> Result<PictureEffect> {
    let byte = single_byte(data, "picture effect")?;
    PictureEffect::from_byte(byte)
        .ok_or_else(|| Error::unexpected(format!("unknown picture effect 0x{byte:02x}")))
}

/// Parses a register value.
///
/// Format:
/// ```text
/// [high_nibble:1] [low_nibble:1]
/// ```
pub fn parse_register(data: &[u8]) -> Result<u8> {
    match data {
        [hi, lo] => Ok(decode_byte([*hi, *lo])),
        _ => Err(Error::unexpected(format!(
            "register: expected 2 data bytes, got {}",
            hex::encode(data)
        ))),
    }
}

/// Parses the video format register.
pub fn parse_video_format(data: &[u8]) -> Result<VideoFormat> {
    let value = parse_register(data)?;
    VideoFormat::from_byte(value)
        .ok_or_else(|| Error::unexpected(format!("unknown video format 0x{value:02x}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::validate_reply;

    fn reply(bytes: &[u8]) -> Packet {
        validate_reply(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_address_reply() {
        assert_eq!(parse_address_reply(&reply(&[0x88, 0x30, 0x04, 0xFF]), 1).unwrap(), 3);
        assert_eq!(parse_address_reply(&reply(&[0x88, 0x30, 0x02, 0xFF]), 1).unwrap(), 1);
    }

    #[test]
    fn test_parse_address_reply_no_devices() {
        // Our own request came back unchanged
        assert!(matches!(
            parse_address_reply(&reply(&[0x88, 0x30, 0x01, 0xFF]), 1),
            Err(Error::EnumerationFailed { .. })
        ));
    }

    #[test]
    fn test_parse_address_reply_wrong_shape() {
        assert!(parse_address_reply(&reply(&[0x90, 0x30, 0x04, 0xFF]), 1).is_err());
        assert!(parse_address_reply(&reply(&[0x88, 0x30, 0x04, 0x00, 0xFF]), 1).is_err());
        assert!(parse_address_reply(&reply(&[0x88, 0x41, 0x04, 0xFF]), 1).is_err());
    }

    #[test]
    fn test_parse_zoom_code() {
        assert_eq!(
            parse_zoom_code(&[0x03, 0x0D, 0x06, 0x00]).unwrap(),
            [0x03, 0x0D, 0x06, 0x00]
        );
        assert!(matches!(
            parse_zoom_code(&[]),
            Err(Error::UnexpectedReply { .. })
        ));
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(parse_on_off(&[0x02]).unwrap(), OnOff::On);
        assert!(parse_on_off(&[0x07]).is_err());
        assert!(parse_on_off(&[0x02, 0x03]).is_err());
        assert_eq!(parse_stabilization(&[0x00]).unwrap(), Stabilization::Hold);
        assert_eq!(
            parse_picture_effect(&[0x04]).unwrap(),
            PictureEffect::BlackWhite
        );
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(parse_register(&[0x01, 0x03]).unwrap(), 0x13);
        assert_eq!(
            parse_video_format(&[0x01, 0x03]).unwrap(),
            VideoFormat::Hd1080p5994
        );
        assert!(parse_video_format(&[0x00, 0x02]).is_err());
        assert!(parse_register(&[0x01]).is_err());
    }
}
