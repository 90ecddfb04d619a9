//! Nibble packing for numeric fields.
//!
//! Numbers travel with one nibble per byte so that no payload byte can ever
//! equal the `0xFF` terminator:
//! ```text
//! 0x1234  ->  01 02 03 04
//! ```

/// Encodes a 16-bit value as four nibble bytes, most significant first.
#[must_use]
pub const fn encode_word16(value: u16) -> [u8; 4] {
    let [hi, lo] = value.to_be_bytes();
    [hi >> 4, hi & 0x0F, lo >> 4, lo & 0x0F]
}

/// Reassembles a 16-bit value from four nibble bytes.
///
/// Only the low nibble of each byte is used.
#[must_use]
pub const fn decode_word16(nibbles: [u8; 4]) -> u16 {
    ((nibbles[0] as u16 & 0x0F) << 12)
        | ((nibbles[1] as u16 & 0x0F) << 8)
        | ((nibbles[2] as u16 & 0x0F) << 4)
        | (nibbles[3] as u16 & 0x0F)
}

/// Encodes a byte as two nibble bytes, high nibble first.
#[must_use]
pub const fn encode_byte(value: u8) -> [u8; 2] {
    [value >> 4, value & 0x0F]
}

/// Reassembles a byte from two nibble bytes.
#[must_use]
pub const fn decode_byte(nibbles: [u8; 2]) -> u8 {
    ((nibbles[0] & 0x0F) << 4) | (nibbles[1] & 0x0F)
}
