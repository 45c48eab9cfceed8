//! Host formatted text ("SeString") byte markers
//!
//! A formatted string is a byte sequence mixing UTF-8 literal text with
//! macro payloads of the form:
//!
//! ```text
//! START_BYTE  type  length(packed integer)  body[length]  END_BYTE
//! ```
//!
//! Packed integers below [`PACKED_INT_INLINE_LIMIT`] are stored as a single
//! byte holding `value + 1`. Larger values store a marker byte whose low
//! nibble (after adding one) flags which of the four big-endian value bytes
//! follow.

/// Opens a macro payload
pub const START_BYTE: u8 = 0x02;

/// Closes a macro payload
pub const END_BYTE: u8 = 0x03;

/// Values strictly below this are encoded inline as a single byte
pub const PACKED_INT_INLINE_LIMIT: u32 = 0xCF;

/// First marker byte of the multi-byte packed integer form
pub const PACKED_INT_MARKER_BASE: u8 = 0xF0;

/// Well-known macro payload types
pub mod payload {
    pub const NEW_LINE: u8 = 0x10;
    pub const ICON: u8 = 0x12;
    pub const COLOR: u8 = 0x13;
    pub const EDGE_COLOR: u8 = 0x14;
    pub const UI_FOREGROUND: u8 = 0x48;
    pub const UI_GLOW: u8 = 0x49;
}
