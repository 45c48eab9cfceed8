//! Formatted text codec
//!
//! The host stores display strings as a mix of literal UTF-8 and macro
//! payloads (colors, icons, line breaks). Translation only ever replaces
//! literal text, so macros are kept as opaque byte runs and re-emitted
//! verbatim.

use langswap_sdk::sestring::{END_BYTE, PACKED_INT_INLINE_LIMIT, PACKED_INT_MARKER_BASE, START_BYTE};

use super::MemoryError;

/// One run of a formatted string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal display text
    Text(String),
    /// A complete macro payload, start and end bytes included
    Macro(Vec<u8>),
}

/// A parsed formatted string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeString {
    segments: Vec<Segment>,
}

impl SeString {
    /// Parse encoded bytes (without the NUL terminator)
    pub fn parse(bytes: &[u8]) -> Result<Self, MemoryError> {
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            if bytes[pos] == START_BYTE {
                let end = macro_end(bytes, pos)?;
                segments.push(Segment::Macro(bytes[pos..end].to_vec()));
                pos = end;
                continue;
            }

            let len = bytes[pos..]
                .iter()
                .position(|&b| b == START_BYTE)
                .unwrap_or(bytes.len() - pos);
            let text = std::str::from_utf8(&bytes[pos..pos + len])
                .map_err(|e| MemoryError::Malformed(format!("invalid UTF-8 at {}: {e}", pos)))?;
            segments.push(Segment::Text(text.to_string()));
            pos += len;
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first literal text segment
    pub fn first_text(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Text(text) => Some(text.as_str()),
            Segment::Macro(_) => None,
        })
    }

    /// Replace the first literal segment with `replace(old_text)`
    ///
    /// Returns `false` when there is no literal segment.
    pub fn replace_first_text(&mut self, replace: impl FnOnce(&str) -> String) -> bool {
        for segment in &mut self.segments {
            if let Segment::Text(text) = segment {
                *text = replace(text);
                return true;
            }
        }
        false
    }

    /// Literal text only, macros dropped
    pub fn to_plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(text) => Some(text.as_str()),
                Segment::Macro(_) => None,
            })
            .collect()
    }

    /// Encode back to bytes (without the NUL terminator)
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.extend_from_slice(text.as_bytes()),
                Segment::Macro(raw) => out.extend_from_slice(raw),
            }
        }
        out
    }
}

/// Index one past the END_BYTE of the macro starting at `start`
fn macro_end(bytes: &[u8], start: usize) -> Result<usize, MemoryError> {
    // START, type, then the packed body length
    let len_pos = start + 2;
    if len_pos > bytes.len() {
        return Err(MemoryError::Malformed(format!("truncated macro at {}", start)));
    }

    let (body_len, consumed) = decode_packed_int(&bytes[len_pos..])?;
    let body_start = len_pos + consumed;
    let end = body_start + body_len as usize;

    match bytes.get(end) {
        Some(&END_BYTE) => Ok(end + 1),
        _ => Err(MemoryError::Malformed(format!("unterminated macro at {}", start))),
    }
}

/// Decode a packed integer, returning the value and the bytes consumed
pub fn decode_packed_int(bytes: &[u8]) -> Result<(u32, usize), MemoryError> {
    let &marker = bytes
        .first()
        .ok_or_else(|| MemoryError::Malformed("missing packed integer".to_string()))?;

    if u32::from(marker) <= PACKED_INT_INLINE_LIMIT {
        return match marker {
            0 => Err(MemoryError::Malformed("zero packed integer marker".to_string())),
            m => Ok((u32::from(m - 1), 1)),
        };
    }

    if !(PACKED_INT_MARKER_BASE..=PACKED_INT_MARKER_BASE + 0x0E).contains(&marker) {
        return Err(MemoryError::Malformed(format!(
            "unsupported packed integer marker {:#04x}",
            marker
        )));
    }

    let flags = marker.wrapping_add(1) & 0x0F;
    let mut value = 0u32;
    let mut consumed = 1;
    for bit in [8u8, 4, 2, 1] {
        value <<= 8;
        if flags & bit != 0 {
            let &byte = bytes
                .get(consumed)
                .ok_or_else(|| MemoryError::Malformed("truncated packed integer".to_string()))?;
            value |= u32::from(byte);
            consumed += 1;
        }
    }

    Ok((value, consumed))
}

/// Encode a packed integer
pub fn encode_packed_int(value: u32) -> Vec<u8> {
    if value < PACKED_INT_INLINE_LIMIT {
        return vec![value as u8 + 1];
    }

    let mut flags = 0u8;
    let mut out = vec![0];
    for (bit, byte) in [8u8, 4, 2, 1].into_iter().zip(value.to_be_bytes()) {
        if byte != 0 {
            flags |= bit;
            out.push(byte);
        }
    }
    out[0] = PACKED_INT_MARKER_BASE - 1 + flags;
    out
}
