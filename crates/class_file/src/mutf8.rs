//! The "modified UTF-8" used by `CONSTANT_Utf8_info` entries.
//!
//! https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.4.7
//!
//! It differs from standard UTF-8 in two ways: `\0` is written as the two
//! byte sequence `0xC0 0x80`, and characters outside the basic multilingual
//! plane are written as a surrogate pair, each half on its own three bytes.
//! Four byte sequences never occur.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Malformed modified UTF-8 at byte {offset}: {kind}")]
pub struct MalformedText {
    pub offset: usize,
    pub kind: MalformedTextKind,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedTextKind {
    #[error("invalid leading byte")]
    InvalidLeadingByte,
    #[error("invalid continuation byte")]
    InvalidContinuation,
    #[error("partial character at end")]
    PartialCharacter,
}

/// Decodes a modified UTF-8 byte sequence.
///
/// Unpaired surrogates are replaced with U+FFFD.
pub fn decode(bytes: &[u8]) -> Result<String, MalformedText> {
    // Fast path, most names are plain ASCII.
    let ascii_len = bytes.iter().take_while(|b| **b < 0x80).count();
    if ascii_len == bytes.len() {
        return Ok(bytes.iter().map(|b| *b as char).collect());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    units.extend(bytes[..ascii_len].iter().map(|b| *b as u16));

    let mut pos = ascii_len;
    while let Some(&b1) = bytes.get(pos) {
        let malformed = move |kind| MalformedText { offset: pos, kind };

        match b1 >> 4 {
            // 0xxx xxxx
            0..=7 => {
                units.push(b1 as u16);
                pos += 1;
            }
            // 110x xxxx  10xx xxxx
            12 | 13 => {
                let b2 = bytes
                    .get(pos + 1)
                    .copied()
                    .ok_or(malformed(MalformedTextKind::PartialCharacter))?;
                if !is_continuation(b2) {
                    return Err(malformed(MalformedTextKind::InvalidContinuation));
                }
                units.push((b1 as u16 & 0x1F) << 6 | (b2 as u16 & 0x3F));
                pos += 2;
            }
            // 1110 xxxx  10xx xxxx  10xx xxxx
            14 => {
                let (b2, b3) = bytes
                    .get(pos + 1)
                    .copied()
                    .zip(bytes.get(pos + 2).copied())
                    .ok_or(malformed(MalformedTextKind::PartialCharacter))?;
                if !is_continuation(b2) || !is_continuation(b3) {
                    return Err(malformed(MalformedTextKind::InvalidContinuation));
                }
                units.push(
                    (b1 as u16 & 0x0F) << 12 | (b2 as u16 & 0x3F) << 6 | (b3 as u16 & 0x3F),
                );
                pos += 3;
            }
            // 10xx xxxx, 1111 xxxx
            _ => return Err(malformed(MalformedTextKind::InvalidLeadingByte)),
        }
    }

    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

/// Encodes `s` the way a class file stores it.
pub fn encode(s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                bytes.push(0xC0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                bytes.push(0xE0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                bytes.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    bytes
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}
