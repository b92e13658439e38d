//! # Checksum and Byte Stuffing
//!
//! **Checksum**: bitwise NOT of the 8-bit sum of every body byte
//! (flags through payload, before escaping).
//!
//! **Escaping**: SOP, EOP and ESC never appear inside a frame. Each is sent
//! as ESC followed by the byte with [`ESCAPE_MASK`] cleared.

use super::protocol::{EOP, ESC, ESCAPE_MASK, SOP};
use crate::error::{Result, RvrBridgeError};

/// Calculate the Sphero API checksum
///
/// # Examples
///
/// ```
/// use rvr_bridge::sphero::checksum::checksum;
///
/// assert_eq!(checksum(&[]), 0xFF);
/// assert_eq!(checksum(&[0x01, 0x02]), 0xFC);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte));
    !sum
}

#[inline]
fn needs_escape(byte: u8) -> bool {
    byte == SOP || byte == EOP || byte == ESC
}

/// Escape a frame body for transmission
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len() + 4);

    for &byte in data {
        if needs_escape(byte) {
            escaped.push(ESC);
            escaped.push(byte & !ESCAPE_MASK);
        } else {
            escaped.push(byte);
        }
    }

    escaped
}

/// Reverse [`escape`]
///
/// # Errors
///
/// Returns error if the data ends in a dangling ESC or contains a raw SOP/EOP
pub fn unescape(data: &[u8]) -> Result<Vec<u8>> {
    let mut unescaped = Vec::with_capacity(data.len());
    let mut bytes = data.iter();

    while let Some(&byte) = bytes.next() {
        match byte {
            ESC => {
                let &next = bytes.next().ok_or_else(|| {
                    RvrBridgeError::Protocol("Dangling escape byte at end of frame".to_string())
                })?;
                unescaped.push(next | ESCAPE_MASK);
            }
            SOP | EOP => {
                return Err(RvrBridgeError::Protocol(format!(
                    "Unescaped framing byte 0x{:02X} inside frame",
                    byte
                )));
            }
            _ => unescaped.push(byte),
        }
    }

    Ok(unescaped)
}
