//! Parser for operator-entered peer addresses.
//!
//! Accepts six hex pairs written most-significant first, either packed
//! (`aabbccddeeff`) or with a consistent `:` or `-` separator. Empty input
//! clears the target.

use core::fmt;

use winnow::ModalResult;
use winnow::combinator::{eof, opt};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_while};

use crate::radio::PeerAddress;

/// Characters needed to write an address with separators.
pub const ADDRESS_TEXT_LEN: usize = 17;

/// Number of hex digits in an address.
pub const ADDRESS_DIGITS: usize = 12;

/// Input that is neither empty nor a complete address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressParseError {
    /// Byte offset at which parsing stopped.
    pub offset: usize,
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected 6 hex bytes (12 digits) at offset {}",
            self.offset
        )
    }
}

/// Parses a target address; `Ok(None)` means match peers by name instead.
///
/// # Errors
///
/// Returns [`AddressParseError`] when the text is not empty and not a full address.
pub fn parse_target_address(text: &str) -> Result<Option<PeerAddress>, AddressParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    address
        .parse(trimmed)
        .map(|bytes| Some(PeerAddress::from_be_bytes(bytes)))
        .map_err(|err| AddressParseError {
            offset: err.offset(),
        })
}

fn address(input: &mut &str) -> ModalResult<[u8; 6]> {
    let mut bytes = [0u8; 6];
    bytes[0] = hex_pair.parse_next(input)?;
    let separator = opt(one_of([':', '-'])).parse_next(input)?;
    bytes[1] = hex_pair.parse_next(input)?;

    // The first separator fixes the style for the rest.
    for slot in bytes.iter_mut().skip(2) {
        if let Some(separator) = separator {
            literal(separator).parse_next(input)?;
        }
        *slot = hex_pair.parse_next(input)?;
    }

    eof.parse_next(input)?;
    Ok(bytes)
}

fn hex_pair(input: &mut &str) -> ModalResult<u8> {
    take_while(2, |c: char| c.is_ascii_hexdigit())
        .map(|digits: &str| {
            digits
                .bytes()
                .fold(0u8, |acc, digit| (acc << 4) | nibble(digit))
        })
        .parse_next(input)
}

const fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}
