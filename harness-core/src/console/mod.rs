//! Operator console surface: single-key commands and target selection.

mod address;

use core::fmt;

use crate::radio::{AdvertisingReport, PeerAddress};

pub use address::{ADDRESS_DIGITS, ADDRESS_TEXT_LEN, AddressParseError, parse_target_address};

/// Byte-oriented operator console.
///
/// Output goes through [`fmt::Write`]; `read_byte` blocks until a byte is
/// available and returns `None` once input is closed.
pub trait Console: fmt::Write {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Commands accepted at the prompt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleCommand {
    Advertise,
    Scan,
    TogglePeriodic,
    SetTarget,
}

impl ConsoleCommand {
    /// Decodes a command key, ignoring case.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_lowercase() {
            b'a' => Some(ConsoleCommand::Advertise),
            b's' => Some(ConsoleCommand::Scan),
            b'p' => Some(ConsoleCommand::TogglePeriodic),
            b'm' => Some(ConsoleCommand::SetTarget),
            _ => None,
        }
    }
}

/// How scan reports are matched against the peer of interest.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PeerTarget {
    /// Match the advertised local name against our own device name.
    #[default]
    Name,
    /// Match the advertiser address exactly.
    Address(PeerAddress),
}

impl PeerTarget {
    /// Tests a report against the target. Address mode never falls back to names.
    #[must_use]
    pub fn matches(&self, report: &AdvertisingReport, own_name: &str) -> Option<MatchKind> {
        match self {
            PeerTarget::Address(address) => {
                (report.peer.address == *address).then_some(MatchKind::Address)
            }
            PeerTarget::Name => {
                (report.local_name.as_deref() == Some(own_name)).then_some(MatchKind::Name)
            }
        }
    }
}

/// Which identity matched a report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchKind {
    Address,
    Name,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Address => f.write_str("MAC"),
            MatchKind::Name => f.write_str("name"),
        }
    }
}
